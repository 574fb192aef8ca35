//! ACDB calibration: the vendor tuning-profile loader
//!
//! The vendor library is resolved at startup and may lack any of its entry
//! points. [`AcdbLoader`] mirrors that: every method defaults to reporting an
//! unresolved symbol, implementors override what they actually provide, and
//! [`NullAcdbLoader`] provides nothing at all. Callers log the missing symbol
//! and carry on.

use crate::domain::device::Direction;
use crate::domain::error::{PlatformError, Result};
use crate::domain::snd_device::SoundDevice;
use std::sync::Arc;
use tracing::{debug, error, warn};

pub const SYM_INIT: &str = "acdb_loader_init_ACDB";
pub const SYM_SEND_AUDIO_CAL: &str = "acdb_loader_send_audio_cal";
pub const SYM_SEND_VOICE_CAL: &str = "acdb_loader_send_voice_cal";
pub const SYM_DEALLOCATE: &str = "acdb_loader_deallocate_ACDB";

/// Calibration settings flag: the target has two microphones
pub const DMIC_FLAG: u32 = 0x0000_0002;

/// Device type argument of an audio calibration request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcdbDeviceType {
    /// Rx path
    Out = 1,
    /// Tx path
    In = 2,
}

impl From<Direction> for AcdbDeviceType {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Playback => AcdbDeviceType::Out,
            Direction::Capture => AcdbDeviceType::In,
        }
    }
}

/// Entry points of the vendor calibration library
pub trait AcdbLoader: Send + Sync {
    fn init(&self) -> Result<()> {
        Err(PlatformError::UnresolvedCalibrationSymbol(SYM_INIT))
    }

    fn send_audio_cal(&self, _acdb_id: u32, _dev_type: AcdbDeviceType) -> Result<()> {
        Err(PlatformError::UnresolvedCalibrationSymbol(SYM_SEND_AUDIO_CAL))
    }

    fn send_voice_cal(&self, _rx_id: u32, _tx_id: u32) -> Result<()> {
        Err(PlatformError::UnresolvedCalibrationSymbol(SYM_SEND_VOICE_CAL))
    }

    fn deallocate(&self) -> Result<()> {
        Err(PlatformError::UnresolvedCalibrationSymbol(SYM_DEALLOCATE))
    }
}

/// Stand-in used when the vendor library cannot be loaded
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAcdbLoader;

impl AcdbLoader for NullAcdbLoader {}

impl<T: AcdbLoader + ?Sized> AcdbLoader for Arc<T> {
    fn init(&self) -> Result<()> {
        (**self).init()
    }

    fn send_audio_cal(&self, acdb_id: u32, dev_type: AcdbDeviceType) -> Result<()> {
        (**self).send_audio_cal(acdb_id, dev_type)
    }

    fn send_voice_cal(&self, rx_id: u32, tx_id: u32) -> Result<()> {
        (**self).send_voice_cal(rx_id, tx_id)
    }

    fn deallocate(&self) -> Result<()> {
        (**self).deallocate()
    }
}

/// Calibration id of `device`, rejecting unconfigured entries
pub fn resolve_calibration_id(device: SoundDevice) -> Result<u32> {
    u32::try_from(device.acdb_id()).map_err(|_| {
        error!(device = %device, "Could not find acdb id for device");
        PlatformError::MissingCalibrationEntry {
            device,
            acdb_id: device.acdb_id(),
        }
    })
}

/// Logs a calibration failure; unresolved symbols degrade to a warning
fn report(call: &'static str, result: Result<()>) {
    match result {
        Ok(()) => {}
        Err(PlatformError::UnresolvedCalibrationSymbol(symbol)) => {
            warn!(symbol, "Calibration entry point unavailable, skipping {}", call);
        }
        Err(e) => error!(error = %e, "Calibration call {} failed", call),
    }
}

/// Loads the calibration database; failures never stop the platform
pub fn init(loader: &dyn AcdbLoader) {
    report("init", loader.init());
}

pub fn deallocate(loader: &dyn AcdbLoader) {
    report("deallocate", loader.deallocate());
}

/// Sends the tuning profile of a single sound device
///
/// Fails only when the device has no calibration id; an absent loader entry
/// point is logged and treated as success.
pub fn send_audio_calibration(loader: &dyn AcdbLoader, device: SoundDevice) -> Result<()> {
    let acdb_id = resolve_calibration_id(device)?;
    let dev_type = device
        .direction()
        .map_or(AcdbDeviceType::In, AcdbDeviceType::from);

    debug!(device = %device, acdb_id, ?dev_type, "Sending audio calibration");
    report("send_audio_cal", loader.send_audio_cal(acdb_id, dev_type));
    Ok(())
}

/// Sends the voice tuning profile for an rx/tx pair
///
/// Both ids must be strictly positive, otherwise nothing is sent and the
/// inconsistency is returned.
pub fn send_voice_calibration(
    loader: &dyn AcdbLoader,
    rx: SoundDevice,
    tx: SoundDevice,
) -> Result<()> {
    let (rx_id, tx_id) = (rx.acdb_id(), tx.acdb_id());
    if rx_id <= 0 || tx_id <= 0 {
        error!(rx_id, tx_id, "Incorrect ACDB IDs");
        return Err(PlatformError::InconsistentVoiceCalibration {
            rx: rx_id,
            tx: tx_id,
        });
    }

    debug!(rx = %rx, tx = %tx, rx_id, tx_id, "Sending voice calibration");
    // Both ids are positive here
    report(
        "send_voice_cal",
        loader.send_voice_cal(rx_id.unsigned_abs(), tx_id.unsigned_abs()),
    );
    Ok(())
}

//! Conditions surfaced by the platform layer
//!
//! None of these abort a routing decision: resolvers still return a concrete
//! (possibly `None` or default) sound device and hand the condition back to
//! the caller alongside it.

use crate::domain::snd_device::SoundDevice;
use thiserror::Error;

/// Errors and conditions reported by the routing platform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// More than one device bit set in a combination no sound device covers
    #[error("Invalid device combination: {0:#x}")]
    InvalidDeviceCombination(u32),

    /// Mask matches no table entry; a safe default was used
    #[error("Unknown device(s): {0:#x}")]
    UnknownDevice(u32),

    /// Sound device has no usable calibration id
    #[error("Missing calibration entry for {device} (acdb id {acdb_id})")]
    MissingCalibrationEntry { device: SoundDevice, acdb_id: i32 },

    /// Voice calibration ids of the rx/tx pair are not both positive
    #[error("Incorrect ACDB ids (rx: {rx} tx: {tx})")]
    InconsistentVoiceCalibration { rx: i32, tx: i32 },

    /// Mixer control could not be found by name
    #[error("Mixer control not found: {0}")]
    MissingControlSurface(String),

    /// Mixer control exists but the write or read failed
    #[error("Mixer control {control} failed: {reason}")]
    MixerAccess { control: String, reason: String },

    /// Mixer could not be opened at initialization
    #[error("Unable to open mixer card {card} after {attempts} attempts")]
    MixerUnavailable { card: u32, attempts: u32 },

    /// Vendor calibration library lacks an entry point
    #[error("Calibration library is missing symbol {0}")]
    UnresolvedCalibrationSymbol(&'static str),

    /// Calibration library entry point returned a failure status
    #[error("Calibration call {call} failed with status {status}")]
    CalibrationFailed { call: &'static str, status: i32 },
}

pub type Result<T> = std::result::Result<T, PlatformError>;

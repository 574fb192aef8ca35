//! Calibration loader that records instead of talking to the DSP

use madrigal_core::domain::calibration::{
    SYM_DEALLOCATE, SYM_INIT, SYM_SEND_AUDIO_CAL, SYM_SEND_VOICE_CAL,
};
use madrigal_core::domain::error::Result;
use madrigal_core::domain::{AcdbDeviceType, AcdbLoader, PlatformError};
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

/// One call received by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "kebab-case")]
pub enum AcdbCall {
    Init,
    AudioCal { acdb_id: u32, device_type: u8 },
    VoiceCal { rx_id: u32, tx_id: u32 },
    Deallocate,
}

/// Records every calibration request
///
/// Entry points can be removed to mimic a vendor library that lacks them;
/// removed entry points report an unresolved symbol and record nothing.
/// Failing entry points record the call and then return their status.
#[derive(Debug, Default)]
pub struct RecordingAcdbLoader {
    missing: Vec<&'static str>,
    failing: Vec<(&'static str, i32)>,
    calls: Mutex<Vec<AcdbCall>>,
}

impl RecordingAcdbLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops the entry point named `symbol`
    pub fn without_symbol(mut self, symbol: &'static str) -> Self {
        self.missing.push(symbol);
        self
    }

    /// Makes the entry point named `symbol` return `status`
    pub fn failing(mut self, symbol: &'static str, status: i32) -> Self {
        self.failing.push((symbol, status));
        self
    }

    pub fn calls(&self) -> Vec<AcdbCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, symbol: &'static str, call: AcdbCall) -> Result<()> {
        if self.missing.contains(&symbol) {
            return Err(PlatformError::UnresolvedCalibrationSymbol(symbol));
        }
        info!(?call, "Calibration request");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        match self.failing.iter().find(|(s, _)| *s == symbol) {
            Some(&(call, status)) => Err(PlatformError::CalibrationFailed { call, status }),
            None => Ok(()),
        }
    }
}

impl AcdbLoader for RecordingAcdbLoader {
    fn init(&self) -> Result<()> {
        self.record(SYM_INIT, AcdbCall::Init)
    }

    fn send_audio_cal(&self, acdb_id: u32, dev_type: AcdbDeviceType) -> Result<()> {
        self.record(
            SYM_SEND_AUDIO_CAL,
            AcdbCall::AudioCal {
                acdb_id,
                device_type: dev_type as u8,
            },
        )
    }

    fn send_voice_cal(&self, rx_id: u32, tx_id: u32) -> Result<()> {
        self.record(SYM_SEND_VOICE_CAL, AcdbCall::VoiceCal { rx_id, tx_id })
    }

    fn deallocate(&self) -> Result<()> {
        self.record(SYM_DEALLOCATE, AcdbCall::Deallocate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use madrigal_core::domain::calibration;
    use madrigal_core::domain::SoundDevice;

    #[test]
    fn test_records_calls() {
        let loader = RecordingAcdbLoader::new();
        calibration::init(&loader);
        calibration::send_audio_calibration(&loader, SoundDevice::OutHeadphones).unwrap();
        calibration::send_audio_calibration(&loader, SoundDevice::InHeadsetMic).unwrap();
        calibration::send_voice_calibration(
            &loader,
            SoundDevice::OutVoiceSpeaker,
            SoundDevice::InVoiceSpeakerMic,
        )
        .unwrap();
        calibration::deallocate(&loader);

        assert_eq!(
            loader.calls(),
            vec![
                AcdbCall::Init,
                AcdbCall::AudioCal {
                    acdb_id: 10,
                    device_type: 1
                },
                AcdbCall::AudioCal {
                    acdb_id: 8,
                    device_type: 2
                },
                AcdbCall::VoiceCal {
                    rx_id: 15,
                    tx_id: 11
                },
                AcdbCall::Deallocate,
            ]
        );
    }

    #[test]
    fn test_missing_symbol_is_a_noop() {
        let loader = RecordingAcdbLoader::new().without_symbol(SYM_SEND_AUDIO_CAL);
        assert_eq!(
            loader.send_audio_cal(7, AcdbDeviceType::Out),
            Err(PlatformError::UnresolvedCalibrationSymbol(SYM_SEND_AUDIO_CAL))
        );
        // The platform-level call still succeeds
        calibration::send_audio_calibration(&loader, SoundDevice::OutHandset).unwrap();
        assert!(loader.calls().is_empty());
    }

    #[test]
    fn test_failing_call_is_logged_not_propagated() {
        let loader = RecordingAcdbLoader::new().failing(SYM_SEND_VOICE_CAL, -22);
        assert_eq!(
            loader.send_voice_cal(7, 4),
            Err(PlatformError::CalibrationFailed {
                call: SYM_SEND_VOICE_CAL,
                status: -22
            })
        );

        calibration::send_voice_calibration(
            &loader,
            SoundDevice::OutVoiceHandset,
            SoundDevice::InHandsetMic,
        )
        .unwrap();
        assert_eq!(loader.calls().len(), 2);
    }
}

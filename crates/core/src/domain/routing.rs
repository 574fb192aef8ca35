//! Output and input sound-device resolution
//!
//! The resolver is a pure function of the device mask, the session state and
//! the platform configuration. It never touches hardware: mixer side effects
//! the decision implies (proxy channel map, echo reference) are returned as a
//! [`RoutingEffect`] for the caller to apply.

use crate::domain::config::{CarrierIdentity, PlatformConfig};
use crate::domain::device::{
    AudioMode, AudioSource, ChannelMask, DualMicConfig, InputDevices, OutputDevices, TtyMode,
};
use crate::domain::error::PlatformError;
use crate::domain::mixer::EchoReference;
use crate::domain::snd_device::SoundDevice;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace, warn};

/// The capture stream currently open on the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActiveInput {
    pub source: AudioSource,
    pub device: InputDevices,
    pub channel_mask: ChannelMask,
    /// Acoustic echo cancellation requested by the stream
    pub enable_aec: bool,
}

/// Session state the resolver reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingState {
    pub mode: AudioMode,
    pub tty_mode: TtyMode,
    /// Left and right speaker channels are swapped (device held upside down)
    pub speaker_lr_swap: bool,
    /// ANC switched on by the user for the current accessory
    pub anc_enabled: bool,
    pub active_input: Option<ActiveInput>,
    /// Channel count advertised by the AFE proxy sink
    pub afe_proxy_channels: u32,
}

impl Default for RoutingState {
    fn default() -> Self {
        Self {
            mode: AudioMode::Normal,
            tty_mode: TtyMode::Off,
            speaker_lr_swap: false,
            anc_enabled: false,
            active_input: None,
            afe_proxy_channels: 2,
        }
    }
}

impl RoutingState {
    fn in_call(&self) -> bool {
        self.mode == AudioMode::InCall
    }

    /// Channels of the active capture stream, mono when nothing is recording
    fn input_channel_count(&self) -> u32 {
        self.active_input
            .map_or(ChannelMask::IN_MONO, |input| input.channel_mask)
            .channel_count()
    }
}

/// Mixer programming implied by a routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingEffect {
    /// Publish the proxy sink's channel layout
    AfeProxyChannelMap { channels: u32 },
    /// Select the echo canceller reference
    EchoReference(EchoReference),
}

/// Outcome of a routing decision
///
/// `device` is always usable, possibly [`SoundDevice::None`] or a safe default.
/// `condition` carries whatever went wrong on the way there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub device: SoundDevice,
    pub condition: Option<PlatformError>,
    pub effect: Option<RoutingEffect>,
}

impl Resolution {
    fn device(device: SoundDevice) -> Self {
        Self {
            device,
            condition: None,
            effect: None,
        }
    }

    fn none() -> Self {
        Self::device(SoundDevice::None)
    }

    fn with_condition(mut self, condition: PlatformError) -> Self {
        self.condition = Some(condition);
        self
    }

    fn with_effect(mut self, effect: Option<RoutingEffect>) -> Self {
        self.effect = effect;
        self
    }
}

/// Maps device masks and session state onto sound devices
#[derive(Debug, Clone)]
pub struct RoutingResolver {
    config: PlatformConfig,
    carrier: CarrierIdentity,
}

impl RoutingResolver {
    pub fn new(config: PlatformConfig, carrier: CarrierIdentity) -> Self {
        Self { config, carrier }
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn carrier(&self) -> CarrierIdentity {
        self.carrier
    }

    fn is_tmus(&self) -> bool {
        self.config.tmus_audio && self.carrier.is_tmus()
    }

    fn handset_anc(&self, state: &RoutingState) -> bool {
        self.config
            .anc
            .should_use_handset_anc(state.anc_enabled, state.input_channel_count())
    }

    /// Selects the playback sound device for `devices`
    pub fn resolve_output(&self, devices: OutputDevices, state: &RoutingState) -> Resolution {
        trace!(%devices, mode = ?state.mode, "Resolving output device");

        if devices.is_empty() {
            debug!("No output device requested");
            return Resolution::none();
        }
        if devices.is_input_mask() {
            error!(%devices, "Invalid output devices");
            return Resolution::none().with_condition(PlatformError::UnknownDevice(devices.bits()));
        }

        if state.in_call() {
            if let Some(device) = self.voice_output(devices, state) {
                debug!(device = %device, "Voice call output");
                return Resolution::device(device);
            }
        }

        if devices.count() == 2 {
            return match self.combo_output(devices, state) {
                Some(device) => Resolution::device(device),
                None => {
                    error!(%devices, "Invalid combo device");
                    Resolution::none()
                        .with_condition(PlatformError::InvalidDeviceCombination(devices.bits()))
                }
            };
        }

        if devices.count() != 1 {
            error!(%devices, "Invalid output devices");
            return Resolution::none()
                .with_condition(PlatformError::InvalidDeviceCombination(devices.bits()));
        }

        self.single_output(devices, state)
    }

    fn voice_output(&self, devices: OutputDevices, state: &RoutingState) -> Option<SoundDevice> {
        if devices.intersects(OutputDevices::WIRED) {
            let device = match state.tty_mode {
                TtyMode::Full => SoundDevice::OutVoiceTtyFullHeadphones,
                TtyMode::Vco => SoundDevice::OutVoiceTtyVcoHeadphones,
                TtyMode::Hco => SoundDevice::OutVoiceTtyHcoHandset,
                TtyMode::Off if state.anc_enabled => {
                    if self.config.anc.use_feedback() {
                        SoundDevice::OutVoiceAncFbHeadset
                    } else {
                        SoundDevice::OutVoiceAncHeadset
                    }
                }
                TtyMode::Off => SoundDevice::OutVoiceHeadphones,
            };
            Some(device)
        } else if devices.intersects(OutputDevices::ALL_SCO) {
            Some(SoundDevice::OutBtSco)
        } else if devices.intersects(OutputDevices::SPEAKER) {
            Some(SoundDevice::OutVoiceSpeaker)
        } else if self.config.usb_headset && devices.intersects(OutputDevices::DOCK) {
            Some(SoundDevice::OutUsbHeadset)
        } else if devices.intersects(OutputDevices::EARPIECE) {
            if self.is_tmus() {
                Some(SoundDevice::OutVoiceHandsetTmus)
            } else if self.handset_anc(state) {
                Some(SoundDevice::OutAncHandset)
            } else {
                Some(SoundDevice::OutHandset)
            }
        } else {
            None
        }
    }

    fn combo_output(&self, devices: OutputDevices, state: &RoutingState) -> Option<SoundDevice> {
        let speaker = OutputDevices::SPEAKER;
        if devices == OutputDevices::WIRED_HEADPHONE | speaker {
            Some(SoundDevice::OutSpeakerAndHeadphones)
        } else if devices == OutputDevices::WIRED_HEADSET | speaker {
            Some(if state.anc_enabled {
                SoundDevice::OutSpeakerAndAncHeadset
            } else {
                SoundDevice::OutSpeakerAndHeadphones
            })
        } else if devices == OutputDevices::AUX_DIGITAL | speaker {
            Some(SoundDevice::OutSpeakerAndHdmi)
        } else if devices == OutputDevices::ANLG_DOCK_HEADSET | speaker {
            Some(SoundDevice::OutSpeakerAndUsbHeadset)
        } else {
            None
        }
    }

    fn single_output(&self, devices: OutputDevices, state: &RoutingState) -> Resolution {
        let device = if devices.intersects(OutputDevices::WIRED) {
            if devices.intersects(OutputDevices::WIRED_HEADSET) && state.anc_enabled {
                if self.config.anc.use_feedback() {
                    SoundDevice::OutAncFbHeadset
                } else {
                    SoundDevice::OutAncHeadset
                }
            } else {
                SoundDevice::OutHeadphones
            }
        } else if devices.intersects(OutputDevices::SPEAKER) {
            if state.speaker_lr_swap {
                SoundDevice::OutSpeakerReverse
            } else {
                SoundDevice::OutSpeaker
            }
        } else if devices.intersects(OutputDevices::ALL_SCO) {
            SoundDevice::OutBtSco
        } else if devices.intersects(OutputDevices::AUX_DIGITAL) {
            SoundDevice::OutHdmi
        } else if self.config.usb_headset && devices.intersects(OutputDevices::DOCK) {
            SoundDevice::OutUsbHeadset
        } else if devices.intersects(OutputDevices::EARPIECE) {
            SoundDevice::OutHandset
        } else if devices.intersects(OutputDevices::PROXY) {
            debug!(channels = state.afe_proxy_channels, "Setting sink capability for proxy");
            return Resolution::device(SoundDevice::OutAfeProxy).with_effect(Some(
                RoutingEffect::AfeProxyChannelMap {
                    channels: state.afe_proxy_channels,
                },
            ));
        } else {
            error!(%devices, "Unknown output device(s)");
            return Resolution::none().with_condition(PlatformError::UnknownDevice(devices.bits()));
        };
        Resolution::device(device)
    }

    /// Selects the capture sound device given the chosen playback devices
    pub fn resolve_input(&self, out_devices: OutputDevices, state: &RoutingState) -> Resolution {
        let input = state.active_input;
        let source = input.map_or(AudioSource::Default, |i| i.source);
        let mut in_devices = input.map_or(InputDevices::NONE, |i| i.device);
        let channel_mask = input.map_or(ChannelMask::IN_MONO, |i| i.channel_mask);
        let mut effect = None;

        trace!(%out_devices, %in_devices, ?source, "Resolving input device");

        let selected = if state.in_call() {
            if out_devices.is_empty() {
                error!("No output device set for voice call");
                return Resolution::none();
            }
            if state.tty_mode != TtyMode::Off && out_devices.intersects(OutputDevices::WIRED) {
                let device = match state.tty_mode {
                    TtyMode::Full => SoundDevice::InVoiceTtyFullHeadsetMic,
                    TtyMode::Vco => SoundDevice::InVoiceTtyVcoHandsetMic,
                    _ => SoundDevice::InVoiceTtyHcoHeadsetMic,
                };
                return Resolution::device(device);
            }
            self.voice_input(out_devices, state)
        } else {
            match source {
                AudioSource::Camcorder => in_devices
                    .intersects(InputDevices::BUILTIN_MIC | InputDevices::BACK_MIC)
                    .then_some(SoundDevice::InCamcorderMic),
                AudioSource::VoiceRecognition => {
                    if in_devices.intersects(InputDevices::BUILTIN_MIC) {
                        Some(self.recognition_input(channel_mask))
                    } else {
                        None
                    }
                }
                AudioSource::VoiceCommunication => {
                    if out_devices.intersects(OutputDevices::SPEAKER) {
                        in_devices = InputDevices::BACK_MIC;
                    }
                    match input {
                        Some(active) if active.enable_aec => {
                            effect = Some(RoutingEffect::EchoReference(EchoReference::SlimRx));
                            communication_aec_input(in_devices)
                        }
                        Some(_) => {
                            effect = Some(RoutingEffect::EchoReference(EchoReference::Disabled));
                            None
                        }
                        None => None,
                    }
                }
                AudioSource::Default => return Resolution::none(),
                _ => None,
            }
        };

        if let Some(device) = selected {
            return Resolution::device(device).with_effect(effect);
        }

        let resolution = if !in_devices.is_empty()
            && !in_devices.intersects(InputDevices::VOICE_CALL | InputDevices::COMMUNICATION)
        {
            self.input_from_input_mask(in_devices)
        } else {
            self.input_from_output_mask(out_devices)
        };
        resolution.with_effect(effect)
    }

    fn voice_input(&self, out_devices: OutputDevices, state: &RoutingState) -> Option<SoundDevice> {
        let fluence = self.config.fluence_in_voice_call();
        let dual_mic = self.config.dual_mic;

        if out_devices.intersects(OutputDevices::EARPIECE | OutputDevices::WIRED_HEADPHONE) {
            let device = if out_devices.intersects(OutputDevices::EARPIECE)
                && self.handset_anc(state)
            {
                SoundDevice::InAancHandsetMic
            } else if !fluence {
                SoundDevice::InHandsetMic
            } else {
                match dual_mic {
                    DualMicConfig::Endfire if self.is_tmus() => SoundDevice::InVoiceDmicEfTmus,
                    DualMicConfig::Endfire => SoundDevice::InVoiceDmicEf,
                    DualMicConfig::Broadside => SoundDevice::InVoiceDmicBs,
                    DualMicConfig::None => SoundDevice::InHandsetMic,
                }
            };
            Some(device)
        } else if out_devices.intersects(OutputDevices::WIRED_HEADSET) {
            Some(SoundDevice::InVoiceHeadsetMic)
        } else if out_devices.intersects(OutputDevices::ALL_SCO) {
            Some(SoundDevice::InBtScoMic)
        } else if out_devices.intersects(OutputDevices::SPEAKER) {
            let speaker_fluence = fluence && self.config.fluence_in_speaker();
            Some(match dual_mic {
                DualMicConfig::Endfire if speaker_fluence => SoundDevice::InVoiceSpeakerDmicEf,
                DualMicConfig::Broadside if speaker_fluence => SoundDevice::InVoiceSpeakerDmicBs,
                _ => SoundDevice::InVoiceSpeakerMic,
            })
        } else {
            None
        }
    }

    fn recognition_input(&self, channel_mask: ChannelMask) -> SoundDevice {
        let front_back = channel_mask == ChannelMask::IN_FRONT_BACK;
        let fluence = self.config.fluence_in_voice_rec();
        match self.config.dual_mic {
            DualMicConfig::Endfire if front_back => SoundDevice::InVoiceRecDmicEf,
            DualMicConfig::Endfire if fluence => SoundDevice::InVoiceRecDmicEfFluence,
            DualMicConfig::Broadside if front_back => SoundDevice::InVoiceRecDmicBs,
            DualMicConfig::Broadside if fluence => SoundDevice::InVoiceRecDmicBsFluence,
            _ => SoundDevice::InVoiceRecMic,
        }
    }

    fn input_from_input_mask(&self, in_devices: InputDevices) -> Resolution {
        let device = if in_devices.intersects(InputDevices::BUILTIN_MIC) {
            SoundDevice::InHandsetMic
        } else if in_devices.intersects(InputDevices::BACK_MIC) {
            SoundDevice::InSpeakerMic
        } else if in_devices.intersects(InputDevices::WIRED_HEADSET) {
            SoundDevice::InHeadsetMic
        } else if in_devices.intersects(InputDevices::BLUETOOTH_SCO_HEADSET) {
            SoundDevice::InBtScoMic
        } else if in_devices.intersects(InputDevices::AUX_DIGITAL) {
            SoundDevice::InHdmiMic
        } else if self.config.usb_headset && in_devices.intersects(InputDevices::DOCK) {
            SoundDevice::InUsbHeadsetMic
        } else {
            error!(%in_devices, "Unknown input device(s)");
            warn!("Using default handset-mic");
            return Resolution::device(SoundDevice::InHandsetMic)
                .with_condition(PlatformError::UnknownDevice(in_devices.bits()));
        };
        Resolution::device(device)
    }

    fn input_from_output_mask(&self, out_devices: OutputDevices) -> Resolution {
        let device = if out_devices.intersects(OutputDevices::EARPIECE) {
            SoundDevice::InHandsetMic
        } else if out_devices.intersects(OutputDevices::WIRED_HEADSET) {
            SoundDevice::InHeadsetMic
        } else if out_devices.intersects(OutputDevices::SPEAKER) {
            SoundDevice::InSpeakerMic
        } else if out_devices.intersects(OutputDevices::WIRED_HEADPHONE) {
            SoundDevice::InHandsetMic
        } else if out_devices.intersects(OutputDevices::ALL_SCO) {
            SoundDevice::InBtScoMic
        } else if out_devices.intersects(OutputDevices::AUX_DIGITAL) {
            SoundDevice::InHdmiMic
        } else if self.config.usb_headset && out_devices.intersects(OutputDevices::DOCK) {
            SoundDevice::InUsbHeadsetMic
        } else {
            error!(%out_devices, "Unknown output device(s)");
            warn!("Using default handset-mic");
            return Resolution::device(SoundDevice::InHandsetMic)
                .with_condition(PlatformError::UnknownDevice(out_devices.bits()));
        };
        Resolution::device(device)
    }
}

/// AEC-tagged capture device for a voice-communication input mask
fn communication_aec_input(in_devices: InputDevices) -> Option<SoundDevice> {
    if in_devices.intersects(InputDevices::BACK_MIC) {
        Some(SoundDevice::InSpeakerMicAec)
    } else if in_devices.intersects(InputDevices::BUILTIN_MIC) {
        Some(SoundDevice::InHandsetMicAec)
    } else if in_devices.intersects(InputDevices::WIRED_HEADSET) {
        Some(SoundDevice::InHeadsetMicAec)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::{AncConfig, AncType, FluenceConfig};
    use proptest::prelude::*;

    fn resolver() -> RoutingResolver {
        RoutingResolver::new(PlatformConfig::default(), CarrierIdentity::default())
    }

    fn resolver_with(config: PlatformConfig, carrier: CarrierIdentity) -> RoutingResolver {
        RoutingResolver::new(config, carrier)
    }

    fn dual_mic(dual_mic: DualMicConfig, fluence: FluenceConfig) -> PlatformConfig {
        PlatformConfig {
            dual_mic,
            fluence,
            ..PlatformConfig::default()
        }
    }

    fn in_call() -> RoutingState {
        RoutingState {
            mode: AudioMode::InCall,
            ..RoutingState::default()
        }
    }

    fn capturing(source: AudioSource, device: InputDevices) -> RoutingState {
        RoutingState {
            active_input: Some(ActiveInput {
                source,
                device,
                ..ActiveInput::default()
            }),
            ..RoutingState::default()
        }
    }

    fn aanc_config() -> PlatformConfig {
        PlatformConfig {
            anc: AncConfig {
                aanc_enabled: true,
                anc_type: AncType::FeedForward,
            },
            ..PlatformConfig::default()
        }
    }

    #[test]
    fn test_empty_and_input_masks_are_rejected() {
        let r = resolver();
        let state = RoutingState::default();
        assert_eq!(r.resolve_output(OutputDevices::NONE, &state), Resolution::none());

        let res = r.resolve_output(OutputDevices::from_bits(0x8000_0002), &state);
        assert_eq!(res.device, SoundDevice::None);
        assert!(matches!(res.condition, Some(PlatformError::UnknownDevice(_))));
    }

    #[test]
    fn test_single_bit_outputs() {
        let r = resolver();
        let state = RoutingState::default();
        let cases = [
            (OutputDevices::EARPIECE, SoundDevice::OutHandset),
            (OutputDevices::SPEAKER, SoundDevice::OutSpeaker),
            (OutputDevices::WIRED_HEADSET, SoundDevice::OutHeadphones),
            (OutputDevices::WIRED_HEADPHONE, SoundDevice::OutHeadphones),
            (OutputDevices::BLUETOOTH_SCO, SoundDevice::OutBtSco),
            (OutputDevices::BLUETOOTH_SCO_HEADSET, SoundDevice::OutBtSco),
            (OutputDevices::BLUETOOTH_SCO_CARKIT, SoundDevice::OutBtSco),
            (OutputDevices::AUX_DIGITAL, SoundDevice::OutHdmi),
            (OutputDevices::ANLG_DOCK_HEADSET, SoundDevice::OutUsbHeadset),
            (OutputDevices::DGTL_DOCK_HEADSET, SoundDevice::OutUsbHeadset),
            (OutputDevices::PROXY, SoundDevice::OutAfeProxy),
        ];
        for (mask, expected) in cases {
            let res = r.resolve_output(mask, &state);
            assert_eq!(res.device, expected, "mask {}", mask);
            assert_eq!(res.condition, None);
        }
    }

    #[test]
    fn test_unmapped_single_bits_report_unknown() {
        let r = resolver();
        let state = RoutingState::default();
        for mask in [
            OutputDevices::BLUETOOTH_A2DP,
            OutputDevices::USB_ACCESSORY,
            OutputDevices::REMOTE_SUBMIX,
        ] {
            let res = r.resolve_output(mask, &state);
            assert_eq!(res.device, SoundDevice::None);
            assert_eq!(res.condition, Some(PlatformError::UnknownDevice(mask.bits())));
        }
    }

    #[test]
    fn test_dock_without_usb_headset_is_unknown() {
        let config = PlatformConfig {
            usb_headset: false,
            ..PlatformConfig::default()
        };
        let r = resolver_with(config, CarrierIdentity::default());
        let res = r.resolve_output(OutputDevices::ANLG_DOCK_HEADSET, &RoutingState::default());
        assert_eq!(res.device, SoundDevice::None);
        assert!(res.condition.is_some());
    }

    #[test]
    fn test_speaker_swap_and_anc_headset() {
        let r = resolver();
        let swapped = RoutingState {
            speaker_lr_swap: true,
            ..RoutingState::default()
        };
        assert_eq!(
            r.resolve_output(OutputDevices::SPEAKER, &swapped).device,
            SoundDevice::OutSpeakerReverse
        );

        let anc = RoutingState {
            anc_enabled: true,
            ..RoutingState::default()
        };
        assert_eq!(
            r.resolve_output(OutputDevices::WIRED_HEADSET, &anc).device,
            SoundDevice::OutAncHeadset
        );
        // Headphones have no microphone and never get ANC
        assert_eq!(
            r.resolve_output(OutputDevices::WIRED_HEADPHONE, &anc).device,
            SoundDevice::OutHeadphones
        );

        let mut config = PlatformConfig::default();
        config.anc.anc_type = AncType::Feedback;
        let fb = resolver_with(config, CarrierIdentity::default());
        assert_eq!(
            fb.resolve_output(OutputDevices::WIRED_HEADSET, &anc).device,
            SoundDevice::OutAncFbHeadset
        );
    }

    #[test]
    fn test_proxy_requests_channel_map() {
        let r = resolver();
        let state = RoutingState {
            afe_proxy_channels: 6,
            ..RoutingState::default()
        };
        let res = r.resolve_output(OutputDevices::PROXY, &state);
        assert_eq!(res.device, SoundDevice::OutAfeProxy);
        assert_eq!(
            res.effect,
            Some(RoutingEffect::AfeProxyChannelMap { channels: 6 })
        );
    }

    #[test]
    fn test_combo_outputs() {
        let r = resolver();
        let state = RoutingState::default();
        let speaker = OutputDevices::SPEAKER;

        let cases = [
            (OutputDevices::WIRED_HEADPHONE | speaker, SoundDevice::OutSpeakerAndHeadphones),
            (OutputDevices::WIRED_HEADSET | speaker, SoundDevice::OutSpeakerAndHeadphones),
            (OutputDevices::AUX_DIGITAL | speaker, SoundDevice::OutSpeakerAndHdmi),
            (OutputDevices::ANLG_DOCK_HEADSET | speaker, SoundDevice::OutSpeakerAndUsbHeadset),
        ];
        for (mask, expected) in cases {
            assert_eq!(r.resolve_output(mask, &state).device, expected);
        }

        let anc = RoutingState {
            anc_enabled: true,
            ..RoutingState::default()
        };
        assert_eq!(
            r.resolve_output(OutputDevices::WIRED_HEADSET | speaker, &anc).device,
            SoundDevice::OutSpeakerAndAncHeadset
        );
    }

    #[test]
    fn test_invalid_combos() {
        let r = resolver();
        let state = RoutingState::default();
        for mask in [
            OutputDevices::EARPIECE | OutputDevices::SPEAKER,
            OutputDevices::DGTL_DOCK_HEADSET | OutputDevices::SPEAKER,
            OutputDevices::WIRED_HEADSET | OutputDevices::BLUETOOTH_SCO,
        ] {
            let res = r.resolve_output(mask, &state);
            assert_eq!(res.device, SoundDevice::None);
            assert_eq!(
                res.condition,
                Some(PlatformError::InvalidDeviceCombination(mask.bits()))
            );
        }
    }

    #[test]
    fn test_in_call_outputs() {
        let r = resolver();
        let state = in_call();
        assert_eq!(
            r.resolve_output(OutputDevices::WIRED_HEADSET, &state).device,
            SoundDevice::OutVoiceHeadphones
        );
        assert_eq!(
            r.resolve_output(OutputDevices::BLUETOOTH_SCO_HEADSET, &state).device,
            SoundDevice::OutBtSco
        );
        assert_eq!(
            r.resolve_output(OutputDevices::SPEAKER, &state).device,
            SoundDevice::OutVoiceSpeaker
        );
        assert_eq!(
            r.resolve_output(OutputDevices::DGTL_DOCK_HEADSET, &state).device,
            SoundDevice::OutUsbHeadset
        );
        // Wired wins over speaker, even with three bits set
        let mask = OutputDevices::WIRED_HEADSET | OutputDevices::SPEAKER | OutputDevices::EARPIECE;
        assert_eq!(
            r.resolve_output(mask, &state).device,
            SoundDevice::OutVoiceHeadphones
        );
        // Nothing voice-specific for HDMI, fall through to the normal table
        assert_eq!(
            r.resolve_output(OutputDevices::AUX_DIGITAL, &state).device,
            SoundDevice::OutHdmi
        );
    }

    #[test]
    fn test_in_call_tty_outputs() {
        let r = resolver();
        for (tty, expected) in [
            (TtyMode::Full, SoundDevice::OutVoiceTtyFullHeadphones),
            (TtyMode::Vco, SoundDevice::OutVoiceTtyVcoHeadphones),
            (TtyMode::Hco, SoundDevice::OutVoiceTtyHcoHandset),
        ] {
            let state = RoutingState {
                tty_mode: tty,
                anc_enabled: true,
                ..in_call()
            };
            assert_eq!(
                r.resolve_output(OutputDevices::WIRED_HEADPHONE, &state).device,
                expected
            );
        }

        let anc = RoutingState {
            anc_enabled: true,
            ..in_call()
        };
        assert_eq!(
            r.resolve_output(OutputDevices::WIRED_HEADSET, &anc).device,
            SoundDevice::OutVoiceAncHeadset
        );
    }

    #[test]
    fn test_in_call_earpiece_priority() {
        let tmus = resolver_with(aanc_config(), CarrierIdentity::tmus());
        let plain = resolver_with(aanc_config(), CarrierIdentity::default());
        let anc_state = RoutingState {
            anc_enabled: true,
            ..in_call()
        };

        // Carrier wins over ANC
        assert_eq!(
            tmus.resolve_output(OutputDevices::EARPIECE, &anc_state).device,
            SoundDevice::OutVoiceHandsetTmus
        );
        assert_eq!(
            plain.resolve_output(OutputDevices::EARPIECE, &anc_state).device,
            SoundDevice::OutAncHandset
        );
        assert_eq!(
            plain.resolve_output(OutputDevices::EARPIECE, &in_call()).device,
            SoundDevice::OutHandset
        );

        // Handset ANC needs a mono capture
        let stereo = RoutingState {
            active_input: Some(ActiveInput {
                channel_mask: ChannelMask::IN_STEREO,
                ..ActiveInput::default()
            }),
            ..anc_state
        };
        assert_eq!(
            plain.resolve_output(OutputDevices::EARPIECE, &stereo).device,
            SoundDevice::OutHandset
        );
    }

    #[test]
    fn test_tmus_can_be_disabled_by_config() {
        let config = PlatformConfig {
            tmus_audio: false,
            ..PlatformConfig::default()
        };
        let r = resolver_with(config, CarrierIdentity::tmus());
        assert_eq!(
            r.resolve_output(OutputDevices::EARPIECE, &in_call()).device,
            SoundDevice::OutHandset
        );
    }

    #[test]
    fn test_in_call_input_requires_output() {
        let r = resolver();
        assert_eq!(r.resolve_input(OutputDevices::NONE, &in_call()), Resolution::none());
    }

    #[test]
    fn test_in_call_tty_inputs() {
        let r = resolver();
        for (tty, expected) in [
            (TtyMode::Full, SoundDevice::InVoiceTtyFullHeadsetMic),
            (TtyMode::Vco, SoundDevice::InVoiceTtyVcoHandsetMic),
            (TtyMode::Hco, SoundDevice::InVoiceTtyHcoHeadsetMic),
        ] {
            let state = RoutingState {
                tty_mode: tty,
                ..in_call()
            };
            assert_eq!(
                r.resolve_input(OutputDevices::WIRED_HEADSET, &state).device,
                expected
            );
        }

        // TTY is ignored on the earpiece
        let state = RoutingState {
            tty_mode: TtyMode::Full,
            ..in_call()
        };
        assert_eq!(
            r.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InHandsetMic
        );
    }

    #[test]
    fn test_in_call_handset_inputs() {
        let state = in_call();
        let voice = FluenceConfig {
            voice_call: true,
            ..FluenceConfig::default()
        };

        let single = resolver();
        assert_eq!(
            single.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InHandsetMic
        );

        let endfire = resolver_with(
            dual_mic(DualMicConfig::Endfire, voice),
            CarrierIdentity::default(),
        );
        assert_eq!(
            endfire.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InVoiceDmicEf
        );
        assert_eq!(
            endfire.resolve_input(OutputDevices::WIRED_HEADPHONE, &state).device,
            SoundDevice::InVoiceDmicEf
        );

        let endfire_tmus = resolver_with(
            dual_mic(DualMicConfig::Endfire, voice),
            CarrierIdentity::tmus(),
        );
        assert_eq!(
            endfire_tmus.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InVoiceDmicEfTmus
        );

        let broadside = resolver_with(
            dual_mic(DualMicConfig::Broadside, voice),
            CarrierIdentity::default(),
        );
        assert_eq!(
            broadside.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InVoiceDmicBs
        );

        let no_fluence = resolver_with(
            dual_mic(DualMicConfig::Endfire, FluenceConfig::default()),
            CarrierIdentity::default(),
        );
        assert_eq!(
            no_fluence.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InHandsetMic
        );
    }

    #[test]
    fn test_in_call_aanc_input() {
        let r = resolver_with(aanc_config(), CarrierIdentity::default());
        let state = RoutingState {
            anc_enabled: true,
            ..in_call()
        };
        assert_eq!(
            r.resolve_input(OutputDevices::EARPIECE, &state).device,
            SoundDevice::InAancHandsetMic
        );
        // Headphones never use the handset ANC mic
        assert_eq!(
            r.resolve_input(OutputDevices::WIRED_HEADPHONE, &state).device,
            SoundDevice::InHandsetMic
        );
    }

    #[test]
    fn test_in_call_other_inputs() {
        let r = resolver();
        let state = in_call();
        assert_eq!(
            r.resolve_input(OutputDevices::WIRED_HEADSET, &state).device,
            SoundDevice::InVoiceHeadsetMic
        );
        assert_eq!(
            r.resolve_input(OutputDevices::BLUETOOTH_SCO_CARKIT, &state).device,
            SoundDevice::InBtScoMic
        );
        assert_eq!(
            r.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceSpeakerMic
        );

        let all = FluenceConfig {
            voice_call: true,
            voice_rec: false,
            speaker: true,
        };
        let ef = resolver_with(dual_mic(DualMicConfig::Endfire, all), CarrierIdentity::default());
        assert_eq!(
            ef.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceSpeakerDmicEf
        );
        let bs = resolver_with(dual_mic(DualMicConfig::Broadside, all), CarrierIdentity::default());
        assert_eq!(
            bs.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceSpeakerDmicBs
        );
    }

    #[test]
    fn test_camcorder_input() {
        let r = resolver();
        let state = capturing(AudioSource::Camcorder, InputDevices::BACK_MIC);
        assert_eq!(
            r.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InCamcorderMic
        );

        // No built-in microphone, fall back to the input mask
        let state = capturing(AudioSource::Camcorder, InputDevices::WIRED_HEADSET);
        assert_eq!(
            r.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InHeadsetMic
        );
    }

    #[test]
    fn test_voice_recognition_inputs() {
        let rec = FluenceConfig {
            voice_rec: true,
            ..FluenceConfig::default()
        };
        let mut state = capturing(AudioSource::VoiceRecognition, InputDevices::BUILTIN_MIC);

        let single = resolver();
        assert_eq!(
            single.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceRecMic
        );

        let ef = resolver_with(dual_mic(DualMicConfig::Endfire, rec), CarrierIdentity::default());
        assert_eq!(
            ef.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceRecDmicEfFluence
        );

        let bs_plain = resolver_with(
            dual_mic(DualMicConfig::Broadside, FluenceConfig::default()),
            CarrierIdentity::default(),
        );
        assert_eq!(
            bs_plain.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceRecMic
        );

        if let Some(input) = state.active_input.as_mut() {
            input.channel_mask = ChannelMask::IN_FRONT_BACK;
        }
        assert_eq!(
            ef.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceRecDmicEf
        );
        assert_eq!(
            bs_plain.resolve_input(OutputDevices::SPEAKER, &state).device,
            SoundDevice::InVoiceRecDmicBs
        );
    }

    #[test]
    fn test_voice_communication_aec() {
        let r = resolver();
        let mut state = capturing(AudioSource::VoiceCommunication, InputDevices::BUILTIN_MIC);
        if let Some(input) = state.active_input.as_mut() {
            input.enable_aec = true;
        }

        let res = r.resolve_input(OutputDevices::EARPIECE, &state);
        assert_eq!(res.device, SoundDevice::InHandsetMicAec);
        assert_eq!(
            res.effect,
            Some(RoutingEffect::EchoReference(EchoReference::SlimRx))
        );

        // Speaker output redirects capture to the back mic
        let res = r.resolve_input(OutputDevices::SPEAKER, &state);
        assert_eq!(res.device, SoundDevice::InSpeakerMicAec);

        if let Some(input) = state.active_input.as_mut() {
            input.device = InputDevices::WIRED_HEADSET;
        }
        assert_eq!(
            r.resolve_input(OutputDevices::WIRED_HEADSET, &state).device,
            SoundDevice::InHeadsetMicAec
        );
    }

    #[test]
    fn test_voice_communication_without_aec() {
        let r = resolver();
        let state = capturing(AudioSource::VoiceCommunication, InputDevices::BUILTIN_MIC);
        let res = r.resolve_input(OutputDevices::SPEAKER, &state);
        // Redirected to the back mic, then mapped by the input mask
        assert_eq!(res.device, SoundDevice::InSpeakerMic);
        assert_eq!(
            res.effect,
            Some(RoutingEffect::EchoReference(EchoReference::Disabled))
        );
    }

    #[test]
    fn test_default_source_selects_nothing() {
        let r = resolver();
        assert_eq!(
            r.resolve_input(OutputDevices::SPEAKER, &RoutingState::default()),
            Resolution::none()
        );
        let state = capturing(AudioSource::Default, InputDevices::BUILTIN_MIC);
        assert_eq!(r.resolve_input(OutputDevices::SPEAKER, &state), Resolution::none());
    }

    #[test]
    fn test_input_mask_mapping() {
        let r = resolver();
        let cases = [
            (InputDevices::BUILTIN_MIC, SoundDevice::InHandsetMic),
            (InputDevices::BACK_MIC, SoundDevice::InSpeakerMic),
            (InputDevices::WIRED_HEADSET, SoundDevice::InHeadsetMic),
            (InputDevices::BLUETOOTH_SCO_HEADSET, SoundDevice::InBtScoMic),
            (InputDevices::AUX_DIGITAL, SoundDevice::InHdmiMic),
            (InputDevices::ANLG_DOCK_HEADSET, SoundDevice::InUsbHeadsetMic),
        ];
        for (mask, expected) in cases {
            let state = capturing(AudioSource::Mic, mask);
            let res = r.resolve_input(OutputDevices::SPEAKER, &state);
            assert_eq!(res.device, expected, "mask {}", mask);
            assert_eq!(res.condition, None);
        }

        let state = capturing(AudioSource::Mic, InputDevices::AMBIENT);
        let res = r.resolve_input(OutputDevices::SPEAKER, &state);
        assert_eq!(res.device, SoundDevice::InHandsetMic);
        assert_eq!(
            res.condition,
            Some(PlatformError::UnknownDevice(InputDevices::AMBIENT.bits()))
        );
    }

    #[test]
    fn test_output_mask_mapping() {
        let r = resolver();
        let cases = [
            (OutputDevices::EARPIECE, SoundDevice::InHandsetMic),
            (OutputDevices::WIRED_HEADSET, SoundDevice::InHeadsetMic),
            (OutputDevices::SPEAKER, SoundDevice::InSpeakerMic),
            (OutputDevices::WIRED_HEADPHONE, SoundDevice::InHandsetMic),
            (OutputDevices::BLUETOOTH_SCO_HEADSET, SoundDevice::InBtScoMic),
            (OutputDevices::AUX_DIGITAL, SoundDevice::InHdmiMic),
            (OutputDevices::DGTL_DOCK_HEADSET, SoundDevice::InUsbHeadsetMic),
        ];
        // Voice-call capture masks defer to the output device
        let state = capturing(AudioSource::Mic, InputDevices::VOICE_CALL);
        for (mask, expected) in cases {
            assert_eq!(r.resolve_input(mask, &state).device, expected, "mask {}", mask);
        }

        let res = r.resolve_input(OutputDevices::PROXY, &state);
        assert_eq!(res.device, SoundDevice::InHandsetMic);
        assert_eq!(
            res.condition,
            Some(PlatformError::UnknownDevice(OutputDevices::PROXY.bits()))
        );
    }

    #[test]
    fn test_deserialized_capture_marker_defers_to_output() {
        let input: ActiveInput = toml::from_str(
            r#"
source = "mic"
device = 2147483648
channel_mask = 16
enable_aec = false
"#,
        )
        .unwrap();
        assert!(input.device.is_empty());

        let state = RoutingState {
            active_input: Some(input),
            ..RoutingState::default()
        };
        let res = resolver().resolve_input(OutputDevices::SPEAKER, &state);
        assert_eq!(res.device, SoundDevice::InSpeakerMic);
        assert_eq!(res.condition, None);
    }

    fn known_single_bit() -> impl Strategy<Value = OutputDevices> {
        prop::sample::select(vec![
            OutputDevices::EARPIECE,
            OutputDevices::SPEAKER,
            OutputDevices::WIRED_HEADSET,
            OutputDevices::WIRED_HEADPHONE,
            OutputDevices::BLUETOOTH_SCO,
            OutputDevices::BLUETOOTH_SCO_HEADSET,
            OutputDevices::BLUETOOTH_SCO_CARKIT,
            OutputDevices::AUX_DIGITAL,
            OutputDevices::ANLG_DOCK_HEADSET,
            OutputDevices::DGTL_DOCK_HEADSET,
            OutputDevices::PROXY,
        ])
    }

    proptest! {
        #[test]
        fn mapped_single_bits_never_resolve_to_none(
            mask in known_single_bit(),
            swap in any::<bool>(),
            anc in any::<bool>(),
        ) {
            let state = RoutingState {
                speaker_lr_swap: swap,
                anc_enabled: anc,
                ..RoutingState::default()
            };
            let res = resolver().resolve_output(mask, &state);
            prop_assert!(res.device.is_output());
            prop_assert_eq!(res.condition, None);
        }

        #[test]
        fn three_or_more_bits_are_invalid_outside_calls(bits in 0u32..0x8_0000) {
            let mask = OutputDevices::from_bits(bits);
            prop_assume!(mask.count() >= 3);
            let res = resolver().resolve_output(mask, &RoutingState::default());
            prop_assert_eq!(res.device, SoundDevice::None);
            prop_assert_eq!(res.condition, Some(PlatformError::InvalidDeviceCombination(bits)));
        }

        #[test]
        fn outputs_are_playback_devices(bits in any::<u32>(), in_call_mode in any::<bool>()) {
            let state = RoutingState {
                mode: if in_call_mode { AudioMode::InCall } else { AudioMode::Normal },
                ..RoutingState::default()
            };
            let device = resolver().resolve_output(OutputDevices::from_bits(bits), &state).device;
            prop_assert!(device.is_none() || device.is_output());
        }

        #[test]
        fn inputs_are_capture_devices(out in any::<u32>(), inp in any::<u32>(), aec in any::<bool>()) {
            let state = RoutingState {
                active_input: Some(ActiveInput {
                    source: AudioSource::VoiceCommunication,
                    device: InputDevices::from_bits(inp),
                    channel_mask: ChannelMask::IN_MONO,
                    enable_aec: aec,
                }),
                ..RoutingState::default()
            };
            let device = resolver().resolve_input(OutputDevices::from_bits(out), &state).device;
            prop_assert!(device.is_input());
        }
    }
}

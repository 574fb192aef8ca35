//! Sound devices: the canonical routing paths of the platform
//!
//! Every [`SoundDevice`] carries a display name (used as the mixer path name)
//! and an ACDB calibration id. Both live in one static table generated next to
//! the enum so the two can never drift apart.

use crate::domain::device::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Static description of one sound device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEntry {
    pub name: &'static str,
    /// ACDB id; negative means unconfigured
    pub acdb_id: i32,
    pub direction: Option<Direction>,
    /// The calibration id is a placeholder awaiting vendor confirmation
    pub provisional: bool,
}

macro_rules! sound_devices {
    ($(
        $(#[$meta:meta])*
        $variant:ident => ($name:literal, $acdb:expr, $dir:expr, $provisional:expr)
    ),+ $(,)?) => {
        /// Canonical identifier for one physical or logical audio path
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum SoundDevice {
            $($(#[$meta])* $variant,)+
        }

        impl SoundDevice {
            /// Every sound device in table order, `None` first
            pub const ALL: &'static [SoundDevice] = &[$(SoundDevice::$variant,)+];

            const TABLE: &'static [DeviceEntry] = &[$(
                DeviceEntry {
                    name: $name,
                    acdb_id: $acdb,
                    direction: $dir,
                    provisional: $provisional,
                },
            )+];
        }
    };
}

const OUT: Option<Direction> = Some(Direction::Playback);
const IN: Option<Direction> = Some(Direction::Capture);

sound_devices! {
    /// No match
    None => ("none", -1, Option::None, false),

    OutHandset => ("handset", 7, OUT, false),
    OutSpeaker => ("speaker", 15, OUT, false),
    OutSpeakerReverse => ("speaker-reverse", 15, OUT, false),
    OutHeadphones => ("headphones", 10, OUT, false),
    OutSpeakerAndHeadphones => ("speaker-and-headphones", 10, OUT, false),
    OutVoiceHandset => ("voice-handset", 7, OUT, false),
    OutVoiceSpeaker => ("voice-speaker", 15, OUT, false),
    OutVoiceHeadphones => ("voice-headphones", 10, OUT, false),
    OutHdmi => ("hdmi", 18, OUT, false),
    OutSpeakerAndHdmi => ("speaker-and-hdmi", 15, OUT, false),
    OutBtSco => ("bt-sco-headset", 22, OUT, false),
    OutVoiceHandsetTmus => ("voice-handset-tmus", 88, OUT, false),
    OutVoiceTtyFullHeadphones => ("voice-tty-full-headphones", 17, OUT, false),
    OutVoiceTtyVcoHeadphones => ("voice-tty-vco-headphones", 17, OUT, false),
    OutVoiceTtyHcoHandset => ("voice-tty-hco-handset", 37, OUT, false),
    OutAfeProxy => ("afe-proxy", 0, OUT, false),
    OutUsbHeadset => ("usb-headphones", 45, OUT, false),
    OutSpeakerAndUsbHeadset => ("speaker-and-usb-headphones", 14, OUT, false),
    OutAncHeadset => ("anc-headphones", 26, OUT, false),
    OutAncFbHeadset => ("anc-fb-headphones", 26, OUT, false),
    OutVoiceAncHeadset => ("voice-anc-headphones", 26, OUT, false),
    OutVoiceAncFbHeadset => ("voice-anc-fb-headphones", 26, OUT, false),
    OutSpeakerAndAncHeadset => ("speaker-and-anc-headphones", 26, OUT, false),
    OutAncHandset => ("anc-handset", 103, OUT, false),

    InHandsetMic => ("handset-mic", 4, IN, false),
    // May need to become 11 once the speaker mic gets its own profile
    InSpeakerMic => ("speaker-mic", 4, IN, true),
    InHeadsetMic => ("headset-mic", 8, IN, false),
    InHandsetMicAec => ("handset-mic", 40, IN, false),
    InSpeakerMicAec => ("speaker-mic-aec", 42, IN, false),
    InHeadsetMicAec => ("headset-mic", 47, IN, false),
    InVoiceSpeakerMic => ("voice-speaker-mic", 11, IN, false),
    InVoiceHeadsetMic => ("voice-headset-mic", 8, IN, false),
    InHdmiMic => ("hdmi-mic", 4, IN, false),
    InBtScoMic => ("bt-sco-mic", 21, IN, false),
    InCamcorderMic => ("camcorder-mic", 61, IN, false),
    InVoiceDmicEf => ("voice-dmic-ef", 41, IN, false),
    InVoiceDmicBs => ("voice-dmic-bs", 5, IN, false),
    InVoiceDmicEfTmus => ("voice-dmic-ef-tmus", 89, IN, false),
    InVoiceSpeakerDmicEf => ("voice-speaker-dmic-ef", 43, IN, false),
    InVoiceSpeakerDmicBs => ("voice-speaker-dmic-bs", 12, IN, false),
    InVoiceTtyFullHeadsetMic => ("voice-tty-full-headset-mic", 16, IN, false),
    InVoiceTtyVcoHandsetMic => ("voice-tty-vco-handset-mic", 36, IN, false),
    InVoiceTtyHcoHeadsetMic => ("voice-tty-hco-headset-mic", 16, IN, false),
    InVoiceRecMic => ("voice-rec-mic", 62, IN, false),
    // Recognition dual-mic ids are placeholders until proper ACDB ids land
    InVoiceRecDmicEf => ("voice-rec-dmic-ef", 62, IN, true),
    InVoiceRecDmicBs => ("voice-rec-dmic-bs", 62, IN, true),
    InVoiceRecDmicEfFluence => ("voice-rec-dmic-ef-fluence", 6, IN, true),
    InVoiceRecDmicBsFluence => ("voice-rec-dmic-bs-fluence", 5, IN, true),
    InUsbHeadsetMic => ("usb-headset-mic", 44, IN, false),
    InAancHandsetMic => ("aanc-handset-mic", 104, IN, false),
}

impl SoundDevice {
    /// Number of table entries, including `None`
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }

    /// Bounds-checked reverse of [`SoundDevice::index`]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn entry(self) -> &'static DeviceEntry {
        // ALL and TABLE are generated from the same list
        &Self::TABLE[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn acdb_id(self) -> i32 {
        self.entry().acdb_id
    }

    pub fn direction(self) -> Option<Direction> {
        self.entry().direction
    }

    pub fn is_output(self) -> bool {
        self.direction() == Some(Direction::Playback)
    }

    pub fn is_input(self) -> bool {
        self.direction() == Some(Direction::Capture)
    }

    pub fn is_provisional(self) -> bool {
        self.entry().provisional
    }

    pub fn is_none(self) -> bool {
        self == SoundDevice::None
    }

    /// Back-end suffix appended to a use-case mixer path for this device
    ///
    /// USB variants only exist when the platform routes USB headsets.
    pub fn backend_suffix(self, usb_headset: bool) -> Option<&'static str> {
        match self {
            SoundDevice::InBtScoMic | SoundDevice::OutBtSco => Some(" bt-sco"),
            SoundDevice::OutHdmi => Some(" hdmi"),
            SoundDevice::OutSpeakerAndHdmi => Some(" speaker-and-hdmi"),
            SoundDevice::OutAfeProxy => Some(" afe-proxy"),
            SoundDevice::OutUsbHeadset if usb_headset => Some(" usb-headphones"),
            SoundDevice::OutSpeakerAndUsbHeadset if usb_headset => {
                Some(" speaker-and-usb-headphones")
            }
            SoundDevice::InUsbHeadsetMic if usb_headset => Some(" usb-headset-mic"),
            _ => None,
        }
    }
}

impl Default for SoundDevice {
    fn default() -> Self {
        SoundDevice::None
    }
}

impl fmt::Display for SoundDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Display name for a raw table index; empty for anything out of range
pub fn device_name(index: usize) -> &'static str {
    SoundDevice::from_index(index).map_or("", SoundDevice::name)
}

/// Builds the mixer path for a use case routed to `device`
pub fn mixer_path(base: &str, device: SoundDevice, usb_headset: bool) -> String {
    let mut path = base.to_string();
    if let Some(suffix) = device.backend_suffix(usb_headset) {
        path.push_str(suffix);
    }
    path
}

/// Reference name and calibration id of every device, in table order
#[cfg(test)]
pub(crate) const REFERENCE_TABLE: &[(SoundDevice, &str, i32)] = &[
    (SoundDevice::None, "none", -1),
    (SoundDevice::OutHandset, "handset", 7),
    (SoundDevice::OutSpeaker, "speaker", 15),
    (SoundDevice::OutSpeakerReverse, "speaker-reverse", 15),
    (SoundDevice::OutHeadphones, "headphones", 10),
    (SoundDevice::OutSpeakerAndHeadphones, "speaker-and-headphones", 10),
    (SoundDevice::OutVoiceHandset, "voice-handset", 7),
    (SoundDevice::OutVoiceSpeaker, "voice-speaker", 15),
    (SoundDevice::OutVoiceHeadphones, "voice-headphones", 10),
    (SoundDevice::OutHdmi, "hdmi", 18),
    (SoundDevice::OutSpeakerAndHdmi, "speaker-and-hdmi", 15),
    (SoundDevice::OutBtSco, "bt-sco-headset", 22),
    (SoundDevice::OutVoiceHandsetTmus, "voice-handset-tmus", 88),
    (SoundDevice::OutVoiceTtyFullHeadphones, "voice-tty-full-headphones", 17),
    (SoundDevice::OutVoiceTtyVcoHeadphones, "voice-tty-vco-headphones", 17),
    (SoundDevice::OutVoiceTtyHcoHandset, "voice-tty-hco-handset", 37),
    (SoundDevice::OutAfeProxy, "afe-proxy", 0),
    (SoundDevice::OutUsbHeadset, "usb-headphones", 45),
    (SoundDevice::OutSpeakerAndUsbHeadset, "speaker-and-usb-headphones", 14),
    (SoundDevice::OutAncHeadset, "anc-headphones", 26),
    (SoundDevice::OutAncFbHeadset, "anc-fb-headphones", 26),
    (SoundDevice::OutVoiceAncHeadset, "voice-anc-headphones", 26),
    (SoundDevice::OutVoiceAncFbHeadset, "voice-anc-fb-headphones", 26),
    (SoundDevice::OutSpeakerAndAncHeadset, "speaker-and-anc-headphones", 26),
    (SoundDevice::OutAncHandset, "anc-handset", 103),
    (SoundDevice::InHandsetMic, "handset-mic", 4),
    (SoundDevice::InSpeakerMic, "speaker-mic", 4),
    (SoundDevice::InHeadsetMic, "headset-mic", 8),
    (SoundDevice::InHandsetMicAec, "handset-mic", 40),
    (SoundDevice::InSpeakerMicAec, "speaker-mic-aec", 42),
    (SoundDevice::InHeadsetMicAec, "headset-mic", 47),
    (SoundDevice::InVoiceSpeakerMic, "voice-speaker-mic", 11),
    (SoundDevice::InVoiceHeadsetMic, "voice-headset-mic", 8),
    (SoundDevice::InHdmiMic, "hdmi-mic", 4),
    (SoundDevice::InBtScoMic, "bt-sco-mic", 21),
    (SoundDevice::InCamcorderMic, "camcorder-mic", 61),
    (SoundDevice::InVoiceDmicEf, "voice-dmic-ef", 41),
    (SoundDevice::InVoiceDmicBs, "voice-dmic-bs", 5),
    (SoundDevice::InVoiceDmicEfTmus, "voice-dmic-ef-tmus", 89),
    (SoundDevice::InVoiceSpeakerDmicEf, "voice-speaker-dmic-ef", 43),
    (SoundDevice::InVoiceSpeakerDmicBs, "voice-speaker-dmic-bs", 12),
    (SoundDevice::InVoiceTtyFullHeadsetMic, "voice-tty-full-headset-mic", 16),
    (SoundDevice::InVoiceTtyVcoHandsetMic, "voice-tty-vco-handset-mic", 36),
    (SoundDevice::InVoiceTtyHcoHeadsetMic, "voice-tty-hco-headset-mic", 16),
    (SoundDevice::InVoiceRecMic, "voice-rec-mic", 62),
    (SoundDevice::InVoiceRecDmicEf, "voice-rec-dmic-ef", 62),
    (SoundDevice::InVoiceRecDmicBs, "voice-rec-dmic-bs", 62),
    (SoundDevice::InVoiceRecDmicEfFluence, "voice-rec-dmic-ef-fluence", 6),
    (SoundDevice::InVoiceRecDmicBsFluence, "voice-rec-dmic-bs-fluence", 5),
    (SoundDevice::InUsbHeadsetMic, "usb-headset-mic", 44),
    (SoundDevice::InAancHandsetMic, "aanc-handset-mic", 104),
];

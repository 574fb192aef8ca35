//! Audio device bitmasks and session enums
//!
//! Output and input devices are bitmasks of physical transducers and
//! accessories, laid out the way the audio framework reports them. Several
//! bits may be set at once (combo devices), so they are plain newtypes over
//! `u32` rather than enums.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

/// Marks a device mask as describing capture hardware.
pub const DEVICE_BIT_IN: u32 = 0x8000_0000;

/// Set of output devices (speaker, earpiece, headsets, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutputDevices(u32);

impl OutputDevices {
    pub const NONE: Self = Self(0);
    pub const EARPIECE: Self = Self(0x1);
    pub const SPEAKER: Self = Self(0x2);
    pub const WIRED_HEADSET: Self = Self(0x4);
    pub const WIRED_HEADPHONE: Self = Self(0x8);
    pub const BLUETOOTH_SCO: Self = Self(0x10);
    pub const BLUETOOTH_SCO_HEADSET: Self = Self(0x20);
    pub const BLUETOOTH_SCO_CARKIT: Self = Self(0x40);
    pub const BLUETOOTH_A2DP: Self = Self(0x80);
    pub const AUX_DIGITAL: Self = Self(0x400);
    pub const ANLG_DOCK_HEADSET: Self = Self(0x800);
    pub const DGTL_DOCK_HEADSET: Self = Self(0x1000);
    pub const USB_ACCESSORY: Self = Self(0x2000);
    pub const USB_DEVICE: Self = Self(0x4000);
    pub const REMOTE_SUBMIX: Self = Self(0x8000);
    pub const PROXY: Self = Self(0x4_0000);

    pub const ALL_SCO: Self =
        Self(Self::BLUETOOTH_SCO.0 | Self::BLUETOOTH_SCO_HEADSET.0 | Self::BLUETOOTH_SCO_CARKIT.0);
    pub const DOCK: Self = Self(Self::ANLG_DOCK_HEADSET.0 | Self::DGTL_DOCK_HEADSET.0);
    pub const WIRED: Self = Self(Self::WIRED_HEADSET.0 | Self::WIRED_HEADPHONE.0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when the mask carries the capture marker bit
    pub const fn is_input_mask(self) -> bool {
        self.0 & DEVICE_BIT_IN != 0
    }

    /// True when any bit of `other` is set in `self`
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Number of device bits set
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }
}

impl BitOr for OutputDevices {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for OutputDevices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

const OUTPUT_NAMES: &[(&str, OutputDevices)] = &[
    ("earpiece", OutputDevices::EARPIECE),
    ("speaker", OutputDevices::SPEAKER),
    ("wired-headset", OutputDevices::WIRED_HEADSET),
    ("wired-headphone", OutputDevices::WIRED_HEADPHONE),
    ("bt-sco", OutputDevices::BLUETOOTH_SCO),
    ("bt-sco-headset", OutputDevices::BLUETOOTH_SCO_HEADSET),
    ("bt-sco-carkit", OutputDevices::BLUETOOTH_SCO_CARKIT),
    ("bt-a2dp", OutputDevices::BLUETOOTH_A2DP),
    ("hdmi", OutputDevices::AUX_DIGITAL),
    ("analog-dock", OutputDevices::ANLG_DOCK_HEADSET),
    ("digital-dock", OutputDevices::DGTL_DOCK_HEADSET),
    ("usb-accessory", OutputDevices::USB_ACCESSORY),
    ("usb-device", OutputDevices::USB_DEVICE),
    ("remote-submix", OutputDevices::REMOTE_SUBMIX),
    ("proxy", OutputDevices::PROXY),
];

/// Parses a comma separated list of device names, e.g. `speaker,wired-headset`,
/// or a raw hex mask such as `0x6`.
impl FromStr for OutputDevices {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mask(s, OUTPUT_NAMES).map(Self)
    }
}

/// Set of capture devices, stored without [`DEVICE_BIT_IN`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32")]
pub struct InputDevices(u32);

impl From<u32> for InputDevices {
    fn from(bits: u32) -> Self {
        Self::from_bits(bits)
    }
}

impl InputDevices {
    pub const NONE: Self = Self(0);
    pub const COMMUNICATION: Self = Self(0x1);
    pub const AMBIENT: Self = Self(0x2);
    pub const BUILTIN_MIC: Self = Self(0x4);
    pub const BLUETOOTH_SCO_HEADSET: Self = Self(0x8);
    pub const WIRED_HEADSET: Self = Self(0x10);
    pub const AUX_DIGITAL: Self = Self(0x20);
    pub const VOICE_CALL: Self = Self(0x40);
    pub const BACK_MIC: Self = Self(0x80);
    pub const REMOTE_SUBMIX: Self = Self(0x100);
    pub const ANLG_DOCK_HEADSET: Self = Self(0x200);
    pub const DGTL_DOCK_HEADSET: Self = Self(0x400);

    pub const DOCK: Self = Self(Self::ANLG_DOCK_HEADSET.0 | Self::DGTL_DOCK_HEADSET.0);

    /// Builds a mask from framework bits, dropping the capture marker
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & !DEVICE_BIT_IN)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for InputDevices {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for InputDevices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

const INPUT_NAMES: &[(&str, InputDevices)] = &[
    ("communication", InputDevices::COMMUNICATION),
    ("ambient", InputDevices::AMBIENT),
    ("builtin-mic", InputDevices::BUILTIN_MIC),
    ("bt-sco-headset", InputDevices::BLUETOOTH_SCO_HEADSET),
    ("wired-headset", InputDevices::WIRED_HEADSET),
    ("hdmi", InputDevices::AUX_DIGITAL),
    ("voice-call", InputDevices::VOICE_CALL),
    ("back-mic", InputDevices::BACK_MIC),
    ("remote-submix", InputDevices::REMOTE_SUBMIX),
    ("analog-dock", InputDevices::ANLG_DOCK_HEADSET),
    ("digital-dock", InputDevices::DGTL_DOCK_HEADSET),
];

impl FromStr for InputDevices {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_mask(s, INPUT_NAMES).map(Self::from_bits)
    }
}

fn parse_mask<T: Copy>(s: &str, names: &[(&str, T)]) -> Result<u32, String>
where
    T: Into<u32>,
{
    let s = s.trim();
    if s.is_empty() || s == "none" {
        return Ok(0);
    }
    if let Some(hex) = s.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).map_err(|e| format!("invalid mask {s}: {e}"));
    }

    s.split(',')
        .map(str::trim)
        .try_fold(0u32, |acc, part| {
            names
                .iter()
                .find(|(name, _)| *name == part)
                .map(|(_, bits)| acc | (*bits).into())
                .ok_or_else(|| format!("unknown device: {part}"))
        })
}

impl From<OutputDevices> for u32 {
    fn from(devices: OutputDevices) -> u32 {
        devices.0
    }
}

impl From<InputDevices> for u32 {
    fn from(devices: InputDevices) -> u32 {
        devices.0
    }
}

/// Channel position mask of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMask(u32);

impl ChannelMask {
    pub const IN_LEFT: Self = Self(0x4);
    pub const IN_RIGHT: Self = Self(0x8);
    pub const IN_FRONT: Self = Self(0x10);
    pub const IN_BACK: Self = Self(0x20);

    pub const IN_MONO: Self = Self::IN_FRONT;
    pub const IN_STEREO: Self = Self(Self::IN_LEFT.0 | Self::IN_RIGHT.0);
    pub const IN_FRONT_BACK: Self = Self(Self::IN_FRONT.0 | Self::IN_BACK.0);

    pub const OUT_MONO: Self = Self(0x1);
    pub const OUT_STEREO: Self = Self(0x3);
    pub const OUT_5POINT1: Self = Self(0x3f);
    pub const OUT_7POINT1: Self = Self(0x63f);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn channel_count(self) -> u32 {
        self.0.count_ones()
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::IN_MONO
    }
}

/// Telephony mode of the audio framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioMode {
    #[default]
    Normal,
    Ringtone,
    InCall,
    InCommunication,
}

impl AudioMode {
    /// Voice call or VoIP, both of which pin the codec backend to defaults
    pub fn is_voice(self) -> bool {
        matches!(self, AudioMode::InCall | AudioMode::InCommunication)
    }
}

/// TTY (teletypewriter) accessibility mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TtyMode {
    #[default]
    Off,
    /// Full TTY: text both ways
    Full,
    /// Voice carry-over: user speaks, reads replies
    Vco,
    /// Hearing carry-over: user listens, types replies
    Hco,
}

/// Capture source requested by the active input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioSource {
    #[default]
    Default,
    Mic,
    VoiceUplink,
    VoiceDownlink,
    VoiceCall,
    Camcorder,
    VoiceRecognition,
    VoiceCommunication,
}

/// Physical arrangement of the two microphones, if the target has two
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DualMicConfig {
    #[default]
    None,
    Endfire,
    Broadside,
}

impl DualMicConfig {
    /// Parses the `persist.audio.dualmic.config` property value
    pub fn from_property(value: &str) -> Self {
        match value {
            "broadside" => DualMicConfig::Broadside,
            "endfire" => DualMicConfig::Endfire,
            _ => DualMicConfig::None,
        }
    }
}

/// Direction of a PCM stream or sound device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Playback,
    Capture,
}

macro_rules! kebab_from_str {
    ($ty:ty { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

kebab_from_str!(AudioMode {
    "normal" => AudioMode::Normal,
    "ringtone" => AudioMode::Ringtone,
    "in-call" => AudioMode::InCall,
    "in-communication" => AudioMode::InCommunication,
});

kebab_from_str!(TtyMode {
    "off" => TtyMode::Off,
    "full" => TtyMode::Full,
    "vco" => TtyMode::Vco,
    "hco" => TtyMode::Hco,
});

kebab_from_str!(AudioSource {
    "default" => AudioSource::Default,
    "mic" => AudioSource::Mic,
    "voice-uplink" => AudioSource::VoiceUplink,
    "voice-downlink" => AudioSource::VoiceDownlink,
    "voice-call" => AudioSource::VoiceCall,
    "camcorder" => AudioSource::Camcorder,
    "voice-recognition" => AudioSource::VoiceRecognition,
    "voice-communication" => AudioSource::VoiceCommunication,
});

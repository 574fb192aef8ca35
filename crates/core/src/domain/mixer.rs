//! Mixer control surface and the control sequences the platform issues
//!
//! The control interface itself (ALSA-style `mixer_ctl_*`) lives outside this
//! crate and is consumed through [`MixerControls`]. Every write here is
//! fire-and-forget: nothing is read back or retried.

use crate::domain::device::AudioMode;
use crate::domain::error::{PlatformError, Result};
use std::sync::Arc;
use tracing::{debug, error, trace};

pub const EC_REF_RX: &str = "EC_REF_RX";
pub const VOICE_RX_GAIN: &str = "Voice Rx Gain";
pub const VOICE_TX_MUTE: &str = "Voice Tx Mute";
pub const HDMI_RX_CHANNELS: &str = "HDMI_RX Channels";
pub const HDMI_EDID: &str = "HDMI EDID";
pub const SLIM_0_RX_FORMAT: &str = "SLIM_0_RX Format";
pub const SLIM_0_RX_SAMPLE_RATE: &str = "SLIM_0_RX SampleRate";
pub const PLAYBACK_CHANNEL_MAP: &str = "Playback Channel Map";

/// Voice session id addressing every active voice session
pub const ALL_SESSION_VSID: i64 = 0xFFFF_FFFF;
pub const DEFAULT_VOLUME_RAMP_DURATION_MS: i64 = 20;
pub const DEFAULT_MUTE_RAMP_DURATION_MS: i64 = 500;

const MIN_VOL_INDEX: f64 = 0.0;
const MAX_VOL_INDEX: f64 = 5.0;

const MAX_SAD_BLOCKS: usize = 10;
const SAD_BLOCK_SIZE: usize = 3;
const EDID_FORMAT_LPCM: u8 = 1;

/// Opaque handle to a mixer control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlId(pub u32);

/// Mixer control interface of the sound card
///
/// Lookups report absence with `None`; callers treat that as a recoverable
/// [`PlatformError::MissingControlSurface`].
pub trait MixerControls: Send + Sync {
    /// Find a control by its name
    fn control(&self, name: &str) -> Option<ControlId>;

    /// Set an enumerated control to one of its named values
    fn set_enum_by_name(&self, ctl: ControlId, value: &str) -> Result<()>;

    /// Write an integer array control
    fn set_array(&self, ctl: ControlId, values: &[i64]) -> Result<()>;

    /// Read a byte array control
    fn get_array(&self, ctl: ControlId) -> Result<Vec<u8>>;
}

impl<T: MixerControls + ?Sized> MixerControls for Arc<T> {
    fn control(&self, name: &str) -> Option<ControlId> {
        (**self).control(name)
    }

    fn set_enum_by_name(&self, ctl: ControlId, value: &str) -> Result<()> {
        (**self).set_enum_by_name(ctl, value)
    }

    fn set_array(&self, ctl: ControlId, values: &[i64]) -> Result<()> {
        (**self).set_array(ctl, values)
    }

    fn get_array(&self, ctl: ControlId) -> Result<Vec<u8>> {
        (**self).get_array(ctl)
    }
}

fn lookup(mixer: &dyn MixerControls, name: &str) -> Result<ControlId> {
    mixer.control(name).ok_or_else(|| {
        error!(control = name, "Could not get ctl for mixer cmd");
        PlatformError::MissingControlSurface(name.to_string())
    })
}

/// Looks up `name` and selects `value` on it
pub fn set_enum(mixer: &dyn MixerControls, name: &str, value: &str) -> Result<()> {
    let ctl = lookup(mixer, name)?;
    trace!(control = name, value, "Setting mixer enum");
    mixer.set_enum_by_name(ctl, value)
}

/// Looks up `name` and writes `values` to it
pub fn set_values(mixer: &dyn MixerControls, name: &str, values: &[i64]) -> Result<()> {
    let ctl = lookup(mixer, name)?;
    trace!(control = name, ?values, "Setting mixer array");
    mixer.set_array(ctl, values)
}

/// Echo canceller reference feeding the voice-communication capture path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EchoReference {
    /// Take the reference from the SLIMbus playback port
    SlimRx,
    Disabled,
}

impl EchoReference {
    pub fn as_str(self) -> &'static str {
        match self {
            EchoReference::SlimRx => "SLIM_RX",
            EchoReference::Disabled => "NONE",
        }
    }
}

pub fn set_echo_reference(mixer: &dyn MixerControls, reference: EchoReference) -> Result<()> {
    debug!(reference = reference.as_str(), "Setting EC reference");
    set_enum(mixer, EC_REF_RX, reference.as_str())
}

/// Maps a 0..=100 volume percentage onto the DSP's 0..=5 index, rounding half up
///
/// Percentages above 100 are clamped to 100 so the index never exceeds 5.
pub fn voice_volume_index(percent: u32) -> i64 {
    let percent = f64::from(percent.min(100));
    (percent * (MAX_VOL_INDEX - MIN_VOL_INDEX) * 0.01 + MIN_VOL_INDEX + 0.5) as i64
}

pub fn set_voice_volume(mixer: &dyn MixerControls, percent: u32) -> Result<()> {
    let index = voice_volume_index(percent);
    debug!(percent, index, "Setting voice volume");
    set_values(
        mixer,
        VOICE_RX_GAIN,
        &[index, ALL_SESSION_VSID, DEFAULT_VOLUME_RAMP_DURATION_MS],
    )
}

/// Mutes the voice uplink; only meaningful while a call is up
pub fn set_mic_mute(mixer: &dyn MixerControls, mode: AudioMode, muted: bool) -> Result<()> {
    if mode != AudioMode::InCall {
        trace!(?mode, "Mic mute ignored outside of a call");
        return Ok(());
    }
    debug!(muted, "Setting mic mute");
    set_values(
        mixer,
        VOICE_TX_MUTE,
        &[i64::from(muted), ALL_SESSION_VSID, DEFAULT_MUTE_RAMP_DURATION_MS],
    )
}

/// Enum value of the HDMI channel-count control
pub fn hdmi_channel_name(channel_count: u32) -> &'static str {
    match channel_count {
        8 => "Eight",
        7 => "Seven",
        6 => "Six",
        5 => "Five",
        4 => "Four",
        3 => "Three",
        _ => "Two",
    }
}

pub fn set_hdmi_channels(mixer: &dyn MixerControls, channel_count: u32) -> Result<()> {
    let name = hdmi_channel_name(channel_count);
    debug!(channels = name, "HDMI channel count");
    set_enum(mixer, HDMI_RX_CHANNELS, name)
}

/// Largest LPCM channel count advertised by a block of short audio descriptors
pub fn parse_edid_max_channels(block: &[u8]) -> u32 {
    let len = block.len().min(MAX_SAD_BLOCKS * SAD_BLOCK_SIZE);
    block[..len]
        .chunks_exact(SAD_BLOCK_SIZE)
        .map(|sad| sad[0])
        .filter(|byte0| byte0 >> 3 == EDID_FORMAT_LPCM)
        .map(|byte0| u32::from(byte0 & 0x7) + 1)
        .max()
        .unwrap_or(0)
}

/// Reads the sink's EDID and reports its maximum LPCM channel count, 0 on failure
pub fn edid_max_channels(mixer: &dyn MixerControls) -> u32 {
    let block = match lookup(mixer, HDMI_EDID).and_then(|ctl| mixer.get_array(ctl)) {
        Ok(block) => block,
        Err(e) => {
            error!(error = %e, "Failed to get EDID info");
            return 0;
        }
    };
    parse_edid_max_channels(&block)
}

/// DSP channel position codes
pub mod channel_position {
    pub const FL: i64 = 1;
    pub const FR: i64 = 2;
    pub const FC: i64 = 3;
    pub const LS: i64 = 4;
    pub const RS: i64 = 5;
    pub const LFE: i64 = 6;
    pub const LB: i64 = 8;
    pub const RB: i64 = 9;
}

const CHANNEL_MAP_LEN: usize = 8;

/// Channel map for the AFE proxy sink, padded to the control's width
pub fn afe_proxy_channel_map(channel_count: u32) -> Option<[i64; CHANNEL_MAP_LEN]> {
    use channel_position::*;

    let positions: &[i64] = match channel_count {
        2 => &[FL, FR],
        6 => &[FL, FR, FC, LFE, LS, RS],
        8 => &[FL, FR, FC, LFE, LB, RB, LS, RS],
        _ => return None,
    };
    let mut map = [0; CHANNEL_MAP_LEN];
    map[..positions.len()].copy_from_slice(positions);
    Some(map)
}

pub fn set_afe_proxy_channel_map(mixer: &dyn MixerControls, channel_count: u32) -> Result<()> {
    let map = afe_proxy_channel_map(channel_count).ok_or_else(|| PlatformError::MixerAccess {
        control: PLAYBACK_CHANNEL_MAP.to_string(),
        reason: format!("unsupported proxy channel count {channel_count}"),
    })?;
    debug!(channels = channel_count, "Setting sink capability for proxy");
    set_values(mixer, PLAYBACK_CHANNEL_MAP, &map)
}

//! Offload fragment sizing

use crate::domain::device::ChannelMask;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

pub const COMPRESS_OFFLOAD_FRAGMENT_SIZE: u32 = 32 * 1024;
pub const MIN_COMPRESS_OFFLOAD_FRAGMENT_SIZE: u32 = 2 * 1024;
pub const MAX_COMPRESS_OFFLOAD_FRAGMENT_SIZE: u32 = 256 * 1024;
pub const COMPRESS_OFFLOAD_FRAGMENT_SIZE_FOR_AV_STREAMING: u32 = 2 * 1024;

/// Bounded by the 1 MiB flinger control block; a multiple of 24
pub const MAX_PCM_OFFLOAD_FRAGMENT_SIZE: u32 = 240 * 1024;
pub const MIN_PCM_OFFLOAD_FRAGMENT_SIZE: u32 = 4 * 1024;

/// Buffer duration for PCM offload alongside video, in ms
pub const PCM_OFFLOAD_BUFFER_DURATION_FOR_AV: u64 = 1000;
pub const PCM_OFFLOAD_BUFFER_DURATION_FOR_AV_STREAMING: u64 = 80;

const FRAGMENT_ALIGNMENT: u32 = 1024;

/// Payload format of an offloaded stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OffloadFormat {
    /// Any compressed codec other than FLAC (MP3, AAC, ...)
    #[default]
    Compressed,
    Flac,
    Pcm16,
    /// 24-bit samples carried in 32-bit containers
    Pcm24,
}

impl OffloadFormat {
    /// Bytes per sample as laid out in the DSP buffer
    fn container_bytes(self) -> u64 {
        match self {
            OffloadFormat::Pcm24 => 4,
            _ => 2,
        }
    }
}

impl FromStr for OffloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compressed" => Ok(OffloadFormat::Compressed),
            "flac" => Ok(OffloadFormat::Flac),
            "pcm16" => Ok(OffloadFormat::Pcm16),
            "pcm24" => Ok(OffloadFormat::Pcm24),
            other => Err(format!("unknown offload format: {}", other)),
        }
    }
}

/// Stream metadata handed over when an offload session opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffloadInfo {
    pub format: OffloadFormat,
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
    pub has_video: bool,
    pub is_streaming: bool,
}

impl Default for OffloadInfo {
    fn default() -> Self {
        Self {
            format: OffloadFormat::default(),
            sample_rate: 48_000,
            channel_mask: ChannelMask::OUT_STEREO,
            has_video: false,
            is_streaming: false,
        }
    }
}

fn align(size: u32, to: u32) -> u32 {
    size.saturating_add(to - 1) & !(to - 1)
}

/// Fragment size for a compressed offload session
///
/// `override_kb` comes from the operator property; FLAC (when enabled) and
/// AV streaming take precedence over it.
pub fn compress_offload_buffer_size(
    info: Option<&OffloadInfo>,
    override_kb: Option<u32>,
    flac_enabled: bool,
) -> u32 {
    let mut fragment_size = override_kb
        .map_or(COMPRESS_OFFLOAD_FRAGMENT_SIZE, |kb| kb.saturating_mul(1024));

    if let Some(info) = info {
        if flac_enabled && !info.has_video && info.format == OffloadFormat::Flac {
            fragment_size = MAX_COMPRESS_OFFLOAD_FRAGMENT_SIZE;
            debug!(fragment_size, "FLAC fragment size");
        }
        if info.has_video && info.is_streaming {
            fragment_size = COMPRESS_OFFLOAD_FRAGMENT_SIZE_FOR_AV_STREAMING;
            debug!(fragment_size, "Offload fragment size reduced for AV streaming");
        }
    }

    align(fragment_size, FRAGMENT_ALIGNMENT).clamp(
        MIN_COMPRESS_OFFLOAD_FRAGMENT_SIZE,
        MAX_COMPRESS_OFFLOAD_FRAGMENT_SIZE,
    )
}

/// Fragment size for a PCM offload session
///
/// Audio-only streams get the largest fragment; with video the fragment holds
/// a fixed duration of audio. `override_kb` wins over both.
pub fn pcm_offload_buffer_size(info: &OffloadInfo, override_kb: Option<u32>) -> u32 {
    let duration_bytes = |duration_ms: u64| {
        let bytes = duration_ms
            * u64::from(info.sample_rate)
            * info.format.container_bytes()
            * u64::from(info.channel_mask.channel_count())
            / 1000;
        u32::try_from(bytes).unwrap_or(u32::MAX)
    };

    let mut fragment_size = if !info.has_video {
        MAX_PCM_OFFLOAD_FRAGMENT_SIZE
    } else if info.is_streaming {
        duration_bytes(PCM_OFFLOAD_BUFFER_DURATION_FOR_AV_STREAMING)
    } else {
        duration_bytes(PCM_OFFLOAD_BUFFER_DURATION_FOR_AV)
    };

    if let Some(kb) = override_kb {
        fragment_size = kb.saturating_mul(1024);
        debug!(fragment_size, "Using buffer size from sys prop");
    }

    align(fragment_size, FRAGMENT_ALIGNMENT)
        .clamp(MIN_PCM_OFFLOAD_FRAGMENT_SIZE, MAX_PCM_OFFLOAD_FRAGMENT_SIZE)
}

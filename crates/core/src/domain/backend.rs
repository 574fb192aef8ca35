//! Codec backend arbitration
//!
//! Every playback stream shares one SLIMbus backend, so its bit width and
//! sample rate must satisfy the most demanding active stream. The state lives
//! with the caller; these functions compute and program it.

use crate::domain::device::AudioMode;
use crate::domain::error::Result;
use crate::domain::mixer::{self, MixerControls, SLIM_0_RX_FORMAT, SLIM_0_RX_SAMPLE_RATE};
use crate::domain::usecase::ActiveUseCase;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

pub const DEFAULT_BIT_WIDTH: u32 = 16;
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Programmed (or requested) backend format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecBackendConfig {
    pub bit_width: u32,
    pub sample_rate: u32,
}

impl Default for CodecBackendConfig {
    fn default() -> Self {
        Self {
            bit_width: DEFAULT_BIT_WIDTH,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl CodecBackendConfig {
    pub fn new(bit_width: u32, sample_rate: u32) -> Self {
        Self {
            bit_width,
            sample_rate,
        }
    }
}

/// Backend format the active streams call for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendTarget {
    pub config: CodecBackendConfig,
    /// Target differs from what is currently programmed
    pub change: bool,
}

/// Smallest supported backend rate that can carry `sample_rate`
pub fn best_sample_rate(sample_rate: u32) -> u32 {
    match sample_rate {
        0..=48_000 => 48_000,
        48_001..=96_000 => 96_000,
        96_001..=192_000 => 192_000,
        _ => DEFAULT_SAMPLE_RATE,
    }
}

pub fn best_bit_width(bit_width: u32) -> u32 {
    if bit_width == 24 {
        24
    } else {
        DEFAULT_BIT_WIDTH
    }
}

/// Enum value of the backend sample-rate control
pub fn sample_rate_name(sample_rate: u32) -> &'static str {
    match sample_rate {
        8_000 => "KHZ_8",
        11_025 => "KHZ_11_025",
        16_000 => "KHZ_16",
        22_050 => "KHZ_22_05",
        32_000 => "KHZ_32",
        44_100 => "KHZ_44_1",
        48_000 => "KHZ_48",
        64_000 => "KHZ_64",
        88_200 => "KHZ_88_2",
        96_000 => "KHZ_96",
        176_400 => "KHZ_176_4",
        192_000 => "KHZ_192",
        _ => "KHZ_48",
    }
}

/// Computes the backend format for the active use cases
///
/// Voice and VoIP calls always run the backend at the defaults, as does an
/// idle HAL with no playback streams.
pub fn compute_backend_target(
    mode: AudioMode,
    active: &[ActiveUseCase],
    current: CodecBackendConfig,
) -> BackendTarget {
    let config = if mode.is_voice() {
        warn!("Use default bw and sr for voice/voip calls");
        CodecBackendConfig::default()
    } else {
        active
            .iter()
            .filter_map(|usecase| usecase.stream)
            .map(|stream| {
                let best = CodecBackendConfig::new(
                    best_bit_width(stream.bit_width),
                    best_sample_rate(stream.sample_rate),
                );
                trace!(bw = best.bit_width, sr = best.sample_rate, "Playback running");
                best
            })
            .reduce(|a, b| {
                CodecBackendConfig::new(a.bit_width.max(b.bit_width), a.sample_rate.max(b.sample_rate))
            })
            .unwrap_or_default()
    };

    let change = config != current;
    if change {
        debug!(?current, target = ?config, "Codec backend needs to be updated");
    }
    BackendTarget { config, change }
}

/// Programs the backend controls and records what was written in `current`
///
/// Switching to 16 bit also forces the default rate. A missing control stops
/// the sequence; fields not yet written keep their previous value.
pub fn apply_backend_config(
    mixer: &dyn MixerControls,
    current: &mut CodecBackendConfig,
    target: CodecBackendConfig,
) -> Result<()> {
    let mut sample_rate = target.sample_rate;

    if target.bit_width != current.bit_width {
        let format = if target.bit_width == 24 {
            "S24_LE"
        } else {
            sample_rate = DEFAULT_SAMPLE_RATE;
            "S16_LE"
        };
        mixer::set_enum(mixer, SLIM_0_RX_FORMAT, format)?;
        current.bit_width = target.bit_width;
        info!(bit_width = target.bit_width, "Backend bit width set");
    }

    let stale_default = current.bit_width == DEFAULT_BIT_WIDTH
        && current.sample_rate != DEFAULT_SAMPLE_RATE;
    if stale_default || current.sample_rate != sample_rate {
        let rate = sample_rate_name(sample_rate);
        debug!(rate, "Setting backend sample rate");
        mixer::set_enum(mixer, SLIM_0_RX_SAMPLE_RATE, rate)?;
        current.sample_rate = sample_rate;
    }

    Ok(())
}

/// Recomputes and, when needed, reprograms the backend
///
/// Returns whether the programmed state changed. Without 24-bit support the
/// backend is never touched, whatever the streams request.
pub fn check_and_set_codec_backend(
    mixer: &dyn MixerControls,
    current: &mut CodecBackendConfig,
    mode: AudioMode,
    active: &[ActiveUseCase],
    twenty_four_bit: bool,
) -> Result<bool> {
    if !twenty_four_bit {
        debug!("24bit not enabled, no need to check for backend change");
        return Ok(false);
    }

    let old = *current;
    let target = compute_backend_target(mode, active, old);
    if target.change {
        apply_backend_config(mixer, current, target.config)?;
    }

    let changed = old != *current;
    if changed {
        info!(
            bit_width = current.bit_width,
            sample_rate = current.sample_rate,
            "New codec backend configuration"
        );
    }
    Ok(changed)
}

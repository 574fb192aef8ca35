//! Configuration management for the routing platform
//!
//! This module provides:
//! - [`PlatformConfig`], serializable to TOML and buildable from system properties
//! - [`PropertyStore`], the read-only key-value store the HAL queries
//! - [`CarrierIdentity`], computed once at startup and injected into routing

use crate::domain::calibration::DMIC_FLAG;
use crate::domain::device::DualMicConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// System property keys read by the platform
pub mod keys {
    pub const DUALMIC_CONFIG: &str = "persist.audio.dualmic.config";
    pub const FLUENCE_VOICE_CALL: &str = "persist.audio.fluence.voicecall";
    pub const FLUENCE_VOICE_REC: &str = "persist.audio.fluence.voicerec";
    pub const FLUENCE_SPEAKER: &str = "persist.audio.fluence.speaker";
    pub const AANC_ENABLE: &str = "persist.aanc.enable";
    pub const HEADSET_ANC_TYPE: &str = "persist.headset.anc.type";
    pub const OFFLOAD_BUFFER_SIZE_KB: &str = "audio.offload.buffer.size.kb";
    pub const OFFLOAD_PCM_BUFFER_SIZE: &str = "audio.offload.pcm.buffer.size";
    pub const OFFLOAD_24BIT_ENABLE: &str = "audio.offload.24bit.enable";
    pub const OPERATOR_NUMERIC: &str = "gsm.sim.operator.numeric";
}

/// Read-only system property lookup
pub trait PropertyStore {
    fn get(&self, key: &str) -> Option<String>;

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

impl PropertyStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// C `atoi` semantics: leading whitespace, optional sign, digits; 0 otherwise
fn atoi(value: &str) -> i64 {
    let value = value.trim_start();
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, value.strip_prefix('+').unwrap_or(value)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().map_or(0, |n| sign * n)
}

/// Positive integer property, `None` when unset, zero or malformed
fn positive_property(props: &dyn PropertyStore, key: &str) -> Option<u32> {
    props
        .get(key)
        .map(|v| atoi(&v))
        .filter(|n| *n > 0)
        .and_then(|n| u32::try_from(n).ok())
}

/// Fluence (dual-mic noise suppression) per use case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FluenceConfig {
    pub voice_call: bool,
    pub voice_rec: bool,
    pub speaker: bool,
}

/// Headset ANC flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AncType {
    #[default]
    FeedForward,
    Feedback,
}

/// Active noise cancellation capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AncConfig {
    /// Adaptive ANC on the handset earpiece
    pub aanc_enabled: bool,
    pub anc_type: AncType,
}

impl AncConfig {
    pub fn use_feedback(&self) -> bool {
        self.anc_type == AncType::Feedback
    }

    /// Handset ANC needs ANC switched on, AANC support and a mono capture
    pub fn should_use_handset_anc(&self, anc_enabled: bool, channel_count: u32) -> bool {
        self.aanc_enabled && anc_enabled && channel_count == 1
    }
}

/// Offload buffer overrides and codec backend capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Compress offload fragment override in KiB
    pub buffer_size_kb: Option<u32>,
    /// PCM offload fragment override in KiB
    pub pcm_buffer_size_kb: Option<u32>,
    /// Use the maximum fragment for FLAC
    pub flac: bool,
    /// Allow reprogramming the codec backend to 24 bit / high rates
    pub twenty_four_bit: bool,
}

/// Mixer card and startup retry policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub card: u32,
    /// Attempts after the first failed open
    pub open_retries: u32,
    pub retry_interval_ms: u64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            card: 0,
            open_retries: 10,
            retry_interval_ms: 500,
        }
    }
}

/// Complete platform configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub dual_mic: DualMicConfig,
    pub fluence: FluenceConfig,
    pub anc: AncConfig,
    pub offload: OffloadConfig,
    /// Route dock outputs and inputs to the USB headset devices
    pub usb_headset: bool,
    /// Honour the T-Mobile US handset tuning
    pub tmus_audio: bool,
    /// SIM operator MCC+MNC, e.g. 310260
    pub operator_numeric: Option<u32>,
    pub mixer: MixerConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            dual_mic: DualMicConfig::None,
            fluence: FluenceConfig::default(),
            anc: AncConfig::default(),
            offload: OffloadConfig::default(),
            usb_headset: true,
            tmus_audio: true,
            operator_numeric: None,
            mixer: MixerConfig::default(),
        }
    }
}

impl PlatformConfig {
    /// Build the configuration from system properties
    ///
    /// Fluence flags are only read when the target has two microphones.
    pub fn from_properties(props: &dyn PropertyStore) -> Self {
        let mut config = Self {
            dual_mic: DualMicConfig::from_property(&props.get_or(keys::DUALMIC_CONFIG, "")),
            ..Self::default()
        };

        if config.dual_mic != DualMicConfig::None {
            let is_true = |key| props.get_or(key, "") == "true";
            config.fluence = FluenceConfig {
                voice_call: is_true(keys::FLUENCE_VOICE_CALL),
                voice_rec: is_true(keys::FLUENCE_VOICE_REC),
                speaker: is_true(keys::FLUENCE_SPEAKER),
            };
        }

        config.anc = AncConfig {
            aanc_enabled: props.get_or(keys::AANC_ENABLE, "0").starts_with("true"),
            anc_type: if props.get_or(keys::HEADSET_ANC_TYPE, "0").starts_with("feedback") {
                AncType::Feedback
            } else {
                AncType::FeedForward
            },
        };

        config.offload = OffloadConfig {
            buffer_size_kb: positive_property(props, keys::OFFLOAD_BUFFER_SIZE_KB),
            pcm_buffer_size_kb: positive_property(props, keys::OFFLOAD_PCM_BUFFER_SIZE),
            flac: false,
            twenty_four_bit: atoi(&props.get_or(keys::OFFLOAD_24BIT_ENABLE, "0")) != 0,
        };

        config.operator_numeric = positive_property(props, keys::OPERATOR_NUMERIC);

        debug!(?config, "Platform configuration read from properties");
        config
    }

    pub fn fluence_in_voice_call(&self) -> bool {
        self.dual_mic != DualMicConfig::None && self.fluence.voice_call
    }

    pub fn fluence_in_voice_rec(&self) -> bool {
        self.dual_mic != DualMicConfig::None && self.fluence.voice_rec
    }

    pub fn fluence_in_speaker(&self) -> bool {
        self.dual_mic != DualMicConfig::None && self.fluence.speaker
    }

    /// Settings word handed to the calibration library alongside device ids
    pub fn acdb_settings(&self) -> u32 {
        if self.dual_mic == DualMicConfig::None {
            0
        } else {
            DMIC_FLAG
        }
    }

    /// Carrier identity derived from the configured operator
    pub fn carrier(&self) -> CarrierIdentity {
        match self.operator_numeric {
            Some(mccmnc) if self.tmus_audio => {
                debug!(mccmnc, "Checking operator");
                CarrierIdentity::from_mccmnc(mccmnc)
            }
            _ => CarrierIdentity::default(),
        }
    }

    /// Load configuration from TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.offload.buffer_size_kb == Some(0) || self.offload.pcm_buffer_size_kb == Some(0) {
            return Err(ConfigError::Invalid(
                "offload buffer overrides must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Which network operator the SIM belongs to, as far as tuning cares
///
/// Built once at startup and passed to the resolver; it never changes for the
/// life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CarrierIdentity {
    tmus: bool,
}

impl CarrierIdentity {
    /// T-Mobile US: MCC 310 with these MNCs
    pub const TMUS_MCCMNC: &'static [u32] = &[
        310490, 310260, 310026, 310800, 310660, 310580, 310310, 310270, 310250, 310240, 310230,
        310220, 310210, 310200, 310160,
    ];

    pub fn from_mccmnc(mccmnc: u32) -> Self {
        Self {
            tmus: Self::TMUS_MCCMNC.contains(&mccmnc),
        }
    }

    pub fn tmus() -> Self {
        Self { tmus: true }
    }

    pub fn is_tmus(&self) -> bool {
        self.tmus
    }
}

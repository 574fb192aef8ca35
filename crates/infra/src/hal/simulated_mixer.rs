//! In-memory mixer card
//!
//! Controls are declared up front, either from TOML or with the built-in
//! MSM8974 set, and every accepted write is kept in a log so callers can
//! inspect exactly what the platform programmed.

use super::{HalError, Result};
use madrigal_core::domain::mixer::{
    EC_REF_RX, HDMI_EDID, HDMI_RX_CHANNELS, PLAYBACK_CHANNEL_MAP, SLIM_0_RX_FORMAT,
    SLIM_0_RX_SAMPLE_RATE, VOICE_RX_GAIN, VOICE_TX_MUTE,
};
use madrigal_core::domain::error::Result as PlatformResult;
use madrigal_core::domain::{ControlId, MixerControls, PlatformError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, trace};

/// Shape of a mixer control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlKind {
    /// Named enumerated values
    Enum,
    /// Fixed-width integer array
    IntArray,
    /// Read-only byte blob
    Bytes,
}

/// Declaration of one control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlDescriptor {
    pub name: String,
    pub kind: ControlKind,
    /// Accepted values of an enum control
    #[serde(default)]
    pub values: Vec<String>,
    /// Element count of an integer array control
    #[serde(default)]
    pub len: usize,
    /// Contents of a byte control
    #[serde(default)]
    pub data: Vec<u8>,
}

impl ControlDescriptor {
    pub fn enumerated(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: ControlKind::Enum,
            values: values.iter().map(|v| v.to_string()).collect(),
            len: 0,
            data: Vec::new(),
        }
    }

    pub fn int_array(name: &str, len: usize) -> Self {
        Self {
            name: name.to_string(),
            kind: ControlKind::IntArray,
            values: Vec::new(),
            len,
            data: Vec::new(),
        }
    }

    pub fn bytes(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            kind: ControlKind::Bytes,
            values: Vec::new(),
            len: 0,
            data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MixerDescription {
    #[serde(default, rename = "control")]
    controls: Vec<ControlDescriptor>,
}

/// A write the card accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MixerWrite {
    Enum { control: String, value: String },
    Array { control: String, values: Vec<i64> },
}

impl fmt::Display for MixerWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerWrite::Enum { control, value } => write!(f, "'{}' <- {}", control, value),
            MixerWrite::Array { control, values } => write!(f, "'{}' <- {:?}", control, values),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ControlValue {
    Enum(Option<String>),
    Ints(Vec<i64>),
    Bytes(Vec<u8>),
}

/// Mixer card held entirely in memory
#[derive(Debug)]
pub struct SimulatedMixer {
    descriptors: Vec<ControlDescriptor>,
    values: Mutex<Vec<ControlValue>>,
    writes: Mutex<Vec<MixerWrite>>,
}

impl SimulatedMixer {
    pub fn new(descriptors: Vec<ControlDescriptor>) -> Result<Self> {
        for (i, descriptor) in descriptors.iter().enumerate() {
            if descriptors[..i].iter().any(|d| d.name == descriptor.name) {
                return Err(HalError::InvalidMixer(format!(
                    "duplicate control '{}'",
                    descriptor.name
                )));
            }
            if descriptor.kind == ControlKind::Enum && descriptor.values.is_empty() {
                return Err(HalError::InvalidMixer(format!(
                    "enum control '{}' has no values",
                    descriptor.name
                )));
            }
        }

        Ok(Self::build(descriptors))
    }

    fn build(descriptors: Vec<ControlDescriptor>) -> Self {
        let values = descriptors
            .iter()
            .map(|d| match d.kind {
                ControlKind::Enum => ControlValue::Enum(None),
                ControlKind::IntArray => ControlValue::Ints(vec![0; d.len]),
                ControlKind::Bytes => ControlValue::Bytes(d.data.clone()),
            })
            .collect();

        debug!(controls = descriptors.len(), "Simulated mixer created");
        Self {
            descriptors,
            values: Mutex::new(values),
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Parses `[[control]]` tables
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let description: MixerDescription = toml::from_str(contents)?;
        Self::new(description.controls)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading mixer description");
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Every control the platform programs, with a stereo + 5.1 + 7.1 LPCM sink
    pub fn msm8974() -> Self {
        let descriptors = vec![
            ControlDescriptor::enumerated(EC_REF_RX, &["NONE", "SLIM_RX", "I2S_RX"]),
            ControlDescriptor::int_array(VOICE_RX_GAIN, 3),
            ControlDescriptor::int_array(VOICE_TX_MUTE, 3),
            ControlDescriptor::enumerated(
                HDMI_RX_CHANNELS,
                &["Two", "Three", "Four", "Five", "Six", "Seven", "Eight"],
            ),
            ControlDescriptor::bytes(
                HDMI_EDID,
                vec![0x09, 0x07, 0x07, 0x0d, 0x07, 0x07, 0x0f, 0x07, 0x07],
            ),
            ControlDescriptor::enumerated(SLIM_0_RX_FORMAT, &["S16_LE", "S24_LE"]),
            ControlDescriptor::enumerated(
                SLIM_0_RX_SAMPLE_RATE,
                &[
                    "KHZ_8", "KHZ_11_025", "KHZ_16", "KHZ_22_05", "KHZ_32", "KHZ_44_1", "KHZ_48",
                    "KHZ_64", "KHZ_88_2", "KHZ_96", "KHZ_176_4", "KHZ_192",
                ],
            ),
            ControlDescriptor::int_array(PLAYBACK_CHANNEL_MAP, 8),
        ];
        Self::build(descriptors)
    }

    /// Accepted writes, oldest first
    pub fn writes(&self) -> Vec<MixerWrite> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn clear_writes(&self) {
        if let Ok(mut writes) = self.writes.lock() {
            writes.clear();
        }
    }

    /// Current value of an enum control, `None` if unset or unknown
    pub fn enum_value(&self, name: &str) -> Option<String> {
        let index = self.index_of(name)?;
        match self.values.lock().ok()?.get(index)? {
            ControlValue::Enum(value) => value.clone(),
            _ => None,
        }
    }

    /// Current contents of an integer array control
    pub fn int_values(&self, name: &str) -> Option<Vec<i64>> {
        let index = self.index_of(name)?;
        match self.values.lock().ok()?.get(index)? {
            ControlValue::Ints(values) => Some(values.clone()),
            _ => None,
        }
    }

    pub fn control_names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.name.as_str())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    fn descriptor(&self, ctl: ControlId) -> PlatformResult<&ControlDescriptor> {
        self.descriptors
            .get(ctl.0 as usize)
            .ok_or_else(|| access_error(&format!("#{}", ctl.0), "no such control"))
    }

    fn store(
        &self,
        ctl: ControlId,
        value: ControlValue,
        write: MixerWrite,
    ) -> PlatformResult<()> {
        let name = &self.descriptor(ctl)?.name;
        let mut values = self
            .values
            .lock()
            .map_err(|_| access_error(name, "control state poisoned"))?;
        values[ctl.0 as usize] = value;
        drop(values);

        trace!(%write, "Mixer write");
        self.writes
            .lock()
            .map_err(|_| access_error(name, "write log poisoned"))?
            .push(write);
        Ok(())
    }
}

fn access_error(control: &str, reason: &str) -> PlatformError {
    PlatformError::MixerAccess {
        control: control.to_string(),
        reason: reason.to_string(),
    }
}

impl MixerControls for SimulatedMixer {
    fn control(&self, name: &str) -> Option<ControlId> {
        self.index_of(name).map(|i| ControlId(i as u32))
    }

    fn set_enum_by_name(&self, ctl: ControlId, value: &str) -> PlatformResult<()> {
        let descriptor = self.descriptor(ctl)?;
        if descriptor.kind != ControlKind::Enum {
            return Err(access_error(&descriptor.name, "not an enum control"));
        }
        if !descriptor.values.iter().any(|v| v == value) {
            return Err(access_error(
                &descriptor.name,
                &format!("unknown enum value '{}'", value),
            ));
        }
        self.store(
            ctl,
            ControlValue::Enum(Some(value.to_string())),
            MixerWrite::Enum {
                control: descriptor.name.clone(),
                value: value.to_string(),
            },
        )
    }

    fn set_array(&self, ctl: ControlId, values: &[i64]) -> PlatformResult<()> {
        let descriptor = self.descriptor(ctl)?;
        if descriptor.kind != ControlKind::IntArray {
            return Err(access_error(&descriptor.name, "not an integer array control"));
        }
        if values.len() > descriptor.len {
            return Err(access_error(
                &descriptor.name,
                &format!("{} values for {} elements", values.len(), descriptor.len),
            ));
        }
        let mut stored = vec![0; descriptor.len];
        stored[..values.len()].copy_from_slice(values);
        self.store(
            ctl,
            ControlValue::Ints(stored),
            MixerWrite::Array {
                control: descriptor.name.clone(),
                values: values.to_vec(),
            },
        )
    }

    fn get_array(&self, ctl: ControlId) -> PlatformResult<Vec<u8>> {
        let descriptor = self.descriptor(ctl)?;
        let values = self
            .values
            .lock()
            .map_err(|_| access_error(&descriptor.name, "control state poisoned"))?;
        match &values[ctl.0 as usize] {
            ControlValue::Bytes(data) => Ok(data.clone()),
            _ => Err(access_error(&descriptor.name, "not a byte control")),
        }
    }
}

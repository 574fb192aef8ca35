//! Host-side implementations of the platform's hardware interfaces
//!
//! - [`BuildPropStore`]: key=value property files
//! - [`SimulatedMixer`]: in-memory mixer controls
//! - [`RecordingAcdbLoader`]: calibration loader that records calls

pub mod acdb;
pub mod properties;
pub mod simulated_mixer;

pub use acdb::{AcdbCall, RecordingAcdbLoader};
pub use properties::BuildPropStore;
pub use simulated_mixer::{ControlDescriptor, ControlKind, MixerWrite, SimulatedMixer};

use thiserror::Error;

/// Errors raised while loading host-side descriptions
#[derive(Debug, Error)]
pub enum HalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed property on line {line}: {content}")]
    MalformedProperty { line: usize, content: String },

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid mixer description: {0}")]
    InvalidMixer(String),
}

pub type Result<T> = std::result::Result<T, HalError>;

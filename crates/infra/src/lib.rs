//! Concrete collaborators for the routing platform
//!
//! Stand-ins for what a device provides at runtime: a `build.prop` style
//! property store, a mixer card simulated from a TOML description, and a
//! calibration loader that records what it is asked to send.

pub mod hal;

pub use hal::{BuildPropStore, HalError, MixerWrite, RecordingAcdbLoader, SimulatedMixer};

//! Madrigal core: sound-device routing for the MSM8974 audio platform layer
//!
//! The crate turns abstract audio device bitmasks, telephony state and use
//! cases into concrete sound devices, calibration ids, PCM device indices and
//! codec backend settings. Hardware surfaces (the mixer control interface, the
//! vendor calibration library, the property store) are consumed through the
//! traits in [`domain::mixer`], [`domain::calibration`] and [`domain::config`].

pub mod domain;

pub use domain::platform::Platform;

//! Domain entities and routing rules

pub mod backend;
pub mod calibration;
pub mod config;
pub mod device;
pub mod error;
pub mod mixer;
pub mod offload;
pub mod platform;
pub mod routing;
pub mod snd_device;
pub mod usecase;

// Re-export specific items to avoid ambiguous glob imports
pub use backend::{BackendTarget, CodecBackendConfig};
pub use calibration::{AcdbDeviceType, AcdbLoader, NullAcdbLoader};
pub use config::{
    AncConfig, AncType, CarrierIdentity, ConfigError, PlatformConfig, PropertyStore,
};
pub use device::{
    AudioMode, AudioSource, ChannelMask, Direction, DualMicConfig, InputDevices, OutputDevices,
    TtyMode,
};
pub use error::PlatformError;
pub use mixer::{ControlId, EchoReference, MixerControls};
pub use offload::{OffloadFormat, OffloadInfo};
pub use routing::{ActiveInput, Resolution, RoutingEffect, RoutingResolver, RoutingState};
pub use snd_device::SoundDevice;
pub use usecase::{ActiveUseCase, PlaybackStream, UseCase};

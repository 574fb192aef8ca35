//! Platform facade
//!
//! [`Platform`] owns the external collaborators (mixer, calibration loader),
//! the immutable routing configuration and the mutable codec backend state.
//! It performs no locking: the surrounding HAL serializes access, which the
//! `&mut self` receivers make explicit.

use crate::domain::backend::{self, CodecBackendConfig};
use crate::domain::calibration::{self, AcdbLoader};
use crate::domain::config::{CarrierIdentity, PlatformConfig, PropertyStore};
use crate::domain::device::{AudioMode, Direction, OutputDevices};
use crate::domain::error::{PlatformError, Result};
use crate::domain::mixer::{self, MixerControls};
use crate::domain::offload::{self, OffloadInfo};
use crate::domain::routing::{Resolution, RoutingEffect, RoutingResolver, RoutingState};
use crate::domain::snd_device::{self, SoundDevice};
use crate::domain::usecase::{ActiveUseCase, UseCase};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Routing platform bound to one sound card
pub struct Platform {
    resolver: RoutingResolver,
    mixer: Box<dyn MixerControls>,
    acdb: Box<dyn AcdbLoader>,
    backend: CodecBackendConfig,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform")
            .field("resolver", &self.resolver)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Platform {
    /// Builds a platform around an already opened mixer
    pub fn new(
        config: PlatformConfig,
        carrier: CarrierIdentity,
        mixer: Box<dyn MixerControls>,
        acdb: Box<dyn AcdbLoader>,
    ) -> Self {
        info!(
            dual_mic = ?config.dual_mic,
            tmus = carrier.is_tmus(),
            "Initializing routing platform"
        );
        calibration::init(acdb.as_ref());
        Self {
            resolver: RoutingResolver::new(config, carrier),
            mixer,
            acdb,
            backend: CodecBackendConfig::default(),
        }
    }

    /// Opens the mixer with bounded retries, then builds the platform
    ///
    /// `open_mixer` is called with the configured card number and returns
    /// `None` while the card is not ready. Waits between attempts yield to
    /// the runtime.
    pub async fn init<F>(
        config: PlatformConfig,
        carrier: CarrierIdentity,
        mut open_mixer: F,
        acdb: Box<dyn AcdbLoader>,
    ) -> Result<Self>
    where
        F: FnMut(u32) -> Option<Box<dyn MixerControls>>,
    {
        let card = config.mixer.card;
        let attempts = config.mixer.open_retries.saturating_add(1);
        let interval = Duration::from_millis(config.mixer.retry_interval_ms);

        for attempt in 1..=attempts {
            if let Some(mixer) = open_mixer(card) {
                debug!(card, attempt, "Mixer opened");
                return Ok(Self::new(config, carrier, mixer, acdb));
            }
            error!(card, attempt, "Unable to open the mixer, retrying");
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        error!(card, attempts, "Unable to open the mixer, aborting");
        Err(PlatformError::MixerUnavailable { card, attempts })
    }

    /// Reads the configuration and carrier identity from system properties
    pub async fn from_properties<F>(
        props: &dyn PropertyStore,
        open_mixer: F,
        acdb: Box<dyn AcdbLoader>,
    ) -> Result<Self>
    where
        F: FnMut(u32) -> Option<Box<dyn MixerControls>>,
    {
        let config = PlatformConfig::from_properties(props);
        let carrier = config.carrier();
        Self::init(config, carrier, open_mixer, acdb).await
    }

    pub fn config(&self) -> &PlatformConfig {
        self.resolver.config()
    }

    pub fn carrier(&self) -> CarrierIdentity {
        self.resolver.carrier()
    }

    pub fn resolver(&self) -> &RoutingResolver {
        &self.resolver
    }

    /// Currently programmed codec backend format
    pub fn backend_config(&self) -> CodecBackendConfig {
        self.backend
    }

    /// Settings word passed to the calibration library at init
    pub fn acdb_settings(&self) -> u32 {
        self.config().acdb_settings()
    }

    /// Resolves the playback device and applies the mixer effect it implies
    pub fn output_sound_device(&self, devices: OutputDevices, state: &RoutingState) -> Resolution {
        let resolution = self.resolver.resolve_output(devices, state);
        self.apply(resolution)
    }

    /// Resolves the capture device and applies the mixer effect it implies
    pub fn input_sound_device(&self, out_devices: OutputDevices, state: &RoutingState) -> Resolution {
        let resolution = self.resolver.resolve_input(out_devices, state);
        self.apply(resolution)
    }

    fn apply(&self, mut resolution: Resolution) -> Resolution {
        let Some(effect) = resolution.effect else {
            return resolution;
        };
        if let Err(e) = self.apply_effect(effect) {
            warn!(error = %e, ?effect, "Routing side effect failed");
            if resolution.condition.is_none() {
                resolution.condition = Some(e);
            }
        }
        resolution
    }

    pub fn apply_effect(&self, effect: RoutingEffect) -> Result<()> {
        match effect {
            RoutingEffect::AfeProxyChannelMap { channels } => {
                mixer::set_afe_proxy_channel_map(self.mixer.as_ref(), channels)
            }
            RoutingEffect::EchoReference(reference) => {
                mixer::set_echo_reference(self.mixer.as_ref(), reference)
            }
        }
    }

    pub fn send_audio_calibration(&self, device: SoundDevice) -> Result<()> {
        calibration::send_audio_calibration(self.acdb.as_ref(), device)
    }

    /// Sends voice calibration once the call devices have been switched
    pub fn switch_voice_call_device_post(&self, rx: SoundDevice, tx: SoundDevice) -> Result<()> {
        calibration::send_voice_calibration(self.acdb.as_ref(), rx, tx)
    }

    pub fn set_voice_volume(&self, percent: u32) -> Result<()> {
        mixer::set_voice_volume(self.mixer.as_ref(), percent)
    }

    pub fn set_mic_mute(&self, mode: AudioMode, muted: bool) -> Result<()> {
        mixer::set_mic_mute(self.mixer.as_ref(), mode, muted)
    }

    pub fn set_hdmi_channels(&self, channel_count: u32) -> Result<()> {
        mixer::set_hdmi_channels(self.mixer.as_ref(), channel_count)
    }

    pub fn edid_max_channels(&self) -> u32 {
        mixer::edid_max_channels(self.mixer.as_ref())
    }

    /// Re-arbitrates the codec backend after a use case starts or stops
    pub fn check_and_set_codec_backend(
        &mut self,
        mode: AudioMode,
        active: &[ActiveUseCase],
    ) -> Result<bool> {
        let twenty_four_bit = self.resolver.config().offload.twenty_four_bit;
        backend::check_and_set_codec_backend(
            self.mixer.as_ref(),
            &mut self.backend,
            mode,
            active,
            twenty_four_bit,
        )
    }

    pub fn compress_offload_buffer_size(&self, info: Option<&OffloadInfo>) -> u32 {
        let offload = self.config().offload;
        offload::compress_offload_buffer_size(info, offload.buffer_size_kb, offload.flac)
    }

    pub fn pcm_offload_buffer_size(&self, info: &OffloadInfo) -> u32 {
        offload::pcm_offload_buffer_size(info, self.config().offload.pcm_buffer_size_kb)
    }

    /// Mixer path enabling `usecase` on `device`
    pub fn mixer_path(&self, usecase: UseCase, device: SoundDevice) -> String {
        snd_device::mixer_path(usecase.mixer_path_name(), device, self.config().usb_headset)
    }

    pub fn render_latency_us(&self, usecase: UseCase) -> u64 {
        usecase.render_latency_us()
    }

    pub fn pcm_device_index(&self, usecase: UseCase, direction: Direction) -> u32 {
        usecase.pcm_device_index(direction)
    }

    pub fn device_name(&self, device: SoundDevice) -> &'static str {
        device.name()
    }
}

impl Drop for Platform {
    fn drop(&mut self) {
        debug!("Releasing calibration data");
        calibration::deallocate(self.acdb.as_ref());
    }
}

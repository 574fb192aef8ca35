//! Use cases and their fixed PCM device bindings

use crate::domain::device::Direction;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named playback, record or voice scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UseCase {
    PlaybackDeepBuffer,
    PlaybackLowLatency,
    PlaybackMultiCh,
    PlaybackOffload,
    Record,
    RecordLowLatency,
    VoiceCall,
}

/// Deep buffer render latency in microseconds
pub const DEEP_BUFFER_PLATFORM_DELAY_US: u64 = 29_000;
/// Low latency render latency in microseconds
pub const LOW_LATENCY_PLATFORM_DELAY_US: u64 = 13_000;

impl UseCase {
    pub const ALL: [UseCase; 7] = [
        UseCase::PlaybackDeepBuffer,
        UseCase::PlaybackLowLatency,
        UseCase::PlaybackMultiCh,
        UseCase::PlaybackOffload,
        UseCase::Record,
        UseCase::RecordLowLatency,
        UseCase::VoiceCall,
    ];

    /// (playback, capture) PCM device indices
    const fn pcm_devices(self) -> (u32, u32) {
        match self {
            UseCase::PlaybackDeepBuffer => (0, 0),
            UseCase::PlaybackLowLatency => (15, 15),
            UseCase::PlaybackMultiCh => (1, 1),
            UseCase::PlaybackOffload => (9, 9),
            UseCase::Record => (0, 0),
            UseCase::RecordLowLatency => (15, 15),
            UseCase::VoiceCall => (2, 2),
        }
    }

    pub fn pcm_device_index(self, direction: Direction) -> u32 {
        let (playback, capture) = self.pcm_devices();
        match direction {
            Direction::Playback => playback,
            Direction::Capture => capture,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Platform render latency added on top of the stream latency, in µs
    pub fn render_latency_us(self) -> u64 {
        match self {
            UseCase::PlaybackDeepBuffer => DEEP_BUFFER_PLATFORM_DELAY_US,
            UseCase::PlaybackLowLatency => LOW_LATENCY_PLATFORM_DELAY_US,
            _ => 0,
        }
    }

    /// Mixer path name of the use case
    pub fn mixer_path_name(self) -> &'static str {
        match self {
            UseCase::PlaybackDeepBuffer => "deep-buffer-playback",
            UseCase::PlaybackLowLatency => "low-latency-playback",
            UseCase::PlaybackMultiCh => "multi-channel-playback",
            UseCase::PlaybackOffload => "compress-offload-playback",
            UseCase::Record => "audio-record",
            UseCase::RecordLowLatency => "low-latency-record",
            UseCase::VoiceCall => "voice-call",
        }
    }
}

impl FromStr for UseCase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|u| u.mixer_path_name() == s)
            .copied()
            .ok_or_else(|| format!("unknown use case: {s}"))
    }
}

/// PCM device index for a raw use-case index, `None` when out of range
pub fn pcm_device_index(usecase: usize, direction: Direction) -> Option<u32> {
    UseCase::from_index(usecase).map(|u| u.pcm_device_index(direction))
}

/// Format requested by an active playback stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackStream {
    pub sample_rate: u32,
    pub bit_width: u32,
}

impl PlaybackStream {
    pub fn new(bit_width: u32, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            bit_width,
        }
    }
}

/// A use case currently running on the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveUseCase {
    pub id: UseCase,
    /// Present for use cases that drive the shared playback backend
    pub stream: Option<PlaybackStream>,
}

impl ActiveUseCase {
    pub fn playback(id: UseCase, stream: PlaybackStream) -> Self {
        Self {
            id,
            stream: Some(stream),
        }
    }

    pub fn without_stream(id: UseCase) -> Self {
        Self { id, stream: None }
    }
}

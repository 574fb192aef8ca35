//! Integration tests for the routing platform
//!
//! These tests drive a complete platform built from a property file, the
//! simulated MSM8974 card and a recording calibration loader.

use madrigal_core::domain::config::keys;
use madrigal_core::domain::mixer::{
    EC_REF_RX, PLAYBACK_CHANNEL_MAP, SLIM_0_RX_FORMAT, SLIM_0_RX_SAMPLE_RATE, VOICE_RX_GAIN,
};
use madrigal_core::domain::*;
use madrigal_core::Platform;
use madrigal_infra::hal::AcdbCall;
use madrigal_infra::{BuildPropStore, MixerWrite, RecordingAcdbLoader, SimulatedMixer};
use std::sync::Arc;
use tempfile::TempDir;

const TMUS_ENDFIRE_PROPS: &str = "\
# T-Mobile handset with an endfire pair
persist.audio.dualmic.config=endfire
persist.audio.fluence.voicecall=true
persist.audio.fluence.voicerec=false
persist.audio.fluence.speaker=true
gsm.sim.operator.numeric=310260
audio.offload.24bit.enable=1
";

struct Rig {
    platform: Platform,
    mixer: Arc<SimulatedMixer>,
    acdb: Arc<RecordingAcdbLoader>,
}

async fn rig_with_config(mut config: PlatformConfig) -> Rig {
    config.mixer.retry_interval_ms = 0;
    let mixer = Arc::new(SimulatedMixer::msm8974());
    let acdb = Arc::new(RecordingAcdbLoader::new());
    let carrier = config.carrier();
    let card = Arc::clone(&mixer);
    let platform = Platform::init(
        config,
        carrier,
        move |_| Some(Box::new(Arc::clone(&card)) as Box<dyn MixerControls>),
        Box::new(Arc::clone(&acdb)),
    )
    .await
    .unwrap();
    Rig {
        platform,
        mixer,
        acdb,
    }
}

async fn rig_from_props(contents: &str) -> Rig {
    let props = BuildPropStore::parse(contents).unwrap();
    rig_with_config(PlatformConfig::from_properties(&props)).await
}

fn in_call() -> RoutingState {
    RoutingState {
        mode: AudioMode::InCall,
        ..RoutingState::default()
    }
}

fn enum_write(control: &str, value: &str) -> MixerWrite {
    MixerWrite::Enum {
        control: control.to_string(),
        value: value.to_string(),
    }
}

// ============================================================================
// VOICE CALL
// ============================================================================

#[tokio::test]
async fn test_tmus_handset_call() {
    let rig = rig_from_props(TMUS_ENDFIRE_PROPS).await;
    assert!(rig.platform.carrier().is_tmus());

    let state = in_call();
    let rx = rig.platform.output_sound_device(OutputDevices::EARPIECE, &state);
    let tx = rig.platform.input_sound_device(OutputDevices::EARPIECE, &state);
    assert_eq!(rx.device, SoundDevice::OutVoiceHandsetTmus);
    assert_eq!(tx.device, SoundDevice::InVoiceDmicEfTmus);
    assert!(rx.condition.is_none() && tx.condition.is_none());

    rig.platform
        .switch_voice_call_device_post(rx.device, tx.device)
        .unwrap();
    assert_eq!(
        rig.acdb.calls(),
        vec![AcdbCall::Init, AcdbCall::VoiceCal { rx_id: 88, tx_id: 89 }]
    );
}

#[tokio::test]
async fn test_call_moves_to_speaker_with_fluence() {
    let rig = rig_from_props(TMUS_ENDFIRE_PROPS).await;
    let state = in_call();

    assert_eq!(
        rig.platform.output_sound_device(OutputDevices::SPEAKER, &state).device,
        SoundDevice::OutVoiceSpeaker
    );
    assert_eq!(
        rig.platform.input_sound_device(OutputDevices::SPEAKER, &state).device,
        SoundDevice::InVoiceSpeakerDmicEf
    );
}

#[tokio::test]
async fn test_tty_headset_call() {
    let rig = rig_from_props(TMUS_ENDFIRE_PROPS).await;
    let state = RoutingState {
        tty_mode: TtyMode::Vco,
        ..in_call()
    };

    assert_eq!(
        rig.platform
            .output_sound_device(OutputDevices::WIRED_HEADSET, &state)
            .device,
        SoundDevice::OutVoiceTtyVcoHeadphones
    );
    assert_eq!(
        rig.platform
            .input_sound_device(OutputDevices::WIRED_HEADSET, &state)
            .device,
        SoundDevice::InVoiceTtyVcoHandsetMic
    );
}

#[tokio::test]
async fn test_voice_volume_and_mute() {
    let rig = rig_from_props(TMUS_ENDFIRE_PROPS).await;

    rig.platform.set_voice_volume(60).unwrap();
    rig.platform.set_mic_mute(AudioMode::Normal, true).unwrap();
    assert_eq!(rig.mixer.writes().len(), 1);
    assert_eq!(
        rig.mixer.int_values(VOICE_RX_GAIN).unwrap(),
        vec![3, 0xFFFF_FFFF, 20]
    );

    rig.platform.set_mic_mute(AudioMode::InCall, true).unwrap();
    assert_eq!(rig.mixer.writes().len(), 2);
}

// ============================================================================
// MEDIA PLAYBACK AND CAPTURE
// ============================================================================

#[tokio::test]
async fn test_speaker_and_headphones_combo() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let devices: OutputDevices = "speaker,wired-headphone".parse().unwrap();

    let resolution = rig
        .platform
        .output_sound_device(devices, &RoutingState::default());
    assert_eq!(resolution.device, SoundDevice::OutSpeakerAndHeadphones);

    rig.platform.send_audio_calibration(resolution.device).unwrap();
    assert_eq!(
        rig.acdb.calls().last(),
        Some(&AcdbCall::AudioCal {
            acdb_id: 10,
            device_type: 1
        })
    );
}

#[tokio::test]
async fn test_invalid_combo_is_reported() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let devices = OutputDevices::EARPIECE | OutputDevices::AUX_DIGITAL;

    let resolution = rig
        .platform
        .output_sound_device(devices, &RoutingState::default());
    assert_eq!(resolution.device, SoundDevice::None);
    assert_eq!(
        resolution.condition,
        Some(PlatformError::InvalidDeviceCombination(0x401))
    );
    assert_eq!(
        rig.platform.send_audio_calibration(resolution.device),
        Err(PlatformError::MissingCalibrationEntry {
            device: SoundDevice::None,
            acdb_id: -1
        })
    );
}

#[tokio::test]
async fn test_voip_with_aec_programs_echo_reference() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let state = RoutingState {
        mode: AudioMode::InCommunication,
        active_input: Some(ActiveInput {
            source: AudioSource::VoiceCommunication,
            device: InputDevices::BUILTIN_MIC,
            channel_mask: ChannelMask::IN_MONO,
            enable_aec: true,
        }),
        ..RoutingState::default()
    };

    let resolution = rig.platform.input_sound_device(OutputDevices::SPEAKER, &state);
    assert_eq!(resolution.device, SoundDevice::InSpeakerMicAec);
    assert_eq!(rig.mixer.enum_value(EC_REF_RX).as_deref(), Some("SLIM_RX"));

    let state = RoutingState {
        active_input: state.active_input.map(|input| ActiveInput {
            enable_aec: false,
            ..input
        }),
        ..state
    };
    let resolution = rig.platform.input_sound_device(OutputDevices::EARPIECE, &state);
    assert_eq!(resolution.device, SoundDevice::InHandsetMic);
    assert_eq!(rig.mixer.enum_value(EC_REF_RX).as_deref(), Some("NONE"));
}

#[tokio::test]
async fn test_proxy_sink_channel_map() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let state = RoutingState {
        afe_proxy_channels: 6,
        ..RoutingState::default()
    };

    let resolution = rig.platform.output_sound_device(OutputDevices::PROXY, &state);
    assert_eq!(resolution.device, SoundDevice::OutAfeProxy);
    assert!(resolution.condition.is_none());
    assert_eq!(
        rig.mixer.int_values(PLAYBACK_CHANNEL_MAP).unwrap(),
        vec![1, 2, 3, 6, 4, 5, 0, 0]
    );
}

#[tokio::test]
async fn test_hdmi_sink_capabilities() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let channels = rig.platform.edid_max_channels();
    assert_eq!(channels, 8);

    rig.platform.set_hdmi_channels(channels).unwrap();
    assert_eq!(
        rig.mixer.writes(),
        vec![enum_write("HDMI_RX Channels", "Eight")]
    );
}

// ============================================================================
// CODEC BACKEND AND OFFLOAD
// ============================================================================

#[tokio::test]
async fn test_backend_follows_high_resolution_stream() {
    let mut rig = rig_from_props(TMUS_ENDFIRE_PROPS).await;
    let hi_res = [
        ActiveUseCase::playback(UseCase::PlaybackDeepBuffer, PlaybackStream::new(16, 44_100)),
        ActiveUseCase::playback(UseCase::PlaybackOffload, PlaybackStream::new(24, 96_000)),
    ];

    assert!(rig
        .platform
        .check_and_set_codec_backend(AudioMode::Normal, &hi_res)
        .unwrap());
    assert_eq!(rig.platform.backend_config(), CodecBackendConfig::new(24, 96_000));
    assert_eq!(
        rig.mixer.writes(),
        vec![
            enum_write(SLIM_0_RX_FORMAT, "S24_LE"),
            enum_write(SLIM_0_RX_SAMPLE_RATE, "KHZ_96"),
        ]
    );

    // A call forces the defaults back
    assert!(rig
        .platform
        .check_and_set_codec_backend(AudioMode::InCall, &hi_res)
        .unwrap());
    assert_eq!(rig.platform.backend_config(), CodecBackendConfig::default());
    assert_eq!(
        rig.mixer.enum_value(SLIM_0_RX_SAMPLE_RATE).as_deref(),
        Some("KHZ_48")
    );

    // Nothing left to do
    assert!(!rig
        .platform
        .check_and_set_codec_backend(AudioMode::InCall, &hi_res)
        .unwrap());
}

#[tokio::test]
async fn test_offload_sizes_from_properties() {
    let props = format!(
        "{}={}\n{}={}\n",
        keys::OFFLOAD_BUFFER_SIZE_KB,
        64,
        keys::OFFLOAD_PCM_BUFFER_SIZE,
        0
    );
    let rig = rig_from_props(&props).await;

    let info = OffloadInfo::default();
    assert_eq!(
        rig.platform.compress_offload_buffer_size(Some(&info)),
        64 * 1024
    );
    let streaming = OffloadInfo {
        has_video: true,
        is_streaming: true,
        ..info
    };
    assert_eq!(
        rig.platform.compress_offload_buffer_size(Some(&streaming)),
        2 * 1024
    );
}

// ============================================================================
// LIFECYCLE AND CONFIGURATION
// ============================================================================

#[tokio::test]
async fn test_missing_mixer_card_fails_init() {
    let mut config = PlatformConfig::default();
    config.mixer.open_retries = 2;
    config.mixer.retry_interval_ms = 0;

    let err = Platform::init(
        config,
        CarrierIdentity::default(),
        |_| None,
        Box::new(RecordingAcdbLoader::new()),
    )
    .await
    .unwrap_err();
    assert_eq!(err, PlatformError::MixerUnavailable { card: 0, attempts: 3 });
}

#[tokio::test]
async fn test_calibration_released_on_drop() {
    let rig = rig_with_config(PlatformConfig::default()).await;
    let acdb = Arc::clone(&rig.acdb);
    drop(rig);

    assert_eq!(acdb.calls(), vec![AcdbCall::Init, AcdbCall::Deallocate]);
}

#[tokio::test]
async fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("platform").join("madrigal.toml");

    let props = BuildPropStore::parse(TMUS_ENDFIRE_PROPS).unwrap();
    let config = PlatformConfig::from_properties(&props);
    config.save_to_file(&path).await.unwrap();

    let loaded = PlatformConfig::load_from_file(&path).await.unwrap();
    assert_eq!(loaded, config);

    let rig = rig_with_config(loaded).await;
    assert_eq!(
        rig.platform
            .input_sound_device(OutputDevices::EARPIECE, &in_call())
            .device,
        SoundDevice::InVoiceDmicEfTmus
    );
}

#[tokio::test]
async fn test_mixer_description_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("card.toml");
    std::fs::write(
        &path,
        r#"
[[control]]
name = "EC_REF_RX"
kind = "enum"
values = ["NONE", "SLIM_RX", "I2S_RX"]
"#,
    )
    .unwrap();

    let mixer = Arc::new(SimulatedMixer::load(&path).unwrap());
    let card = Arc::clone(&mixer);
    let mut config = PlatformConfig::default();
    config.mixer.retry_interval_ms = 0;
    let platform = Platform::init(
        config,
        CarrierIdentity::default(),
        move |_| Some(Box::new(Arc::clone(&card)) as Box<dyn MixerControls>),
        Box::new(NullAcdbLoader),
    )
    .await
    .unwrap();

    // The card has no channel map control
    let state = RoutingState::default();
    let resolution = platform.output_sound_device(OutputDevices::PROXY, &state);
    assert_eq!(resolution.device, SoundDevice::OutAfeProxy);
    assert_eq!(
        resolution.condition,
        Some(PlatformError::MissingControlSurface(PLAYBACK_CHANNEL_MAP.to_string()))
    );
    assert_eq!(platform.edid_max_channels(), 0);
}

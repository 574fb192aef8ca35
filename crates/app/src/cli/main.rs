//! Madrigal CLI: exercise the routing platform from the command line

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use madrigal_core::domain::backend::compute_backend_target;
use madrigal_core::domain::*;
use madrigal_core::Platform;
use madrigal_infra::hal::AcdbCall;
use madrigal_infra::{BuildPropStore, MixerWrite, RecordingAcdbLoader, SimulatedMixer};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "madrigal")]
#[command(about = "Sound-device routing for the MSM8974 audio platform", long_about = None)]
struct Cli {
    /// Platform configuration (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// build.prop style property file, used when no --config is given
    #[arg(long, global = true)]
    props: Option<PathBuf>,

    /// Mixer card description (TOML), defaults to the built-in MSM8974 card
    #[arg(long, global = true)]
    mixer: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve the playback sound device for a device mask
    Output {
        /// Devices, e.g. `speaker,wired-headset` or `0x6`
        devices: OutputDevices,
        #[command(flatten)]
        session: SessionArgs,
        /// Speaker channels swapped
        #[arg(long)]
        lr_swap: bool,
        /// Channel count of the AFE proxy sink
        #[arg(long, default_value_t = 2)]
        proxy_channels: u32,
    },
    /// Resolve the capture sound device
    Input {
        /// Playback devices currently routed
        out_devices: OutputDevices,
        #[command(flatten)]
        session: SessionArgs,
        /// Capture source of the active input
        #[arg(long)]
        source: Option<AudioSource>,
        /// Capture devices of the active input, e.g. `builtin-mic`
        #[arg(long, default_value = "none")]
        in_devices: InputDevices,
        /// mono, stereo, front-back or a hex mask
        #[arg(long, default_value = "mono", value_parser = parse_channel_mask)]
        channels: ChannelMask,
        /// Echo cancellation requested by the input
        #[arg(long)]
        aec: bool,
    },
    /// Arbitrate the codec backend for a set of playback streams
    Backend {
        /// Active stream as `bits:rate`, e.g. `24:96000` (repeatable)
        #[arg(long = "stream", value_parser = parse_stream)]
        streams: Vec<PlaybackStream>,
        #[arg(long, default_value = "normal")]
        mode: AudioMode,
    },
    /// Compute offload fragment sizes
    Offload {
        #[arg(long, default_value = "compressed")]
        format: OffloadFormat,
        #[arg(long, default_value_t = 48_000)]
        rate: u32,
        /// Output channel count
        #[arg(long, default_value_t = 2)]
        channels: u32,
        #[arg(long)]
        video: bool,
        #[arg(long)]
        streaming: bool,
    },
    /// List every sound device
    Devices,
}

#[derive(Args)]
struct SessionArgs {
    #[arg(long, default_value = "normal")]
    mode: AudioMode,
    #[arg(long, default_value = "off")]
    tty: TtyMode,
    /// ANC switched on for the accessory
    #[arg(long)]
    anc: bool,
}

fn parse_stream(s: &str) -> Result<PlaybackStream, String> {
    let (bits, rate) = s
        .split_once(':')
        .ok_or_else(|| format!("expected bits:rate, got {s}"))?;
    let bits = bits.parse().map_err(|e| format!("bad bit width {bits}: {e}"))?;
    let rate = rate.parse().map_err(|e| format!("bad sample rate {rate}: {e}"))?;
    Ok(PlaybackStream::new(bits, rate))
}

fn parse_channel_mask(s: &str) -> Result<ChannelMask, String> {
    match s {
        "mono" => Ok(ChannelMask::IN_MONO),
        "stereo" => Ok(ChannelMask::IN_STEREO),
        "front-back" => Ok(ChannelMask::IN_FRONT_BACK),
        other => other
            .strip_prefix("0x")
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .map(ChannelMask::from_bits)
            .ok_or_else(|| format!("unknown channel mask {other}")),
    }
}

fn output_channel_mask(channels: u32) -> ChannelMask {
    match channels {
        1 => ChannelMask::OUT_MONO,
        6 => ChannelMask::OUT_5POINT1,
        8 => ChannelMask::OUT_7POINT1,
        _ => ChannelMask::OUT_STEREO,
    }
}

#[derive(Serialize)]
struct DeviceReport {
    device: SoundDevice,
    name: &'static str,
    acdb_id: i32,
    provisional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    mixer_writes: Vec<MixerWrite>,
    calibration: Vec<AcdbCall>,
}

#[derive(Serialize)]
struct BackendReport {
    target: CodecBackendConfig,
    change: bool,
    twenty_four_bit: bool,
    applied: bool,
    programmed: CodecBackendConfig,
    mixer_writes: Vec<MixerWrite>,
}

#[derive(Serialize)]
struct OffloadReport {
    compress_fragment_size: u32,
    pcm_fragment_size: u32,
}

#[derive(Serialize)]
struct DeviceListing {
    index: usize,
    device: SoundDevice,
    name: &'static str,
    acdb_id: i32,
    direction: Option<Direction>,
    provisional: bool,
}

/// Platform plus handles on its simulated collaborators
struct Session {
    platform: Platform,
    mixer: Arc<SimulatedMixer>,
    acdb: Arc<RecordingAcdbLoader>,
}

impl Session {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        let config = match (&cli.config, &cli.props) {
            (Some(path), _) => PlatformConfig::load_from_file(path)
                .await
                .with_context(|| format!("loading {}", path.display()))?,
            (None, Some(path)) => {
                let props = BuildPropStore::load(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                PlatformConfig::from_properties(&props)
            }
            (None, None) => PlatformConfig::default(),
        };

        let mixer = Arc::new(match &cli.mixer {
            Some(path) => SimulatedMixer::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SimulatedMixer::msm8974(),
        });
        let acdb = Arc::new(RecordingAcdbLoader::new());

        let carrier = config.carrier();
        let card = Arc::clone(&mixer);
        let platform = Platform::init(
            config,
            carrier,
            move |_| Some(Box::new(Arc::clone(&card)) as Box<dyn MixerControls>),
            Box::new(Arc::clone(&acdb)),
        )
        .await?;
        mixer.clear_writes();

        Ok(Self {
            platform,
            mixer,
            acdb,
        })
    }

    fn report(&self, resolution: Resolution) -> anyhow::Result<DeviceReport> {
        let device = resolution.device;
        if !device.is_none() {
            if let Err(e) = self.platform.send_audio_calibration(device) {
                tracing::warn!(error = %e, "Calibration not sent");
            }
        }
        Ok(DeviceReport {
            device,
            name: device.name(),
            acdb_id: device.acdb_id(),
            provisional: device.is_provisional(),
            condition: resolution.condition.map(|c| c.to_string()),
            mixer_writes: self.mixer.writes(),
            calibration: self
                .acdb
                .calls()
                .into_iter()
                .filter(|c| !matches!(c, AcdbCall::Init))
                .collect(),
        })
    }
}

fn print_device(report: &DeviceReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    print!("{} (acdb {})", report.name, report.acdb_id);
    if report.provisional {
        print!(" [provisional calibration]");
    }
    println!();
    if let Some(condition) = &report.condition {
        println!("  condition: {}", condition);
    }
    for write in &report.mixer_writes {
        println!("  mixer: {}", write);
    }
    Ok(())
}

fn session_state(session: &SessionArgs) -> RoutingState {
    RoutingState {
        mode: session.mode,
        tty_mode: session.tty,
        anc_enabled: session.anc,
        ..RoutingState::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Madrigal starting");

    match &cli.command {
        Command::Devices => {
            let listing: Vec<DeviceListing> = SoundDevice::ALL
                .iter()
                .map(|&device| DeviceListing {
                    index: device.index(),
                    device,
                    name: device.name(),
                    acdb_id: device.acdb_id(),
                    direction: device.direction(),
                    provisional: device.is_provisional(),
                })
                .collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for entry in listing {
                    println!(
                        "{:>3}  {:<30} acdb {:>4}{}",
                        entry.index,
                        entry.name,
                        entry.acdb_id,
                        if entry.provisional { "  (provisional)" } else { "" }
                    );
                }
            }
        }
        Command::Output {
            devices,
            session,
            lr_swap,
            proxy_channels,
        } => {
            let s = Session::open(&cli).await?;
            let state = RoutingState {
                speaker_lr_swap: *lr_swap,
                afe_proxy_channels: *proxy_channels,
                ..session_state(session)
            };
            let resolution = s.platform.output_sound_device(*devices, &state);
            print_device(&s.report(resolution)?, cli.json)?;
        }
        Command::Input {
            out_devices,
            session,
            source,
            in_devices,
            channels,
            aec,
        } => {
            let s = Session::open(&cli).await?;
            let state = RoutingState {
                active_input: source.map(|source| ActiveInput {
                    source,
                    device: *in_devices,
                    channel_mask: *channels,
                    enable_aec: *aec,
                }),
                ..session_state(session)
            };
            let resolution = s.platform.input_sound_device(*out_devices, &state);
            print_device(&s.report(resolution)?, cli.json)?;
        }
        Command::Backend { streams, mode } => {
            let mut s = Session::open(&cli).await?;
            let active: Vec<ActiveUseCase> = streams
                .iter()
                .map(|&stream| ActiveUseCase::playback(UseCase::PlaybackOffload, stream))
                .collect();
            let target = compute_backend_target(*mode, &active, s.platform.backend_config());
            let applied = s.platform.check_and_set_codec_backend(*mode, &active)?;
            let report = BackendReport {
                target: target.config,
                change: target.change,
                twenty_four_bit: s.platform.config().offload.twenty_four_bit,
                applied,
                programmed: s.platform.backend_config(),
                mixer_writes: s.mixer.writes(),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "target: {} bit / {} Hz (change: {})",
                    report.target.bit_width, report.target.sample_rate, report.change
                );
                println!(
                    "programmed: {} bit / {} Hz{}",
                    report.programmed.bit_width,
                    report.programmed.sample_rate,
                    if report.twenty_four_bit {
                        ""
                    } else {
                        " (24-bit support disabled)"
                    }
                );
                for write in &report.mixer_writes {
                    println!("  mixer: {}", write);
                }
            }
        }
        Command::Offload {
            format,
            rate,
            channels,
            video,
            streaming,
        } => {
            let s = Session::open(&cli).await?;
            let info = OffloadInfo {
                format: *format,
                sample_rate: *rate,
                channel_mask: output_channel_mask(*channels),
                has_video: *video,
                is_streaming: *streaming,
            };
            let report = OffloadReport {
                compress_fragment_size: s.platform.compress_offload_buffer_size(Some(&info)),
                pcm_fragment_size: s.platform.pcm_offload_buffer_size(&info),
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("compress fragment: {} bytes", report.compress_fragment_size);
                println!("pcm fragment:      {} bytes", report.pcm_fragment_size);
            }
        }
    }

    Ok(())
}

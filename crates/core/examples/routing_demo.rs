//! Walks through a few routing decisions with a default configuration
//!
//! Run with: cargo run --package madrigal-core --example routing_demo

use madrigal_core::domain::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("madrigal_core=debug,info")
        .init();

    println!("=== Madrigal Routing Demo ===\n");

    // 1. Configuration, saved and loaded back
    let config = PlatformConfig {
        dual_mic: DualMicConfig::Endfire,
        operator_numeric: Some(310_260),
        ..PlatformConfig::default()
    };
    let config_path = std::env::temp_dir().join("madrigal_demo.toml");
    config.save_to_file(&config_path).await?;
    let config = PlatformConfig::load_from_file(&config_path).await?;
    println!("1. Loaded configuration from {}", config_path.display());

    let resolver = RoutingResolver::new(config.clone(), config.carrier());
    println!("   T-Mobile tuning: {}", resolver.carrier().is_tmus());

    // 2. Playback routing
    println!("\n2. Output devices:");
    let normal = RoutingState::default();
    let in_call = RoutingState {
        mode: AudioMode::InCall,
        ..RoutingState::default()
    };
    for (label, mask, state) in [
        ("speaker", OutputDevices::SPEAKER, &normal),
        (
            "speaker + headphones",
            OutputDevices::SPEAKER | OutputDevices::WIRED_HEADPHONE,
            &normal,
        ),
        ("earpiece in call", OutputDevices::EARPIECE, &in_call),
        (
            "earpiece + speaker",
            OutputDevices::EARPIECE | OutputDevices::SPEAKER,
            &normal,
        ),
    ] {
        let res = resolver.resolve_output(mask, state);
        println!(
            "   {:<22} -> {} (acdb {}){}",
            label,
            res.device,
            res.device.acdb_id(),
            res.condition
                .map(|c| format!(" [{}]", c))
                .unwrap_or_default()
        );
    }

    // 3. Capture routing
    println!("\n3. Input devices:");
    let recording = RoutingState {
        active_input: Some(ActiveInput {
            source: AudioSource::Camcorder,
            device: InputDevices::BACK_MIC,
            ..ActiveInput::default()
        }),
        ..RoutingState::default()
    };
    let res = resolver.resolve_input(OutputDevices::SPEAKER, &recording);
    println!("   camcorder on speaker   -> {}", res.device);
    let res = resolver.resolve_input(OutputDevices::EARPIECE, &in_call);
    println!("   voice call on earpiece -> {}", res.device);

    // 4. Offload fragment sizes
    println!("\n4. Offload fragment sizes:");
    let info = OffloadInfo::default();
    println!(
        "   compress: {} bytes, pcm: {} bytes",
        offload::compress_offload_buffer_size(Some(&info), None, false),
        offload::pcm_offload_buffer_size(&info, None)
    );

    tokio::fs::remove_file(&config_path).await?;
    println!("\n=== Demo Complete ===");
    Ok(())
}

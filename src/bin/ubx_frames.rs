use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use payload_daq::{
    config::{self, GpsConfig},
    gps::GpsConfigurator,
    ubx::UbxFrame,
};

/// Prints the UBX commands the GPS would receive at start-up, without
/// opening the serial port.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/daq.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    // Default log level to "info"
    if env::var("RUST_LOG").is_err() {
        unsafe { env::set_var("RUST_LOG", "info") }
    }

    pretty_env_logger::init();

    let args = Args::parse();

    let toml = fs::read_to_string(&args.config)
        .with_context(|| format!("Could not read {}", args.config.display()))?;
    let cfg = config::parse_str(&toml)?;

    let Some(gps_config) = GpsConfig::from_configuration(&cfg)? else {
        info!("GPS is disabled in {}", args.config.display());
        return Ok(());
    };

    let configurator = GpsConfigurator::new(&gps_config);

    let names = configurator
        .mask()
        .iter()
        .map(|s| format!("disable {s}"))
        .chain(std::iter::once(format!("rate {}", configurator.rate())));

    for (name, frame) in names.zip(configurator.commands()) {
        let decoded = UbxFrame::parse(frame.as_bytes())
            .with_context(|| format!("Encoded frame for '{name}' does not decode"))?;
        println!(
            "{name:<12} class 0x{:02X} id 0x{:02X} len {:>2}: {frame}",
            decoded.class(),
            decoded.id(),
            decoded.payload_len()
        );
    }

    println!("burst: {} bytes", configurator.burst().len());

    Ok(())
}

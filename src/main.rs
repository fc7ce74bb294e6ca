use std::{env, fs, path::PathBuf, process};

use anyhow::{Context, Result};
use chrono::TimeDelta;
use clap::Parser;
use log::info;
use payload_daq::{
    DaqContext, SampleSink, SamplingLoop, SensorHub, StepResult, config,
    core::time::{Clock, Instant, WallClock},
    datatypes::SampleSet,
    sensors::{BenchBackend, GpsLink},
};
use uom::si::{length::meter, pressure::pascal, thermodynamic_temperature::degree_celsius};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "config/daq.toml")]
    config: PathBuf,

    /// Sample rate in Hz, overrides DAQ.SAMPLE_RATE_HZ
    #[arg(short, long)]
    rate: Option<f64>,

    /// Use a simulated GPS instead of the serial port
    #[arg(long, default_value_t = false)]
    ideal_gps: bool,

    /// Altitude of the simulated barometer, in meters
    #[arg(long, default_value_t = 0.0)]
    field_altitude: f64,
}

/// Logs one line per `interval` with the latest sample and the number of
/// samples taken since the previous line.
struct SummarySink<C> {
    clock: C,
    interval: TimeDelta,
    last_report: Option<Instant>,
    count: u64,
}

impl<C: Clock> SummarySink<C> {
    fn new(clock: C, interval: TimeDelta) -> Self {
        SummarySink {
            clock,
            interval,
            last_report: None,
            count: 0,
        }
    }
}

impl<C: Clock> SampleSink for SummarySink<C> {
    fn on_sample(&mut self, sample: &SampleSet) -> StepResult {
        self.count += 1;

        let now = self.clock.monotonic();
        let last = *self.last_report.get_or_insert(now);

        if now - last >= self.interval {
            let a = sample.acceleration;
            let w = sample.angular_rate;
            info!(
                "{} samples | acc [{:.2}, {:.2}, {:.2}] m/s^2 | gyro [{:.3}, {:.3}, {:.3}] rad/s | {:.1} Pa | {:.1} m | {:.1} C",
                self.count,
                a.x,
                a.y,
                a.z,
                w.x,
                w.y,
                w.z,
                sample.pressure.get::<pascal>(),
                sample.altitude.get::<meter>(),
                sample.temperature.get::<degree_celsius>(),
            );

            self.count = 0;
            self.last_report = Some(now);
        }

        StepResult::Continue
    }
}

fn main() -> Result<()> {
    // Default log level to "info"
    if env::var("RUST_LOG").is_err() {
        unsafe { env::set_var("RUST_LOG", "info") }
    }

    pretty_env_logger::init();

    let args = Args::parse();

    ctrlc::set_handler(|| {
        info!("Interrupted, stopping acquisition");
        process::exit(0);
    })
    .context("Could not install the signal handler")?;

    let toml = fs::read_to_string(&args.config)
        .with_context(|| format!("Could not read {}", args.config.display()))?;
    let cfg = config::parse_str(&toml)
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    let ctx = DaqContext::new(cfg, WallClock::new());

    let gps_link = if args.ideal_gps {
        GpsLink::Ideal
    } else {
        GpsLink::Serial
    };
    let mut backend = BenchBackend::new(gps_link, args.field_altitude);

    let mut hub = SensorHub::initialize(&ctx, &mut backend)?;

    let mut sampler = match args.rate {
        Some(rate) => SamplingLoop::new(rate, ctx.clock().clone())?,
        None => SamplingLoop::from_context(&ctx)?,
    };

    let mut sink = SummarySink::new(ctx.clock().clone(), TimeDelta::seconds(1));
    sampler.run(&mut hub, &mut sink)?;

    Ok(())
}

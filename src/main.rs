//! perfmeter - Live performance telemetry demo
//!
//! Runs the sampler over the host operating system while a simulated update
//! loop on the main thread records pulses and frames and polls for
//! snapshots.
//!
//! Usage: `perfmeter [CONFIG.toml] [--seconds N] [--json]`

use anyhow::Context;
use perfmeter::{FrameCounters, HostSampleSource, PerformanceMeter, SamplerConfig};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Simulated host update interval (~60 Hz)
const HOST_FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Every n-th simulated pulse has nothing to render
const IDLE_PULSE_EVERY: u64 = 4;

struct Args {
    config_path: Option<PathBuf>,
    seconds: u64,
    json: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args {
        config_path: None,
        seconds: 10,
        json: false,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => args.json = true,
            "--seconds" => {
                let value = iter.next().context("--seconds needs a value")?;
                args.seconds = value
                    .parse()
                    .with_context(|| format!("invalid --seconds value {:?}", value))?;
            }
            _ => args.config_path = Some(PathBuf::from(arg)),
        }
    }
    Ok(args)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,perfmeter=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;

    let config = match &args.config_path {
        Some(path) => SamplerConfig::load(path)?,
        None => SamplerConfig::load_or_default(),
    };
    tracing::info!(
        period_ms = config.effective_period_millis(),
        alpha = config.smoothing_alpha,
        "Starting performance meter demo"
    );

    let counters = FrameCounters::new();
    let (meter, mut observer) = PerformanceMeter::builder()
        .config(config)
        .source(HostSampleSource::new(counters.clone()))
        .build()?;
    meter.start()?;

    let deadline = Instant::now() + Duration::from_secs(args.seconds);
    let mut pulse: u64 = 0;
    while Instant::now() < deadline {
        pulse += 1;
        counters.record_pulse(pulse % IDLE_PULSE_EVERY != 0);

        if observer.poll() {
            let snapshot = observer.latest();
            if args.json {
                println!("{}", snapshot.to_json()?);
            } else {
                tracing::info!("{}", snapshot);
            }
        }

        std::thread::sleep(HOST_FRAME_INTERVAL);
    }

    tracing::info!("Shutting down...");
    meter.stop();
    tracing::info!(
        dropped = meter.dropped_snapshots(),
        "Average frame rate {:.1} Hz, process CPU {:.1}% (min {:.1}%, max {:.1}%)",
        observer.average_frame_rate(),
        observer.average_process_cpu_load(),
        observer.min_process_cpu_load(),
        observer.max_process_cpu_load()
    );

    Ok(())
}

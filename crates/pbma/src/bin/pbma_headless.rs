//! pbma_headless - runs the oscillator demo without a window

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pbma::demo::{OscillatorApp, OscillatorWorld};
use pbma::{Coordinator, HeadlessHost, HostOptions, PbmaConfig, PbmaResult};
use tracing::{error, info};

/// Frame budget used when neither `--frames` nor `host.frames` sets one.
/// A headless host has no window to close.
const DEFAULT_FRAMES: u64 = 600;

#[derive(Parser)]
#[command(
    name = "pbma_headless",
    version,
    about = "Run the oscillator simulation against a headless host"
)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many frames (overrides `host.frames`; defaults to 600)
    #[arg(long)]
    frames: Option<u64>,

    /// Start animating immediately instead of paused
    #[arg(long)]
    animate: bool,
}

fn main() -> ExitCode {
    setup_logging();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "pbma_headless failed");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Applies command line overrides on top of the configuration.
fn resolve_config(cli: &Cli, mut config: PbmaConfig) -> PbmaResult<PbmaConfig> {
    if cli.frames.is_some() {
        config.host.frames = cli.frames;
    }
    if config.host.frames.is_none() {
        info!(frames = DEFAULT_FRAMES, "no frame budget set, using default");
        config.host.frames = Some(DEFAULT_FRAMES);
    }
    if cli.animate {
        config.coordinator.start_animating = true;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> PbmaResult<()> {
    let loaded = match &cli.config {
        Some(path) => PbmaConfig::load(path)?,
        None => PbmaConfig::default(),
    };
    let config = resolve_config(&cli, loaded)?;

    let capacity = config.demo.trace_capacity;
    let app = OscillatorApp::new(capacity);
    let mut coordinator = Coordinator::new(app, OscillatorWorld::new(capacity))
        .with_config(config.coordinator.clone())
        .with_host_options(HostOptions::from(&config.host));

    let mut host = HeadlessHost::new();
    coordinator.run(&mut host)?;

    let stats = coordinator.stats();
    let app = coordinator.app();
    info!(
        frames = host.frames_run(),
        presented = app.frames_drawn(),
        last = ?app.last_presented(),
        "run complete"
    );
    println!(
        "frames={} presented={} skipped={} steps={} idle_steps={} clamped={}",
        host.frames_run(),
        stats.frames_presented,
        stats.frames_skipped,
        stats.steps,
        stats.idle_steps,
        stats.clamped_deltas,
    );
    Ok(())
}

//! # COL Control Binary
//!
//! Launches (or attaches to) the simulator, configures it over shared
//! memory and drives it for a number of steps.
//!
//! # Usage
//!
//! ```bash
//! # Launch the configured simulator and run the configured step budget
//! col --config config/col.toml
//!
//! # Attach to a simulator started by hand, 200 steps turning left
//! col --config config/col.toml --no-launch --steps 200 --action 0,-1,0,0
//!
//! # Verbose JSON logs
//! col --config config/col.toml -v --json
//! ```

#![deny(warnings)]

use clap::Parser;
use col::{Session, SimulatorProcess};
use col_common::config::ColConfig;
use col_common::launcher::Launcher;
use col_common::shm::records::ActionAxes;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// COL - control side of the shared-memory simulator link
#[derive(Parser, Debug)]
#[command(name = "col")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Control driver for the shared-memory simulator link")]
#[command(long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config/col.toml")]
    config: PathBuf,

    /// Attach to a running simulator instead of launching one
    #[arg(long)]
    no_launch: bool,

    /// Number of steps (overrides session.number_of_steps)
    #[arg(long)]
    steps: Option<u32>,

    /// Action published every step as forward,turn,vertical,gravity
    #[arg(long, value_parser = parse_action, default_value = "1,0,0,0", allow_hyphen_values = true)]
    action: ActionAxes,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn parse_action(s: &str) -> Result<ActionAxes, String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<i32>().map_err(|e| format!("{v:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match values[..] {
        [forward, turn, vertical, gravity] => Ok(ActionAxes {
            forward,
            turn,
            vertical,
            gravity,
        }),
        _ => Err(format!("expected 4 comma-separated integers, got {}", values.len())),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("COL failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = ColConfig::load_validated(&args.config);
    let level = match &config {
        _ if args.verbose => Level::DEBUG,
        Ok(config) => config
            .shared
            .log_level
            .as_directive()
            .parse()
            .unwrap_or(Level::INFO),
        Err(_) => Level::INFO,
    };
    setup_tracing(level, args.json);
    let config = config?;

    info!(
        "COL v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let launcher = if args.no_launch {
        None
    } else {
        SimulatorProcess::from_config(&config.simulator).map(|p| Box::new(p) as Box<dyn Launcher>)
    };
    if launcher.is_none() {
        info!("Attaching to running simulator on segment {}", config.simulator.segment_name);
    }

    let mut session = Session::new(config, launcher);

    let running = session.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let summary = session.run(args.steps, args.action)?;
    info!(
        "Session complete: {} steps, {} frames, last frame {}{}",
        summary.steps,
        summary.frames,
        summary.last_frame_index,
        if summary.interrupted { " (interrupted)" } else { "" }
    );
    Ok(())
}

/// Setup tracing subscriber.
fn setup_tracing(level: Level, json: bool) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

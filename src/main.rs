//! Replays recorded capture scenarios through the guidance engine.

use anyhow::{Context, Result};
use capture_guidance::{
    angles::CaptureAngle,
    app::{ReplayApp, Scenario},
    config::{EngineConfig, EXAMPLE_CONFIG},
};
use clap::Parser;
use log::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file to replay (YAML format)
    #[arg(short, long, required_unless_present = "print_config")]
    scenario: Option<String>,

    /// Capture angle (front, right-45, left-45, vertex, back-donor); overrides the scenario
    #[arg(short, long)]
    angle: Option<CaptureAngle>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Print an example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Print the full condition report for the final tick
    #[arg(long)]
    detailed: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            match EngineConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to load config file: {e}. Using defaults.");
                    EngineConfig::default()
                }
            }
        }
        None => EngineConfig::default(),
    };

    let scenario_path = args.scenario.context("--scenario is required")?;
    let scenario =
        Scenario::from_file(&scenario_path).with_context(|| format!("failed to load scenario {scenario_path}"))?;

    let mut app = ReplayApp::new(config, scenario, args.angle)?;
    let mut last_phase = None;
    let summary = app.run(|state| {
        if last_phase != Some(state.phase) || state.captured {
            println!(
                "{:>7} ms  {:<20} {:>3}%  {}",
                state.timestamp_ms,
                state.phase.to_string(),
                state.progress_percent(),
                state.feedback
            );
            last_phase = Some(state.phase);
        }
    })?;

    if args.detailed {
        if let Some(state) = app.session().last_state() {
            println!("\n{}", state.detailed());
        }
    }

    println!();
    println!("Angle:      {}", summary.angle);
    println!("Ticks:      {}", summary.ticks);
    match summary.first_ready_ms {
        Some(t) => println!("Ready at:   {t} ms"),
        None => println!("Ready at:   never"),
    }
    match summary.captured_at_ms {
        Some(t) => println!("Captured:   {t} ms"),
        None => println!("Captured:   no ({})", summary.final_feedback),
    }

    Ok(())
}

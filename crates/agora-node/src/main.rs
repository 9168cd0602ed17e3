//! Agora Node - replays an operation log against an in-memory DAO.
//!
//! Loads a deployment from a TOML config, applies a JSON operation log in
//! order, and prints the outcome of every entry plus the final state.

pub mod config;
pub mod runner;
pub mod script;
pub mod telemetry;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "agora-node")]
#[command(about = "Agora Node - council-gated quadratic governance")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Config file path
    #[arg(short, long, value_name = "FILE", env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Operation log to replay (JSON)
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Log level; overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", config::NodeConfig::default().to_toml()?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => config::NodeConfig::from_file(path)?,
        None => config::NodeConfig::default(),
    };

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    match &config.logging.log_file {
        Some(file) => telemetry::init_telemetry_with_file(&level, file)?,
        None => telemetry::init_telemetry(
            &level,
            args.json_logs || config.logging.format == "json",
        )?,
    }

    match &args.config {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("Using default configuration"),
    }
    config.validate()?;

    info!("Configuration:");
    info!("  Name: {}", config.name);
    info!("  Council: {} members", config.governance.multisig.members.len());
    info!(
        "  Thresholds: minor {} / major {}",
        config.governance.multisig.minor_threshold, config.governance.multisig.major_threshold
    );
    info!(
        "  Voting: delay {} period {} quorum {}/{}",
        config.governance.governor.voting_delay,
        config.governance.governor.voting_period,
        config.governance.governor.quorum_numerator,
        config.governance.governor.quorum_denominator
    );
    info!("  Sweep grace: {}", config.governance.rewards.grace_period);

    let mut runner = runner::Runner::new(&config)?;

    if let Some(path) = &args.script {
        let entries = script::load(path)?;
        info!("Replaying {} entries from {:?}", entries.len(), path);
        runner.run(&entries);
    }

    let stdout = std::io::stdout();
    runner.write_summary(&mut stdout.lock())?;

    info!(
        applied = runner.outcomes().len() - runner.rejected(),
        rejected = runner.rejected(),
        "Replay complete"
    );
    Ok(())
}

//! Sluice CLI - config scaffolding and offline scenario replay for the
//! Sluice circuit breaker.
//!
//! Subcommands: init, check, simulate, inspect.

mod commands;
mod scenario;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sluice_core::BreakerConfig;

/// Sluice - rate-limited outflow protection for custodied asset pools.
#[derive(Parser, Debug)]
#[command(name = "sluice", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "sluice.toml")]
    config: PathBuf,

    /// Override the configured log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Validate a configuration file.
    Check,
    /// Replay a JSON scenario against an in-memory breaker.
    Simulate(commands::simulate::SimulateArgs),
    /// Replay a scenario and print one asset's ledger window.
    Inspect(commands::inspect::InspectArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Init(args) = &cli.command {
        return commands::init::run(&cli.config, args);
    }

    let config = BreakerConfig::load(&cli.config)?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    init_tracing(&level, &config.logging.format);

    match &cli.command {
        Commands::Init(_) => Ok(()),
        Commands::Check => commands::check::run(&cli.config, &config),
        Commands::Simulate(args) => commands::simulate::run(&config, args),
        Commands::Inspect(args) => commands::inspect::run(&config, args),
    }
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine-readable.
fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

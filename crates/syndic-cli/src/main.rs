//! # syndic CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use syndic_cli::compute::{run_compute, ComputeArgs};
use syndic_cli::migrate::{run_migrate, MigrateArgs};
use syndic_cli::validate::{run_validate, ValidateArgs};

/// Syndicate profit distribution toolchain.
///
/// Validates distribution configurations, computes profit splits offline,
/// and migrates legacy configurations to the current schema.
#[derive(Parser, Debug)]
#[command(name = "syndic", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a distribution configuration.
    Validate(ValidateArgs),

    /// Compute the distribution of a gross profit.
    Compute(ComputeArgs),

    /// Convert a legacy configuration to the current schema.
    Migrate(MigrateArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Validate(args) => run_validate(&args),
        Commands::Compute(args) => run_compute(&args),
        Commands::Migrate(args) => run_migrate(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

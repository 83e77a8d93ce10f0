//! # Validate Subcommand
//!
//! Normalizes a configuration file (migrating legacy documents in memory)
//! and runs it through the same validation the API applies on save.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use syndic_core::OperationContext;
use syndic_distribution::{normalize, ValidationReport};

use crate::{load_config, load_directory, EXIT_REJECTED};

/// Arguments for the `syndic validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration file (JSON or YAML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Users file used to resolve legacy participant names.
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Read an untagged document as a legacy (v1) configuration.
    #[arg(long)]
    pub assume_legacy: bool,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when valid, 1 when rejected.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let stored = load_config(&args.config, args.assume_legacy)?;
    let directory = load_directory(args.users.as_deref())?;
    let ctx = OperationContext::system();

    let config = match normalize(&stored, &directory) {
        Ok(config) => config,
        Err(e) => {
            println!("REJECTED: {}: {e}", args.config.display());
            return Ok(EXIT_REJECTED);
        }
    };
    let report = ValidationReport::evaluate(&config, &ctx);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.valid {
        println!(
            "OK: {} ({} schema, total {})",
            args.config.display(),
            stored.schema_version(),
            report.percentage_total
        );
    } else {
        println!(
            "REJECTED: {}: {} (total {}, delta {})",
            args.config.display(),
            report.error.as_deref().unwrap_or("invalid configuration"),
            report.percentage_total,
            report.delta
        );
    }

    Ok(if report.valid { 0 } else { EXIT_REJECTED })
}

//! # Migrate Subcommand
//!
//! Rewrites a legacy (`v1`) configuration in the current schema. Legacy
//! participant names are resolved against the users file; names with no
//! matching user become manual payouts, while unmatched contributors are
//! rejected.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use syndic_distribution::migrate;

use crate::{load_config, load_directory, render_document, EXIT_REJECTED};

/// Arguments for the `syndic migrate` subcommand.
#[derive(Args, Debug)]
pub struct MigrateArgs {
    /// Configuration file (JSON or YAML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Users file used to resolve legacy names.
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Read an untagged document as a legacy (v1) configuration.
    #[arg(long)]
    pub assume_legacy: bool,

    /// Write the migrated document here instead of stdout. The extension
    /// picks JSON or YAML.
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Execute the migrate subcommand.
pub fn run_migrate(args: &MigrateArgs) -> Result<u8> {
    let stored = load_config(&args.config, args.assume_legacy)?;
    let directory = load_directory(args.users.as_deref())?;

    let migrated = match migrate(&stored, &directory) {
        Ok(migrated) => migrated,
        Err(e) => {
            println!("REJECTED: {}: {e}", args.config.display());
            return Ok(EXIT_REJECTED);
        }
    };
    let rendered = render_document(&migrated, args.output.as_deref())?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(
                from = stored.schema_version(),
                output = %path.display(),
                "configuration migrated"
            );
        }
        None => println!("{rendered}"),
    }
    Ok(0)
}

//! # Compute Subcommand
//!
//! Runs the full engine pipeline offline: normalize, validate, compute, and
//! optionally settle to currency precision. Nothing is persisted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use syndic_core::{AccountId, Money, OperationContext, SyndicError};
use syndic_distribution::{
    compute_distribution, normalize, validate_config, DistributionRequest, DistributionResult,
    PoolFallback, StoredDistributionConfig, UserDirectory,
};

use crate::{load_config, load_directory, EXIT_REJECTED};

/// Arguments for the `syndic compute` subcommand.
#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Configuration file (JSON or YAML).
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,

    /// Gross profit, e.g. 1250.50.
    #[arg(long)]
    pub gross: String,

    /// Recording date (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long)]
    pub as_of: Option<NaiveDate>,

    /// Account id. Only affects the idempotency key in the output.
    #[arg(long)]
    pub account: Option<uuid::Uuid>,

    /// What to do with an unfunded contributor pool:
    /// undistributed, growth_fund, or primary_participant.
    #[arg(long, default_value = "undistributed")]
    pub pool_fallback: PoolFallback,

    /// Users file for display names and legacy name resolution.
    #[arg(long)]
    pub users: Option<PathBuf>,

    /// Read an untagged document as a legacy (v1) configuration.
    #[arg(long)]
    pub assume_legacy: bool,

    /// Round amounts to cents (largest-remainder) as the ledger would.
    #[arg(long)]
    pub settle: bool,
}

/// Normalize, validate, and compute in one step.
pub fn compute_from_stored(
    stored: &StoredDistributionConfig,
    request: &DistributionRequest,
    directory: &dyn UserDirectory,
    ctx: &OperationContext,
) -> Result<DistributionResult, SyndicError> {
    let config = normalize(stored, directory)?;
    let normalized = validate_config(&config, ctx)?;
    Ok(compute_distribution(&normalized, request, directory, ctx)?)
}

/// Execute the compute subcommand.
///
/// Prints the result as JSON. Returns exit code 0, or 1 when the
/// configuration or distribution is rejected.
pub fn run_compute(args: &ComputeArgs) -> Result<u8> {
    let gross = Money::parse(&args.gross).context("invalid --gross")?;
    let stored = load_config(&args.config, args.assume_legacy)?;
    let directory = load_directory(args.users.as_deref())?;
    let ctx = OperationContext::system();

    let account = args.account.map(AccountId::from_uuid).unwrap_or_default();
    let as_of = args.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let request =
        DistributionRequest::new(account, gross, as_of).with_pool_fallback(args.pool_fallback);

    let result = match compute_from_stored(&stored, &request, &directory, &ctx) {
        Ok(result) => result,
        Err(e @ (SyndicError::Configuration(_) | SyndicError::Distribution(_))) => {
            println!("REJECTED: {e}");
            return Ok(EXIT_REJECTED);
        }
        Err(e) => return Err(e.into()),
    };

    let output = if args.settle {
        match result.settle() {
            Ok(settled) => serde_json::to_string_pretty(&settled)?,
            Err(e) => {
                println!("REJECTED: {}", SyndicError::from(e));
                return Ok(EXIT_REJECTED);
            }
        }
    } else {
        serde_json::to_string_pretty(&result)?
    };
    println!("{output}");

    tracing::info!(
        entries = result.entries.len(),
        undistributed = %result.undistributed,
        "distribution computed"
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syndic_core::UserId;
    use syndic_distribution::StaticDirectory;

    fn scenario_a() -> StoredDistributionConfig {
        serde_json::from_value(serde_json::json!({
            "schema_version": "v1",
            "participants": [
                { "name": "Owner", "percentage": "70" },
                { "name": "Contributor Pool", "percentage": "20" },
                { "name": "Growth Fund", "percentage": "10" }
            ],
            "contributors": [
                { "name": "Alice", "units": "10", "price_per_unit": "1000" },
                { "name": "Bob", "units": "30", "price_per_unit": "1000" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn pipeline_computes_scenario_a() {
        let owner = UserId::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let directory = StaticDirectory::new()
            .with_user(owner, "Owner")
            .with_user(alice, "Alice")
            .with_user(bob, "Bob");
        let stored = scenario_a();
        let request = DistributionRequest::new(
            AccountId::new(),
            Money::parse("1000").unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        );
        let result =
            compute_from_stored(&stored, &request, &directory, &OperationContext::system()).unwrap();
        assert_eq!(result.entries.len(), 4);
        assert_eq!(result.growth_fund_total(), Money::parse("100").unwrap());
        let amount_for = |user: UserId| {
            result
                .entries
                .iter()
                .filter(|e| e.recipient.user_id() == Some(user))
                .map(|e| e.amount)
                .sum::<Money>()
        };
        assert_eq!(amount_for(owner), Money::parse("700").unwrap());
        assert_eq!(amount_for(alice), Money::parse("50").unwrap());
        assert_eq!(amount_for(bob), Money::parse("150").unwrap());
    }

    #[test]
    fn pipeline_reports_rejections_as_top_level_errors() {
        let stored: StoredDistributionConfig = serde_json::from_value(serde_json::json!({
            "schema_version": "v2",
            "participants": [
                { "recipient": { "kind": "manual", "ref": "Desk" }, "percentage": "80" }
            ]
        }))
        .unwrap();
        let request = DistributionRequest::new(
            AccountId::new(),
            Money::parse("100").unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        );
        let err = compute_from_stored(
            &stored,
            &request,
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap_err();
        assert!(matches!(err, SyndicError::Configuration(_)));
    }

    #[test]
    fn run_compute_exit_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("desk.json");
        std::fs::write(
            &path,
            r#"{"schema_version":"v2","participants":[
                {"recipient":{"kind":"manual","ref":"Desk"},"percentage":"100"}]}"#,
        )
        .unwrap();
        let mut args = ComputeArgs {
            config: path,
            gross: "250.005".into(),
            as_of: None,
            account: None,
            pool_fallback: PoolFallback::Undistributed,
            users: None,
            assume_legacy: false,
            settle: true,
        };
        assert_eq!(run_compute(&args).unwrap(), 0);

        args.gross = "-5".into();
        assert_eq!(run_compute(&args).unwrap(), EXIT_REJECTED);

        args.gross = "lots".into();
        assert!(run_compute(&args).is_err());
    }
}

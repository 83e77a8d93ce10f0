//! # Configuration Validator
//!
//! Decides whether an account's distribution configuration is well-formed
//! before any profit is split against it. Rules are checked in a fixed
//! order so that the first failure reported is stable:
//!
//! 1. No negative percentage, growth-fund percentage, unit count, or unit
//!    price. Every funded amount, and their sum, must fit in a `Decimal`.
//! 2. At most one Contributor Pool row, regardless of percentages.
//! 3. An explicit Growth Fund row and a non-zero separate growth-fund
//!    percentage may not both be present.
//! 4. Row percentages plus the implicit growth-fund share sum to 100 within
//!    [`TOLERANCE`](syndic_core::TOLERANCE), strictly.
//!
//! A passing configuration is returned as a [`NormalizedConfig`], the only
//! input the split algorithm accepts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use syndic_core::{within_tolerance, OperationContext, Percentage};
use thiserror::Error;

use crate::model::{AccountDistributionConfig, ParticipantKind, ParticipantRow, GROWTH_FUND_LABEL};

/// Why a configuration was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A percentage, unit count, or unit price is negative.
    #[error("negative value in {0}")]
    NegativeValue(String),

    /// A funded amount (`units * price_per_unit`) or the funding total is
    /// too large to represent.
    #[error("value out of range in {0}")]
    ValueOutOfRange(String),

    /// More than one Contributor Pool row.
    #[error("configuration has {count} contributor pool rows, at most one is allowed")]
    MultiplePoolRows {
        /// Number of pool rows found.
        count: usize,
    },

    /// Both an explicit Growth Fund row and a separate growth-fund
    /// percentage are set.
    #[error("growth fund is configured both as a row and as a separate percentage")]
    ConflictingGrowthFund,

    /// Percentages do not sum to 100.
    #[error("percentages sum to {actual}, expected 100")]
    PercentageMismatch {
        /// The computed total.
        actual: Decimal,
    },
}

impl ConfigError {
    /// For a percentage mismatch, `100 - actual` (positive means the editor
    /// still has share left to assign).
    pub fn delta(&self) -> Option<Decimal> {
        match self {
            Self::PercentageMismatch { actual } => Some(Decimal::ONE_HUNDRED - actual),
            _ => None,
        }
    }
}

/// A configuration that passed validation.
///
/// The implicit growth-fund share is materialized as a trailing Growth Fund
/// row, so the split algorithm sees exactly one shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedConfig {
    config: AccountDistributionConfig,
}

impl NormalizedConfig {
    /// The validated configuration.
    pub fn config(&self) -> &AccountDistributionConfig {
        &self.config
    }

    /// Participant rows in stored order.
    pub fn participants(&self) -> &[ParticipantRow] {
        &self.config.participants
    }

    /// Unwrap into the validated configuration.
    pub fn into_inner(self) -> AccountDistributionConfig {
        self.config
    }
}

/// Validate a configuration.
///
/// Pure and repeatable. `ctx` only feeds the tracing span.
pub fn validate_config(
    config: &AccountDistributionConfig,
    ctx: &OperationContext,
) -> Result<NormalizedConfig, ConfigError> {
    let span = tracing::debug_span!(
        "validate_config",
        correlation_id = %ctx.correlation_id,
        role = %ctx.caller.role,
    );
    let _guard = span.enter();

    check_non_negative(config)?;
    check_funding_in_range(config)?;

    let pools = config.pool_row_count();
    if pools > 1 {
        return Err(ConfigError::MultiplePoolRows { count: pools });
    }

    let implicit_gf = config.implicit_growth_fund();
    let explicit_gf = config
        .participants
        .iter()
        .any(|row| row.recipient.is_growth_fund());
    if explicit_gf && implicit_gf.is_some() {
        return Err(ConfigError::ConflictingGrowthFund);
    }

    let total = config.percentage_total().as_decimal();
    if !within_tolerance(total, Decimal::ONE_HUNDRED) {
        return Err(ConfigError::PercentageMismatch { actual: total });
    }

    let derived_pool = config.derived_pool_percentage();
    if derived_pool != config.contributor_pool_percentage {
        tracing::warn!(
            stored = %config.contributor_pool_percentage,
            derived = %derived_pool,
            "stored contributor pool percentage is stale, recomputing"
        );
    }

    let mut normalized = config.clone();
    if let Some(pct) = implicit_gf {
        normalized.participants.push(ParticipantRow::new(
            ParticipantKind::GrowthFund,
            GROWTH_FUND_LABEL,
            pct,
        ));
    }
    normalized.growth_fund_percentage = None;
    normalized.contributor_pool_percentage = derived_pool;

    tracing::debug!(
        rows = normalized.participants.len(),
        contributors = normalized.contributors.len(),
        "configuration valid"
    );
    Ok(NormalizedConfig { config: normalized })
}

fn check_non_negative(config: &AccountDistributionConfig) -> Result<(), ConfigError> {
    for (i, row) in config.participants.iter().enumerate() {
        if row.percentage.is_negative() {
            return Err(ConfigError::NegativeValue(format!(
                "participants[{i}].percentage"
            )));
        }
    }
    if config
        .growth_fund_percentage
        .is_some_and(|pct| pct.is_negative())
    {
        return Err(ConfigError::NegativeValue(
            "growth_fund_percentage".to_string(),
        ));
    }
    for (i, row) in config.contributors.iter().enumerate() {
        if row.units < Decimal::ZERO {
            return Err(ConfigError::NegativeValue(format!("contributors[{i}].units")));
        }
        if row.price_per_unit.is_negative() {
            return Err(ConfigError::NegativeValue(format!(
                "contributors[{i}].price_per_unit"
            )));
        }
    }
    Ok(())
}

fn check_funding_in_range(config: &AccountDistributionConfig) -> Result<(), ConfigError> {
    for (i, row) in config.contributors.iter().enumerate() {
        if row.funded_amount().is_none() {
            return Err(ConfigError::ValueOutOfRange(format!("contributors[{i}]")));
        }
    }
    if config.total_funded().is_none() {
        return Err(ConfigError::ValueOutOfRange("contributors".to_string()));
    }
    Ok(())
}

/// Live feedback for a configuration editor. Never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether the configuration would be accepted.
    pub valid: bool,
    /// Row percentages plus the implicit growth-fund share.
    pub percentage_total: Percentage,
    /// `100 - percentage_total`.
    pub delta: Decimal,
    /// The first failing rule, rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationReport {
    /// Evaluate a configuration without rejecting it.
    pub fn evaluate(config: &AccountDistributionConfig, ctx: &OperationContext) -> Self {
        let percentage_total = config.percentage_total();
        let error = validate_config(config, ctx).err().map(|e| e.to_string());
        Self {
            valid: error.is_none(),
            percentage_total,
            delta: Decimal::ONE_HUNDRED - percentage_total.as_decimal(),
            error,
        }
    }
}

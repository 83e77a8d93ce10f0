//! # Split Algorithm
//!
//! Splits one gross profit figure across a validated configuration.
//!
//! Rows are processed in stored order. Every non-pool row pays
//! `gross * pct / 100` to its recipient; Growth Fund rows are flagged so the
//! caller routes them to the growth-fund ledger instead of a balance. The
//! Contributor Pool row is expanded in place into one entry per funded
//! contributor, weighted by `units * price_per_unit`.
//!
//! A configuration may total anywhere strictly within 0.01 of 100, so the
//! rows pay out `gross * total / 100` rather than the gross itself. The
//! difference is carried in `undistributed` (negative when the total is
//! above 100) so the books always balance against the gross.
//!
//! No amount is rounded here. The post-condition is reconciliation: the sum
//! of all entries plus the undistributed remainder must equal the gross
//! within tolerance. A failure means a bug or a corrupt configuration and
//! aborts the recording. Arithmetic is checked; an amount too large for a
//! `Decimal` is reported as [`DistributionError::AmountOutOfRange`].

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use syndic_core::{AccountId, IdempotencyKey, Money, OperationContext, Percentage, ValidationError};
use thiserror::Error;

use crate::directory::{resolve_display_name, UserDirectory};
use crate::model::{
    DistributionEntry, DistributionResult, EntrySource, ParticipantKind, Recipient,
    GROWTH_FUND_LABEL,
};
use crate::validation::NormalizedConfig;

/// Role label carried on contributor pool entries.
pub const CONTRIBUTOR_ROLE: &str = "Contributor";

/// Role label on a fallback entry produced from an unfunded pool.
pub const UNFUNDED_POOL_ROLE: &str = "Contributor Pool (unfunded)";

/// Why a distribution could not be computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DistributionError {
    /// Gross profit must be strictly positive.
    #[error("gross profit must be positive, got {0}")]
    NonPositiveProfit(Money),

    /// An intermediate amount does not fit in a `Decimal`.
    #[error("amount out of range while computing {0}")]
    AmountOutOfRange(&'static str),

    /// Entries plus undistributed do not add back up to the gross.
    #[error("distribution does not reconcile: expected {expected}, got {actual}")]
    ReconciliationFailed {
        /// Gross profit.
        expected: Money,
        /// Sum of entries and undistributed remainder.
        actual: Money,
    },
}

// ---------------------------------------------------------------------------
// Pool fallback policy
// ---------------------------------------------------------------------------

/// What happens to a Contributor Pool share when no contributor has funded
/// the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolFallback {
    /// Leave the share undistributed and report it on the result.
    #[default]
    Undistributed,
    /// Route the share to the growth fund as one extra flagged entry.
    GrowthFund,
    /// Credit the share to the first registered-user row. Behaves like
    /// `Undistributed` when there is none.
    PrimaryParticipant,
}

impl PoolFallback {
    /// Return the string representation of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undistributed => "undistributed",
            Self::GrowthFund => "growth_fund",
            Self::PrimaryParticipant => "primary_participant",
        }
    }
}

impl std::fmt::Display for PoolFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolFallback {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "undistributed" => Ok(Self::Undistributed),
            "growth_fund" => Ok(Self::GrowthFund),
            "primary_participant" => Ok(Self::PrimaryParticipant),
            other => Err(ValidationError::InvalidIdentifier {
                kind: "pool fallback",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// One profit-recording event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRequest {
    /// Account the profit was earned on.
    pub account_id: AccountId,
    /// Gross profit to split.
    pub gross_profit: Money,
    /// Recording date. Part of the idempotency key.
    pub as_of: NaiveDate,
    /// Policy for an unfunded contributor pool.
    #[serde(default)]
    pub pool_fallback: PoolFallback,
}

impl DistributionRequest {
    /// Build a request with the default pool fallback.
    pub fn new(account_id: AccountId, gross_profit: Money, as_of: NaiveDate) -> Self {
        Self {
            account_id,
            gross_profit,
            as_of,
            pool_fallback: PoolFallback::default(),
        }
    }

    /// Builder: override the pool fallback policy.
    pub fn with_pool_fallback(mut self, fallback: PoolFallback) -> Self {
        self.pool_fallback = fallback;
        self
    }

    /// Idempotency key for this submission.
    pub fn idempotency_key(&self) -> IdempotencyKey {
        IdempotencyKey::for_profit(&self.account_id, self.as_of, self.gross_profit)
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute the distribution of one profit event.
///
/// Deterministic: reads no clock and mutates nothing. The directory is
/// consulted only for display names.
pub fn compute_distribution(
    config: &NormalizedConfig,
    request: &DistributionRequest,
    directory: &dyn UserDirectory,
    ctx: &OperationContext,
) -> Result<DistributionResult, DistributionError> {
    let span = tracing::debug_span!(
        "compute_distribution",
        account_id = %request.account_id,
        correlation_id = %ctx.correlation_id,
        role = %ctx.caller.role,
    );
    let _guard = span.enter();

    let gross = request.gross_profit;
    if !gross.is_positive() {
        return Err(DistributionError::NonPositiveProfit(gross));
    }

    let account = config.config();
    let mut entries = Vec::with_capacity(account.participants.len() + account.contributors.len());
    let mut contributor_pool_amount = Money::ZERO;

    let configured = gross
        .checked_percent(account.percentage_total())
        .ok_or(DistributionError::AmountOutOfRange("configured share"))?;
    let mut undistributed = gross - configured;
    if !undistributed.is_zero() {
        tracing::debug!(
            residual = %undistributed,
            "percentage total differs from 100 within tolerance, residual left undistributed"
        );
    }

    for row in &account.participants {
        let amount = gross
            .checked_percent(row.percentage)
            .ok_or(DistributionError::AmountOutOfRange("row share"))?;
        match &row.recipient {
            ParticipantKind::ContributorPool => {
                if !row.percentage.is_positive() {
                    continue;
                }
                contributor_pool_amount = amount;
                let total_funded = account
                    .total_funded()
                    .ok_or(DistributionError::AmountOutOfRange("total funded"))?;
                if total_funded.is_positive() {
                    for contributor in &account.contributors {
                        let funded = contributor
                            .funded_amount()
                            .ok_or(DistributionError::AmountOutOfRange("funded amount"))?;
                        if !funded.is_positive() {
                            continue;
                        }
                        let share = amount
                            .checked_pro_rata(funded.as_decimal(), total_funded.as_decimal())
                            .ok_or(DistributionError::AmountOutOfRange("contributor share"))?;
                        let weight =
                            Percentage::checked_ratio(funded.as_decimal(), total_funded.as_decimal())
                                .ok_or(DistributionError::AmountOutOfRange("contributor weight"))?;
                        entries.push(DistributionEntry {
                            recipient: Recipient::User(contributor.user_id),
                            display_name: resolve_display_name(directory, &contributor.user_id),
                            amount: share,
                            percentage_applied: weight,
                            is_growth_fund: false,
                            role: CONTRIBUTOR_ROLE.to_string(),
                            source: EntrySource::ContributorPool,
                        });
                    }
                } else {
                    match apply_pool_fallback(config, request.pool_fallback, amount, directory) {
                        Some(entry) => entries.push(entry),
                        None => {
                            tracing::warn!(
                                pool_amount = %amount,
                                "contributor pool has no funded contributors, share left undistributed"
                            );
                            undistributed += amount;
                        }
                    }
                }
            }
            ParticipantKind::GrowthFund => entries.push(DistributionEntry {
                recipient: Recipient::GrowthFund,
                display_name: GROWTH_FUND_LABEL.to_string(),
                amount,
                percentage_applied: row.percentage,
                is_growth_fund: true,
                role: row.role.clone(),
                source: EntrySource::Participant,
            }),
            ParticipantKind::User(user) => entries.push(DistributionEntry {
                recipient: Recipient::User(*user),
                display_name: resolve_display_name(directory, user),
                amount,
                percentage_applied: row.percentage,
                is_growth_fund: false,
                role: row.role.clone(),
                source: EntrySource::Participant,
            }),
            ParticipantKind::Manual(label) => entries.push(DistributionEntry {
                recipient: Recipient::Manual(label.clone()),
                display_name: label.clone(),
                amount,
                percentage_applied: row.percentage,
                is_growth_fund: false,
                role: row.role.clone(),
                source: EntrySource::Participant,
            }),
        }
    }

    let actual = entries
        .iter()
        .try_fold(undistributed, |acc, e| acc.checked_add(e.amount))
        .ok_or(DistributionError::AmountOutOfRange("entry total"))?;
    if !actual.reconciles_with(gross) {
        tracing::warn!(expected = %gross, actual = %actual, "distribution failed to reconcile");
        return Err(DistributionError::ReconciliationFailed {
            expected: gross,
            actual,
        });
    }

    tracing::debug!(
        gross_profit = %gross,
        entries = entries.len(),
        undistributed = %undistributed,
        "distribution computed"
    );

    Ok(DistributionResult {
        account_id: request.account_id,
        as_of: request.as_of,
        gross_profit: gross,
        entries,
        contributor_pool_amount,
        undistributed,
        idempotency_key: request.idempotency_key(),
    })
}

/// Entry replacing an unfunded pool, or `None` to leave it undistributed.
fn apply_pool_fallback(
    config: &NormalizedConfig,
    fallback: PoolFallback,
    amount: Money,
    directory: &dyn UserDirectory,
) -> Option<DistributionEntry> {
    let pool_pct = config.config().derived_pool_percentage();
    match fallback {
        PoolFallback::Undistributed => None,
        PoolFallback::GrowthFund => {
            tracing::info!(pool_amount = %amount, "unfunded contributor pool routed to growth fund");
            Some(DistributionEntry {
                recipient: Recipient::GrowthFund,
                display_name: GROWTH_FUND_LABEL.to_string(),
                amount,
                percentage_applied: pool_pct,
                is_growth_fund: true,
                role: UNFUNDED_POOL_ROLE.to_string(),
                source: EntrySource::PoolFallback,
            })
        }
        PoolFallback::PrimaryParticipant => {
            let user = config.participants().iter().find_map(|row| match &row.recipient {
                ParticipantKind::User(id) => Some(*id),
                _ => None,
            })?;
            tracing::info!(
                pool_amount = %amount,
                user_id = %user,
                "unfunded contributor pool credited to primary participant"
            );
            Some(DistributionEntry {
                recipient: Recipient::User(user),
                display_name: resolve_display_name(directory, &user),
                amount,
                percentage_applied: pool_pct,
                is_growth_fund: false,
                role: UNFUNDED_POOL_ROLE.to_string(),
                source: EntrySource::PoolFallback,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{StaticDirectory, UNKNOWN_USER_LABEL};
    use crate::model::{AccountDistributionConfig, ContributorRow, ParticipantRow};
    use crate::validation::validate_config;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use syndic_core::UserId;

    struct Fixture {
        owner: UserId,
        alice: UserId,
        bob: UserId,
        directory: StaticDirectory,
    }

    fn fixture() -> Fixture {
        let owner = UserId::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let directory = StaticDirectory::new()
            .with_user(owner, "Olivia")
            .with_user(alice, "Alice")
            .with_user(bob, "Bob");
        Fixture {
            owner,
            alice,
            bob,
            directory,
        }
    }

    fn pct(value: Decimal) -> Percentage {
        Percentage::new(value)
    }

    fn standard_config(f: &Fixture, contributors: Vec<ContributorRow>) -> NormalizedConfig {
        let config = AccountDistributionConfig::new(
            vec![
                ParticipantRow::new(ParticipantKind::User(f.owner), "Owner", pct(dec!(70))),
                ParticipantRow::new(ParticipantKind::ContributorPool, "Pool", pct(dec!(20))),
                ParticipantRow::new(ParticipantKind::GrowthFund, "Growth Fund", pct(dec!(10))),
            ],
            contributors,
        );
        validate_config(&config, &OperationContext::system()).unwrap()
    }

    fn funded(f: &Fixture) -> Vec<ContributorRow> {
        vec![
            ContributorRow::new(f.alice, dec!(10), Money::new(dec!(1000))),
            ContributorRow::new(f.bob, dec!(30), Money::new(dec!(1000))),
        ]
    }

    fn request(gross: Decimal) -> DistributionRequest {
        DistributionRequest::new(
            AccountId::new(),
            Money::new(gross),
            NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
        )
    }

    fn amount_for(result: &DistributionResult, user: UserId, source: EntrySource) -> Decimal {
        result
            .entries
            .iter()
            .find(|e| e.recipient == Recipient::User(user) && e.source == source)
            .map(|e| e.amount.as_decimal())
            .unwrap()
    }

    #[test]
    fn funded_pool_is_split_pro_rata() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        let result =
            compute_distribution(&config, &request(dec!(1000)), &f.directory, &OperationContext::system())
                .unwrap();

        assert_eq!(result.entries.len(), 4);
        assert_eq!(amount_for(&result, f.owner, EntrySource::Participant), dec!(700));
        assert_eq!(amount_for(&result, f.alice, EntrySource::ContributorPool), dec!(50));
        assert_eq!(amount_for(&result, f.bob, EntrySource::ContributorPool), dec!(150));
        assert_eq!(result.growth_fund_total().as_decimal(), dec!(100));
        assert_eq!(result.contributor_pool_amount.as_decimal(), dec!(200));
        assert!(result.undistributed.is_zero());

        let shares: Vec<Decimal> = result
            .contributor_entries()
            .map(|e| e.percentage_applied.as_decimal())
            .collect();
        assert_eq!(shares, vec![dec!(25), dec!(75)]);
        assert!(result.contributor_entries().all(|e| e.role == CONTRIBUTOR_ROLE));
    }

    #[test]
    fn pool_is_expanded_in_row_order() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        let result =
            compute_distribution(&config, &request(dec!(1000)), &f.directory, &OperationContext::system())
                .unwrap();
        let names: Vec<&str> = result.entries.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Olivia", "Alice", "Bob", "Growth Fund"]);
    }

    #[test]
    fn unfunded_pool_is_left_undistributed_by_default() {
        let f = fixture();
        let config = standard_config(&f, vec![]);
        let result =
            compute_distribution(&config, &request(dec!(1000)), &f.directory, &OperationContext::system())
                .unwrap();

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.contributor_entries().count(), 0);
        assert_eq!(result.entries_total().as_decimal(), dec!(800));
        assert_eq!(result.undistributed.as_decimal(), dec!(200));
    }

    #[test]
    fn zero_funded_contributors_count_as_unfunded() {
        let f = fixture();
        let config = standard_config(
            &f,
            vec![ContributorRow::new(f.alice, dec!(0), Money::new(dec!(1000)))],
        );
        let result =
            compute_distribution(&config, &request(dec!(1000)), &f.directory, &OperationContext::system())
                .unwrap();
        assert_eq!(result.contributor_entries().count(), 0);
        assert_eq!(result.undistributed.as_decimal(), dec!(200));
    }

    #[test]
    fn unfunded_pool_routed_to_growth_fund() {
        let f = fixture();
        let config = standard_config(&f, vec![]);
        let req = request(dec!(1000)).with_pool_fallback(PoolFallback::GrowthFund);
        let result =
            compute_distribution(&config, &req, &f.directory, &OperationContext::system()).unwrap();

        assert_eq!(result.growth_fund_total().as_decimal(), dec!(300));
        assert!(result.undistributed.is_zero());
        let fallback = result
            .entries
            .iter()
            .find(|e| e.source == EntrySource::PoolFallback)
            .unwrap();
        assert!(fallback.is_growth_fund);
        assert_eq!(fallback.role, UNFUNDED_POOL_ROLE);
    }

    #[test]
    fn unfunded_pool_routed_to_primary_participant() {
        let f = fixture();
        let config = standard_config(&f, vec![]);
        let req = request(dec!(1000)).with_pool_fallback(PoolFallback::PrimaryParticipant);
        let result =
            compute_distribution(&config, &req, &f.directory, &OperationContext::system()).unwrap();
        assert_eq!(amount_for(&result, f.owner, EntrySource::PoolFallback), dec!(200));
        assert_eq!(result.distributed_total().as_decimal(), dec!(900));
    }

    #[test]
    fn primary_participant_without_user_rows_leaves_share_undistributed() {
        let config = AccountDistributionConfig::new(
            vec![
                ParticipantRow::new(ParticipantKind::Manual("Desk".into()), "", pct(dec!(80))),
                ParticipantRow::new(ParticipantKind::ContributorPool, "", pct(dec!(20))),
            ],
            vec![],
        );
        let config = validate_config(&config, &OperationContext::system()).unwrap();
        let req = request(dec!(500)).with_pool_fallback(PoolFallback::PrimaryParticipant);
        let result = compute_distribution(
            &config,
            &req,
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap();
        assert_eq!(result.undistributed.as_decimal(), dec!(100));
    }

    #[test]
    fn non_positive_profit_is_rejected() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        for gross in [dec!(0), dec!(-5)] {
            assert_eq!(
                compute_distribution(&config, &request(gross), &f.directory, &OperationContext::system()),
                Err(DistributionError::NonPositiveProfit(Money::new(gross)))
            );
        }
    }

    #[test]
    fn unknown_user_is_labelled_not_fatal() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        let result = compute_distribution(
            &config,
            &request(dec!(1000)),
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap();
        assert!(result
            .entries
            .iter()
            .filter(|e| !e.is_growth_fund)
            .all(|e| e.display_name == UNKNOWN_USER_LABEL));
    }

    #[test]
    fn manual_label_passes_through_and_zero_rows_are_kept() {
        let config = AccountDistributionConfig::new(
            vec![
                ParticipantRow::new(ParticipantKind::Manual("Bonus".into()), "Manual", pct(dec!(100))),
                ParticipantRow::new(ParticipantKind::User(UserId::new()), "Idle", pct(dec!(0))),
            ],
            vec![],
        );
        let config = validate_config(&config, &OperationContext::system()).unwrap();
        let result = compute_distribution(
            &config,
            &request(dec!(10)),
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap();
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].display_name, "Bonus");
        assert_eq!(result.entries[0].recipient.user_id(), None);
        assert!(result.entries[1].amount.is_zero());
    }

    #[test]
    fn identical_inputs_give_identical_results() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        let req = request(dec!(1234.56));
        let a = compute_distribution(&config, &req, &f.directory, &OperationContext::system()).unwrap();
        let b = compute_distribution(&config, &req, &f.directory, &OperationContext::system()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn pool_fallback_parses() {
        assert_eq!("growth_fund".parse::<PoolFallback>().unwrap(), PoolFallback::GrowthFund);
        assert_eq!(
            " Primary_Participant ".parse::<PoolFallback>().unwrap(),
            PoolFallback::PrimaryParticipant
        );
        assert!("nowhere".parse::<PoolFallback>().is_err());
        assert_eq!(PoolFallback::default().to_string(), "undistributed");
    }

    fn users_config(percentages: &[Decimal]) -> NormalizedConfig {
        let rows = percentages
            .iter()
            .map(|p| ParticipantRow::new(ParticipantKind::User(UserId::new()), "", pct(*p)))
            .collect();
        validate_config(&AccountDistributionConfig::new(rows, vec![]), &OperationContext::system())
            .unwrap()
    }

    #[test]
    fn total_just_below_hundred_leaves_residual_undistributed() {
        let config = users_config(&[dec!(33.333), dec!(33.333), dec!(33.333)]);
        for (gross, share, residual) in [
            (dec!(1000), dec!(333.33), dec!(0.01)),
            (dec!(1_000_000), dec!(333_330), dec!(10)),
        ] {
            let result = compute_distribution(
                &config,
                &request(gross),
                &StaticDirectory::new(),
                &OperationContext::system(),
            )
            .unwrap();
            assert!(result.entries.iter().all(|e| e.amount.as_decimal() == share));
            assert_eq!(result.undistributed.as_decimal(), residual);

            let settled = result.settle().unwrap();
            assert_eq!(settled.undistributed.as_decimal(), residual);
            let total = settled.distributed_total() + settled.undistributed;
            assert_eq!(total.as_decimal(), gross);
        }
    }

    #[test]
    fn total_just_above_hundred_carries_negative_residual() {
        let config = users_config(&[dec!(50.0025), dec!(50.0025)]);
        let result = compute_distribution(
            &config,
            &request(dec!(1000)),
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap();
        assert_eq!(result.entries_total().as_decimal(), dec!(1000.05));
        assert_eq!(result.undistributed.as_decimal(), dec!(-0.05));

        let settled = result.settle().unwrap();
        let total = settled.distributed_total() + settled.undistributed;
        assert_eq!(total.as_decimal(), dec!(1000));
    }

    #[test]
    fn oversized_gross_is_an_error_not_a_panic() {
        let config = users_config(&[dec!(100.005)]);
        let err = compute_distribution(
            &config,
            &request(Decimal::MAX),
            &StaticDirectory::new(),
            &OperationContext::system(),
        )
        .unwrap_err();
        assert_eq!(err, DistributionError::AmountOutOfRange("configured share"));
    }

    #[test]
    fn very_large_gross_still_splits_the_pool() {
        let f = fixture();
        let config = standard_config(&f, funded(&f));
        let gross = Decimal::from_i128_with_scale(10i128.pow(27), 0);
        let result =
            compute_distribution(&config, &request(gross), &f.directory, &OperationContext::system())
                .unwrap();
        assert_eq!(
            amount_for(&result, f.alice, EntrySource::ContributorPool),
            Decimal::from_i128_with_scale(5 * 10i128.pow(25), 0)
        );
        assert!(result.entries_total().reconciles_with(Money::new(gross)));
    }

    #[test]
    fn settled_result_persists_whole_cents() {
        let f = fixture();
        let contributors = vec![
            ContributorRow::new(f.alice, dec!(1), Money::new(dec!(1))),
            ContributorRow::new(f.bob, dec!(2), Money::new(dec!(1))),
        ];
        let config = standard_config(&f, contributors);
        let result =
            compute_distribution(&config, &request(dec!(100.01)), &f.directory, &OperationContext::system())
                .unwrap();
        let settled = result.settle().unwrap();
        let total = settled.distributed_total() + settled.growth_fund_total() + settled.undistributed;
        assert_eq!(total.as_decimal(), dec!(100.01));
        assert!(settled
            .entries
            .iter()
            .all(|e| e.amount.as_decimal().scale() <= 2));
    }
}

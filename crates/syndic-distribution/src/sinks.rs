//! # Persistence-side Contracts
//!
//! The engine never writes anything. After a distribution is computed and
//! settled, the recording workflow turns it into a [`DistributionRecord`]
//! and hands it to a [`LedgerSink`] (record + per-user balance credits) and
//! a [`GrowthFundSink`] (growth-fund inflow).
//!
//! Every sink write carries an [`IdempotencyKey`] derived from the
//! submission key. Replaying a record is therefore safe: duplicate writes
//! report [`Applied::Duplicate`] and change nothing.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use syndic_core::{AccountId, DistributionId, IdempotencyKey, Money, UserId};
use thiserror::Error;

use crate::model::{DistributionEntry, DistributionResult, SettledDistribution};

/// Outcome of an idempotent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied {
    /// The write took effect.
    Applied,
    /// A write with the same key was already applied.
    Duplicate,
}

/// Errors raised by a sink implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The backing store could not be reached.
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The write was refused (e.g. the key was reused for different data).
    #[error("sink rejected write: {0}")]
    Rejected(String),
}

/// A persisted distribution: settled amounts plus provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Record identifier.
    pub id: DistributionId,
    /// Account the profit was recorded on.
    pub account_id: AccountId,
    /// Recording date.
    pub as_of: NaiveDate,
    /// Gross profit.
    pub gross_profit: Money,
    /// Settled entries (2 dp).
    pub entries: Vec<DistributionEntry>,
    /// Settled undistributed remainder.
    pub undistributed: Money,
    /// Submission key.
    pub idempotency_key: IdempotencyKey,
    /// User who recorded the profit, if any.
    pub recorded_by: Option<UserId>,
    /// Wall-clock recording time.
    pub recorded_at: DateTime<Utc>,
}

impl DistributionRecord {
    /// Build a record from an exact result and its settled view.
    pub fn from_settled(
        result: &DistributionResult,
        settled: SettledDistribution,
        recorded_by: Option<UserId>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DistributionId::new(),
            account_id: result.account_id,
            as_of: result.as_of,
            gross_profit: result.gross_profit,
            entries: settled.entries,
            undistributed: settled.undistributed,
            idempotency_key: result.idempotency_key.clone(),
            recorded_by,
            recorded_at,
        }
    }

    /// Balance credits, one per user entry with a positive amount.
    ///
    /// Keys are scoped by entry index, so a user appearing twice (e.g. as
    /// both participant and contributor) is credited twice.
    pub fn balance_credits(&self) -> Vec<(UserId, Money, IdempotencyKey)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_growth_fund && e.amount.is_positive())
            .filter_map(|(i, e)| {
                e.recipient.user_id().map(|user| {
                    (
                        user,
                        e.amount,
                        self.idempotency_key.scoped(&format!("balance:{i}")),
                    )
                })
            })
            .collect()
    }

    /// The growth-fund inflow, if any.
    pub fn growth_fund_credit(&self) -> Option<(Money, IdempotencyKey)> {
        let total: Money = self
            .entries
            .iter()
            .filter(|e| e.is_growth_fund)
            .map(|e| e.amount)
            .sum();
        total
            .is_positive()
            .then(|| (total, self.idempotency_key.scoped("growth_fund")))
    }

    /// Sum of amounts paid to recipients other than the growth fund.
    pub fn distributed_total(&self) -> Money {
        self.entries
            .iter()
            .filter(|e| !e.is_growth_fund)
            .map(|e| e.amount)
            .sum()
    }
}

/// Persists distribution records and applies balance deltas.
pub trait LedgerSink: Send + Sync {
    /// Store a record. Keyed by its idempotency key.
    fn save_distribution_records(&self, record: &DistributionRecord) -> Result<Applied, SinkError>;

    /// Add `delta` (negative for debits) to a user's balance.
    fn apply_balance_delta(
        &self,
        user: UserId,
        delta: Money,
        key: &IdempotencyKey,
    ) -> Result<Applied, SinkError>;
}

/// Receives growth-fund inflows.
pub trait GrowthFundSink: Send + Sync {
    /// Credit the growth fund with an account's skim for one date.
    fn credit_growth_fund(
        &self,
        amount: Money,
        account: AccountId,
        as_of: NaiveDate,
        key: &IdempotencyKey,
    ) -> Result<Applied, SinkError>;
}

/// Summary of a [`persist_distribution`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    /// Whether the record itself was new.
    pub record: Applied,
    /// Balance credits that took effect.
    pub balances_applied: usize,
    /// Balance credits skipped as duplicates.
    pub balances_duplicate: usize,
    /// Growth-fund credit outcome, when there was one.
    pub growth_fund: Option<Applied>,
}

/// Write a record, its balance credits, and its growth-fund credit.
///
/// Credits are applied even when the record itself is a duplicate, so a
/// recording interrupted between writes completes on retry.
pub fn persist_distribution(
    record: &DistributionRecord,
    ledger: &dyn LedgerSink,
    growth_fund: &dyn GrowthFundSink,
) -> Result<PersistOutcome, SinkError> {
    let record_outcome = ledger.save_distribution_records(record)?;

    let mut balances_applied = 0;
    let mut balances_duplicate = 0;
    for (user, amount, key) in record.balance_credits() {
        match ledger.apply_balance_delta(user, amount, &key)? {
            Applied::Applied => balances_applied += 1,
            Applied::Duplicate => balances_duplicate += 1,
        }
    }

    let growth = match record.growth_fund_credit() {
        Some((amount, key)) => Some(growth_fund.credit_growth_fund(
            amount,
            record.account_id,
            record.as_of,
            &key,
        )?),
        None => None,
    };

    tracing::debug!(
        distribution_id = %record.id,
        account_id = %record.account_id,
        balances_applied,
        balances_duplicate,
        "distribution persisted"
    );

    Ok(PersistOutcome {
        record: record_outcome,
        balances_applied,
        balances_duplicate,
        growth_fund: growth,
    })
}

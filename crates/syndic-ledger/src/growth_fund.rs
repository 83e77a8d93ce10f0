//! # Growth Fund Ledger
//!
//! Append-only list of growth-fund inflows. Each distribution contributes at
//! most one inflow (the sum of its flagged entries), keyed so that replay is
//! a no-op.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use syndic_core::{AccountId, IdempotencyKey, Money};
use syndic_distribution::{Applied, GrowthFundSink, SinkError};

/// One credit to the growth fund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthFundInflow {
    /// Source account.
    pub account_id: AccountId,
    /// Date of the distribution that produced it.
    pub as_of: NaiveDate,
    /// Amount credited.
    pub amount: Money,
    /// Write key.
    pub key: IdempotencyKey,
}

/// Growth-fund total for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountGrowth {
    /// The account.
    pub account_id: AccountId,
    /// Sum of its inflows.
    pub total: Money,
    /// Number of inflows.
    pub inflows: usize,
}

/// Fund-wide summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthFundSummary {
    /// Sum of all inflows.
    pub total: Money,
    /// Per-account breakdown, ordered by account id.
    pub accounts: Vec<AccountGrowth>,
}

#[derive(Debug, Default)]
struct Inner {
    inflows: Vec<GrowthFundInflow>,
    keys: HashSet<IdempotencyKey>,
}

/// In-memory growth-fund ledger.
#[derive(Debug, Default)]
pub struct GrowthFundLedger {
    inner: RwLock<Inner>,
}

impl GrowthFundLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of all inflows.
    pub fn total(&self) -> Money {
        self.inner.read().inflows.iter().map(|i| i.amount).sum()
    }

    /// All inflows in arrival order.
    pub fn inflows(&self) -> Vec<GrowthFundInflow> {
        self.inner.read().inflows.clone()
    }

    /// Total and per-account breakdown.
    pub fn summary(&self) -> GrowthFundSummary {
        let inner = self.inner.read();
        let mut by_account: BTreeMap<AccountId, (Money, usize)> = BTreeMap::new();
        for inflow in &inner.inflows {
            let slot = by_account.entry(inflow.account_id).or_default();
            slot.0 += inflow.amount;
            slot.1 += 1;
        }
        GrowthFundSummary {
            total: inner.inflows.iter().map(|i| i.amount).sum(),
            accounts: by_account
                .into_iter()
                .map(|(account_id, (total, inflows))| AccountGrowth {
                    account_id,
                    total,
                    inflows,
                })
                .collect(),
        }
    }
}

impl GrowthFundSink for GrowthFundLedger {
    fn credit_growth_fund(
        &self,
        amount: Money,
        account: AccountId,
        as_of: NaiveDate,
        key: &IdempotencyKey,
    ) -> Result<Applied, SinkError> {
        if amount.is_negative() {
            return Err(SinkError::Rejected(format!(
                "growth fund credit must not be negative, got {amount}"
            )));
        }
        let mut inner = self.inner.write();
        if !inner.keys.insert(key.clone()) {
            return Ok(Applied::Duplicate);
        }
        inner.inflows.push(GrowthFundInflow {
            account_id: account,
            as_of,
            amount,
            key: key.clone(),
        });
        tracing::info!(account_id = %account, amount = %amount, "growth fund credited");
        Ok(Applied::Applied)
    }
}

//! # Balance Ledger
//!
//! Per-user running balances plus the stored distribution records they were
//! credited from. A single lock guards records, balances, and the applied
//! key set so the three never disagree.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use syndic_core::{AccountId, IdempotencyKey, Money, UserId};
use syndic_distribution::{Applied, DistributionRecord, LedgerSink, SinkError};

#[derive(Debug, Default)]
struct Inner {
    records: Vec<DistributionRecord>,
    record_index: HashMap<IdempotencyKey, usize>,
    balances: HashMap<UserId, Money>,
    applied: HashSet<IdempotencyKey>,
}

/// In-memory balance ledger.
#[derive(Debug, Default)]
pub struct BalanceLedger {
    inner: RwLock<Inner>,
}

impl BalanceLedger {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// A user's balance (zero if never credited).
    pub fn balance(&self, user: &UserId) -> Money {
        self.inner
            .read()
            .balances
            .get(user)
            .copied()
            .unwrap_or(Money::ZERO)
    }

    /// Every non-zero balance.
    pub fn balances(&self) -> Vec<(UserId, Money)> {
        let inner = self.inner.read();
        let mut out: Vec<(UserId, Money)> = inner
            .balances
            .iter()
            .filter(|(_, m)| !m.is_zero())
            .map(|(u, m)| (*u, *m))
            .collect();
        out.sort_by_key(|(u, _)| *u);
        out
    }

    /// Look up a stored record by its submission key.
    pub fn record_by_key(&self, key: &IdempotencyKey) -> Option<DistributionRecord> {
        let inner = self.inner.read();
        inner
            .record_index
            .get(key)
            .and_then(|&i| inner.records.get(i))
            .cloned()
    }

    /// Records for one account, in recording order.
    pub fn records_for(&self, account: &AccountId) -> Vec<DistributionRecord> {
        self.inner
            .read()
            .records
            .iter()
            .filter(|r| &r.account_id == account)
            .cloned()
            .collect()
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.inner.read().records.len()
    }
}

impl LedgerSink for BalanceLedger {
    fn save_distribution_records(&self, record: &DistributionRecord) -> Result<Applied, SinkError> {
        let mut inner = self.inner.write();
        if let Some(&i) = inner.record_index.get(&record.idempotency_key) {
            if inner.records[i].gross_profit != record.gross_profit
                || inner.records[i].account_id != record.account_id
            {
                return Err(SinkError::Rejected(format!(
                    "idempotency key {} already used for a different distribution",
                    record.idempotency_key
                )));
            }
            return Ok(Applied::Duplicate);
        }
        let index = inner.records.len();
        inner.records.push(record.clone());
        inner.record_index.insert(record.idempotency_key.clone(), index);
        Ok(Applied::Applied)
    }

    fn apply_balance_delta(
        &self,
        user: UserId,
        delta: Money,
        key: &IdempotencyKey,
    ) -> Result<Applied, SinkError> {
        let mut inner = self.inner.write();
        if !inner.applied.insert(key.clone()) {
            tracing::debug!(user_id = %user, key = %key, "duplicate balance delta ignored");
            return Ok(Applied::Duplicate);
        }
        *inner.balances.entry(user).or_default() += delta;
        Ok(Applied::Applied)
    }
}

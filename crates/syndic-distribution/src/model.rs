//! # Distribution Tree Data Model
//!
//! An account's distribution configuration is two independent lists:
//!
//! - **Participants** — the percentage tree. Each row names a recipient and
//!   its share of gross profit. A recipient is a registered user, a
//!   free-text label for manual payouts, the Contributor Pool, or the
//!   Growth Fund. The last two are explicit variants of [`ParticipantKind`],
//!   never magic display names.
//! - **Contributors** — the funding tree. Used only to weight the
//!   Contributor Pool sub-split by each contributor's funded amount.
//!
//! A [`DistributionResult`] is the ephemeral output for one profit event.
//! It is never mutated after construction; [`DistributionResult::settle`]
//! produces a separate rounded view for persistence.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use syndic_core::{AccountId, IdempotencyKey, Money, Percentage, UserId};

use crate::engine::DistributionError;

/// Display label used for the growth-fund recipient.
pub const GROWTH_FUND_LABEL: &str = "Growth Fund";

/// Display label used for the contributor pool row.
pub const CONTRIBUTOR_POOL_LABEL: &str = "Contributor Pool";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Who a participant row pays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum ParticipantKind {
    /// A registered user; credited to their balance.
    User(UserId),
    /// A free-text label for an ad-hoc or manual payout.
    Manual(String),
    /// Placeholder sub-divided pro-rata among contributors by funded amount.
    ContributorPool,
    /// The reinvestment sink. Never credited to a user balance.
    GrowthFund,
}

impl ParticipantKind {
    /// Whether this is the contributor pool placeholder.
    pub fn is_pool(&self) -> bool {
        matches!(self, Self::ContributorPool)
    }

    /// Whether this is the growth fund.
    pub fn is_growth_fund(&self) -> bool {
        matches!(self, Self::GrowthFund)
    }
}

/// One line in an account's profit-distribution tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    /// Recipient of this share.
    pub recipient: ParticipantKind,
    /// Free-text descriptive label (e.g. "Trader", "Manager").
    #[serde(default)]
    pub role: String,
    /// Share of gross profit, 0–100.
    pub percentage: Percentage,
}

impl ParticipantRow {
    /// Build a row.
    pub fn new(recipient: ParticipantKind, role: impl Into<String>, percentage: Percentage) -> Self {
        Self {
            recipient,
            role: role.into(),
            percentage,
        }
    }
}

/// One line in an account's funding tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRow {
    /// The funder. Contributors must be registered users.
    pub user_id: UserId,
    /// Funding units purchased.
    pub units: Decimal,
    /// Price paid per unit.
    pub price_per_unit: Money,
}

impl ContributorRow {
    /// Build a row.
    pub fn new(user_id: UserId, units: Decimal, price_per_unit: Money) -> Self {
        Self {
            user_id,
            units,
            price_per_unit,
        }
    }

    /// `units * price_per_unit`, or `None` when the product does not fit.
    pub fn funded_amount(&self) -> Option<Money> {
        self.units
            .checked_mul(self.price_per_unit.as_decimal())
            .map(Money::new)
    }
}

/// An account's complete distribution configuration (current schema).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDistributionConfig {
    /// The percentage tree, in stored order.
    pub participants: Vec<ParticipantRow>,
    /// The funding tree.
    #[serde(default)]
    pub contributors: Vec<ContributorRow>,
    /// Growth-fund skim entered separately from the rows by the editor.
    /// Treated as an implicit Growth Fund row when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_fund_percentage: Option<Percentage>,
    /// Denormalized copy of the Contributor Pool row's percentage
    /// (zero when there is none). Recomputed on normalization.
    #[serde(default)]
    pub contributor_pool_percentage: Percentage,
}

impl AccountDistributionConfig {
    /// Build a configuration and fill in the denormalized pool percentage.
    pub fn new(participants: Vec<ParticipantRow>, contributors: Vec<ContributorRow>) -> Self {
        let mut config = Self {
            participants,
            contributors,
            growth_fund_percentage: None,
            contributor_pool_percentage: Percentage::ZERO,
        };
        config.contributor_pool_percentage = config.derived_pool_percentage();
        config
    }

    /// Builder: set the separately-entered growth-fund percentage.
    pub fn with_growth_fund_percentage(mut self, pct: Percentage) -> Self {
        self.growth_fund_percentage = Some(pct);
        self
    }

    /// Number of Contributor Pool rows.
    pub fn pool_row_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|row| row.recipient.is_pool())
            .count()
    }

    /// Percentage of the first Contributor Pool row, zero if absent.
    pub fn derived_pool_percentage(&self) -> Percentage {
        self.participants
            .iter()
            .find(|row| row.recipient.is_pool())
            .map(|row| row.percentage)
            .unwrap_or(Percentage::ZERO)
    }

    /// The implicit growth-fund percentage, when positive.
    pub fn implicit_growth_fund(&self) -> Option<Percentage> {
        self.growth_fund_percentage.filter(|pct| pct.is_positive())
    }

    /// Sum of all row percentages plus the implicit growth-fund row.
    ///
    /// Saturates instead of overflowing, so an absurd row still yields a
    /// total (far from 100) for the editor to report.
    pub fn percentage_total(&self) -> Percentage {
        self.participants
            .iter()
            .map(|row| row.percentage)
            .chain(self.implicit_growth_fund())
            .fold(Percentage::ZERO, Percentage::saturating_add)
    }

    /// Sum of every contributor's funded amount, or `None` when a funded
    /// amount or the sum does not fit.
    pub fn total_funded(&self) -> Option<Money> {
        self.contributors
            .iter()
            .try_fold(Money::ZERO, |acc, row| acc.checked_add(row.funded_amount()?))
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Who a result entry pays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Recipient {
    /// A registered user (participant or contributor).
    User(UserId),
    /// A manual payout label; never credited to a balance.
    Manual(String),
    /// The growth fund.
    GrowthFund,
}

impl Recipient {
    /// The user to credit, if this recipient has a resolvable identity.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Manual(_) | Self::GrowthFund => None,
        }
    }
}

/// Which rule produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// A participant row paid directly.
    Participant,
    /// A contributor's share of the pool.
    ContributorPool,
    /// An unfunded pool's amount rerouted by the fallback policy.
    PoolFallback,
}

/// One line of a distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionEntry {
    /// Who is paid.
    pub recipient: Recipient,
    /// Resolved display name (`"Unknown"` for unresolvable users).
    pub display_name: String,
    /// Amount. Exact in a [`DistributionResult`], 2 dp once settled.
    pub amount: Money,
    /// Percentage of gross profit for participant rows; percentage of the
    /// pool for contributor rows.
    pub percentage_applied: Percentage,
    /// Routed to the growth fund instead of a user balance.
    pub is_growth_fund: bool,
    /// Descriptive role carried from the configuration.
    pub role: String,
    /// Which rule produced this entry.
    pub source: EntrySource,
}

/// The engine's output for one profit-recording event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionResult {
    /// The account whose profit is distributed.
    pub account_id: AccountId,
    /// Recording date.
    pub as_of: NaiveDate,
    /// Gross profit being split.
    pub gross_profit: Money,
    /// Entries in stored row order, pool expanded in place.
    pub entries: Vec<DistributionEntry>,
    /// Nominal amount of the Contributor Pool row (zero without a pool).
    pub contributor_pool_amount: Money,
    /// Amount not paid to any entry: an unfunded pool left undistributed,
    /// plus the residual `gross - gross * percentage_total / 100` of a
    /// total accepted within tolerance of 100 (negative above 100).
    pub undistributed: Money,
    /// Key identifying this submission for duplicate detection.
    pub idempotency_key: IdempotencyKey,
}

impl DistributionResult {
    /// Sum of every entry.
    pub fn entries_total(&self) -> Money {
        self.entries.iter().map(|e| e.amount).sum()
    }

    /// Sum of entries routed to the growth fund.
    pub fn growth_fund_total(&self) -> Money {
        self.entries
            .iter()
            .filter(|e| e.is_growth_fund)
            .map(|e| e.amount)
            .sum()
    }

    /// Sum of entries paid to recipients other than the growth fund.
    pub fn distributed_total(&self) -> Money {
        self.entries
            .iter()
            .filter(|e| !e.is_growth_fund)
            .map(|e| e.amount)
            .sum()
    }

    /// Contributor pool entries.
    pub fn contributor_entries(&self) -> impl Iterator<Item = &DistributionEntry> {
        self.entries
            .iter()
            .filter(|e| e.source == EntrySource::ContributorPool)
    }

    /// Round to currency precision for persistence.
    ///
    /// Uses largest-remainder allocation: every amount (and the
    /// undistributed remainder, which may be negative) is rounded down to
    /// cents, then the cents
    /// needed to reach the rounded exact total go to the rows with the
    /// largest truncated remainders, ties broken by row order. The settled
    /// amounts therefore sum to exactly the rounded total, however many
    /// recipients there are.
    pub fn settle(&self) -> Result<SettledDistribution, DistributionError> {
        let mut exact: Vec<Money> = self.entries.iter().map(|e| e.amount).collect();
        exact.push(self.undistributed);

        let exact_total: Money = exact.iter().sum();
        let target = exact_total.to_currency();

        let mut settled: Vec<Money> = exact.iter().map(Money::floor_currency).collect();
        let floor_total: Money = settled.iter().sum();

        let shortfall = ((target - floor_total).as_decimal() * Decimal::ONE_HUNDRED)
            .round()
            .to_usize()
            .unwrap_or(0);

        let mut order: Vec<usize> = (0..exact.len()).collect();
        order.sort_by(|&a, &b| {
            let rem_a = exact[a] - settled[a];
            let rem_b = exact[b] - settled[b];
            rem_b.cmp(&rem_a).then(a.cmp(&b))
        });
        for &index in order.iter().take(shortfall) {
            settled[index] += Money::cent();
        }

        let undistributed = settled.pop().unwrap_or(Money::ZERO);
        let entries: Vec<DistributionEntry> = self
            .entries
            .iter()
            .zip(settled)
            .map(|(entry, amount)| DistributionEntry {
                amount,
                ..entry.clone()
            })
            .collect();

        let settled_total: Money = entries.iter().map(|e| e.amount).sum::<Money>() + undistributed;
        if !settled_total.reconciles_with(self.gross_profit) {
            return Err(DistributionError::ReconciliationFailed {
                expected: self.gross_profit,
                actual: settled_total,
            });
        }

        Ok(SettledDistribution {
            entries,
            undistributed,
        })
    }
}

/// A distribution rounded to currency precision, ready for persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettledDistribution {
    /// Entries with 2 dp amounts, same order as the exact result.
    pub entries: Vec<DistributionEntry>,
    /// Undistributed remainder at 2 dp.
    pub undistributed: Money,
}

impl SettledDistribution {
    /// Sum of entries routed to the growth fund.
    pub fn growth_fund_total(&self) -> Money {
        self.entries
            .iter()
            .filter(|e| e.is_growth_fund)
            .map(|e| e.amount)
            .sum()
    }

    /// Sum of entries paid to recipients other than the growth fund.
    pub fn distributed_total(&self) -> Money {
        self.entries
            .iter()
            .filter(|e| !e.is_growth_fund)
            .map(|e| e.amount)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn pct(value: Decimal) -> Percentage {
        Percentage::new(value)
    }

    fn entry(amount: Decimal, growth: bool) -> DistributionEntry {
        DistributionEntry {
            recipient: if growth {
                Recipient::GrowthFund
            } else {
                Recipient::User(UserId::new())
            },
            display_name: "x".to_string(),
            amount: Money::new(amount),
            percentage_applied: Percentage::ZERO,
            is_growth_fund: growth,
            role: String::new(),
            source: EntrySource::Participant,
        }
    }

    fn result(entries: Vec<DistributionEntry>, gross: Decimal, undistributed: Decimal) -> DistributionResult {
        DistributionResult {
            account_id: AccountId::new(),
            as_of: NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            gross_profit: Money::new(gross),
            entries,
            contributor_pool_amount: Money::ZERO,
            undistributed: Money::new(undistributed),
            idempotency_key: IdempotencyKey::from_raw("k"),
        }
    }

    #[test]
    fn funded_amount_is_units_times_price() {
        let row = ContributorRow::new(UserId::new(), dec!(2.5), Money::new(dec!(1000)));
        assert_eq!(row.funded_amount().unwrap().as_decimal(), dec!(2500));
    }

    #[test]
    fn oversized_funding_does_not_fit() {
        let whale = ContributorRow::new(
            UserId::new(),
            dec!(100_000_000_000_000_000_000),
            Money::new(dec!(10_000_000_000)),
        );
        assert_eq!(whale.funded_amount(), None);

        let config = AccountDistributionConfig::new(
            vec![ParticipantRow::new(ParticipantKind::ContributorPool, "Pool", pct(dec!(100)))],
            vec![
                ContributorRow::new(UserId::new(), dec!(10), Money::new(dec!(1000))),
                whale,
            ],
        );
        assert_eq!(config.total_funded(), None);
    }

    #[test]
    fn new_config_derives_pool_percentage() {
        let config = AccountDistributionConfig::new(
            vec![
                ParticipantRow::new(ParticipantKind::User(UserId::new()), "Trader", pct(dec!(80))),
                ParticipantRow::new(ParticipantKind::ContributorPool, "Pool", pct(dec!(20))),
            ],
            vec![],
        );
        assert_eq!(config.contributor_pool_percentage, pct(dec!(20)));
        assert_eq!(config.pool_row_count(), 1);
    }

    #[test]
    fn percentage_total_includes_positive_growth_fund_only() {
        let base = AccountDistributionConfig::new(
            vec![ParticipantRow::new(
                ParticipantKind::Manual("Desk".into()),
                "",
                pct(dec!(90)),
            )],
            vec![],
        );
        assert_eq!(
            base.clone()
                .with_growth_fund_percentage(pct(dec!(10)))
                .percentage_total(),
            pct(dec!(100))
        );
        assert_eq!(
            base.with_growth_fund_percentage(Percentage::ZERO)
                .percentage_total(),
            pct(dec!(90))
        );
    }

    #[test]
    fn participant_kind_serde_shape() {
        let json = serde_json::to_value(ParticipantKind::ContributorPool).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "contributor_pool"}));
        let manual: ParticipantKind =
            serde_json::from_value(serde_json::json!({"kind": "manual", "ref": "Bonus"})).unwrap();
        assert_eq!(manual, ParticipantKind::Manual("Bonus".into()));
    }

    #[test]
    fn settle_thirds_sum_to_gross() {
        let third = dec!(100) / dec!(3);
        let r = result(
            vec![entry(third, false), entry(third, false), entry(third, false)],
            dec!(100),
            dec!(0),
        );
        let settled = r.settle().unwrap();
        let amounts: Vec<Decimal> = settled.entries.iter().map(|e| e.amount.as_decimal()).collect();
        assert_eq!(amounts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
        assert_eq!(settled.distributed_total().as_decimal(), dec!(100));
    }

    #[test]
    fn settle_half_cent_split_with_undistributed() {
        let r = result(vec![entry(dec!(0.505), false)], dec!(1.01), dec!(0.505));
        let settled = r.settle().unwrap();
        let total = settled.distributed_total() + settled.undistributed;
        assert_eq!(total.as_decimal(), dec!(1.01));
    }

    #[test]
    fn settle_separates_growth_fund() {
        let r = result(
            vec![entry(dec!(700), false), entry(dec!(100), true)],
            dec!(800),
            dec!(0),
        );
        let settled = r.settle().unwrap();
        assert_eq!(settled.growth_fund_total().as_decimal(), dec!(100));
        assert_eq!(settled.distributed_total().as_decimal(), dec!(700));
    }

    #[test]
    fn settle_handles_negative_residual_from_total_above_hundred() {
        // Two rows at 50.0025% of 1000 pay out 1000.05; the residual is -0.05.
        let r = result(
            vec![entry(dec!(500.025), false), entry(dec!(500.025), false)],
            dec!(1000),
            dec!(-0.05),
        );
        let settled = r.settle().unwrap();
        let amounts: Vec<Decimal> = settled.entries.iter().map(|e| e.amount.as_decimal()).collect();
        assert_eq!(amounts, vec![dec!(500.03), dec!(500.02)]);
        assert_eq!(settled.undistributed.as_decimal(), dec!(-0.05));
        let total = settled.distributed_total() + settled.undistributed;
        assert_eq!(total.as_decimal(), dec!(1000));
    }

    #[test]
    fn settle_rejects_unreconciled_result() {
        let r = result(vec![entry(dec!(90), false)], dec!(100), dec!(0));
        assert!(matches!(
            r.settle(),
            Err(DistributionError::ReconciliationFailed { .. })
        ));
    }
}

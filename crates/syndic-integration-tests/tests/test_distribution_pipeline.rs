//! # Distribution Pipeline: Engine to Ledger
//!
//! Runs configurations through normalize, validate, compute, settle, and
//! persist, then checks what lands in the balance and growth-fund ledgers.
//! Covers both worked scenarios, replay after a restart, and withdrawals
//! drawing on distributed balances.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use syndic_core::{AccountId, Money, OperationContext, Percentage, UserId};
use syndic_distribution::{
    compute_distribution, normalize, persist_distribution, validate_config,
    AccountDistributionConfig, Applied, ContributorRow, DistributionRecord, DistributionRequest,
    DistributionResult, LegacyContributor, LegacyDistributionConfig, LegacyShare,
    ParticipantKind, ParticipantRow, PoolFallback, StaticDirectory, StoredDistributionConfig,
};
use syndic_ledger::{
    available_balance, complete_withdrawal, BalanceLedger, GrowthFundLedger, Withdrawal,
    WithdrawalError,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Desk {
    directory: StaticDirectory,
    owner: UserId,
    alice: UserId,
    bob: UserId,
}

fn desk() -> Desk {
    let owner = UserId::new();
    let alice = UserId::new();
    let bob = UserId::new();
    Desk {
        directory: StaticDirectory::new()
            .with_user(owner, "Owner")
            .with_user(alice, "Alice")
            .with_user(bob, "Bob"),
        owner,
        alice,
        bob,
    }
}

fn share(name: &str, pct: Decimal) -> LegacyShare {
    LegacyShare {
        name: name.to_string(),
        percentage: Percentage::new(pct),
        role: None,
    }
}

/// Owner 70 / Contributor Pool 20 / Growth Fund 10, in the legacy layout.
fn legacy_desk(contributors: Vec<LegacyContributor>) -> StoredDistributionConfig {
    StoredDistributionConfig::V1(LegacyDistributionConfig {
        participants: vec![
            share("Owner", dec!(70)),
            share("Contributor Pool", dec!(20)),
            share("Growth Fund", dec!(10)),
        ],
        contributors,
        growth_fund_percentage: None,
    })
}

fn contributor(name: &str, units: Decimal) -> LegacyContributor {
    LegacyContributor {
        name: name.to_string(),
        units,
        price_per_unit: Money::new(dec!(1000)),
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()
}

fn run(
    stored: &StoredDistributionConfig,
    directory: &StaticDirectory,
    account: AccountId,
    gross: Decimal,
) -> DistributionResult {
    let ctx = OperationContext::system();
    let config = normalize(stored, directory).unwrap();
    let normalized = validate_config(&config, &ctx).unwrap();
    let request = DistributionRequest::new(account, Money::new(gross), date());
    compute_distribution(&normalized, &request, directory, &ctx).unwrap()
}

fn record(result: &DistributionResult) -> DistributionRecord {
    DistributionRecord::from_settled(result, result.settle().unwrap(), None, Utc::now())
}

// ---------------------------------------------------------------------------
// Worked scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_credits_owner_contributors_and_growth_fund() {
    let desk = desk();
    let stored = legacy_desk(vec![contributor("Alice", dec!(10)), contributor("Bob", dec!(30))]);
    let account = AccountId::new();
    let result = run(&stored, &desk.directory, account, dec!(1000));

    let ledger = BalanceLedger::new();
    let fund = GrowthFundLedger::new();
    let outcome = persist_distribution(&record(&result), &ledger, &fund).unwrap();

    assert_eq!(outcome.record, Applied::Applied);
    assert_eq!(outcome.balances_applied, 3);
    assert_eq!(outcome.growth_fund, Some(Applied::Applied));

    assert_eq!(ledger.balance(&desk.owner), Money::new(dec!(700)));
    assert_eq!(ledger.balance(&desk.alice), Money::new(dec!(50)));
    assert_eq!(ledger.balance(&desk.bob), Money::new(dec!(150)));
    assert_eq!(fund.total(), Money::new(dec!(100)));

    let flagged: Vec<_> = result.entries.iter().filter(|e| e.is_growth_fund).collect();
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].amount, Money::new(dec!(100)));
    assert!(result.undistributed.is_zero());
}

#[test]
fn scenario_b_leaves_unfunded_pool_undistributed() {
    let desk = desk();
    let stored = legacy_desk(Vec::new());
    let result = run(&stored, &desk.directory, AccountId::new(), dec!(1000));

    assert_eq!(result.contributor_entries().count(), 0);
    assert_eq!(result.entries_total(), Money::new(dec!(800)));
    assert_eq!(result.undistributed, Money::new(dec!(200)));

    let ledger = BalanceLedger::new();
    let fund = GrowthFundLedger::new();
    persist_distribution(&record(&result), &ledger, &fund).unwrap();
    assert_eq!(ledger.balance(&desk.owner), Money::new(dec!(700)));
    assert_eq!(fund.total(), Money::new(dec!(100)));
    assert_eq!(ledger.balances().len(), 1);
}

#[test]
fn scenario_b_with_growth_fund_fallback_routes_pool_to_fund() {
    let desk = desk();
    let stored = legacy_desk(Vec::new());
    let ctx = OperationContext::system();
    let config = normalize(&stored, &desk.directory).unwrap();
    let normalized = validate_config(&config, &ctx).unwrap();
    let request = DistributionRequest::new(AccountId::new(), Money::new(dec!(1000)), date())
        .with_pool_fallback(PoolFallback::GrowthFund);
    let result = compute_distribution(&normalized, &request, &desk.directory, &ctx).unwrap();

    assert!(result.undistributed.is_zero());
    assert_eq!(result.growth_fund_total(), Money::new(dec!(300)));

    let fund = GrowthFundLedger::new();
    persist_distribution(&record(&result), &BalanceLedger::new(), &fund).unwrap();
    assert_eq!(fund.total(), Money::new(dec!(300)));
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

#[test]
fn replaying_records_into_fresh_ledgers_rebuilds_identical_state() {
    let desk = desk();
    let stored = legacy_desk(vec![contributor("Alice", dec!(10)), contributor("Bob", dec!(30))]);
    let account = AccountId::new();
    let records: Vec<DistributionRecord> = [dec!(1000), dec!(333.33), dec!(0.07)]
        .into_iter()
        .map(|gross| record(&run(&stored, &desk.directory, account, gross)))
        .collect();

    let ledger = BalanceLedger::new();
    let fund = GrowthFundLedger::new();
    for r in &records {
        persist_distribution(r, &ledger, &fund).unwrap();
    }

    // A second pass over the same records is a no-op.
    for r in &records {
        let outcome = persist_distribution(r, &ledger, &fund).unwrap();
        assert_eq!(outcome.record, Applied::Duplicate);
        assert_eq!(outcome.balances_applied, 0);
    }

    // A fresh ledger fed the same records converges to the same state.
    let rebuilt = BalanceLedger::new();
    let rebuilt_fund = GrowthFundLedger::new();
    for r in &records {
        persist_distribution(r, &rebuilt, &rebuilt_fund).unwrap();
    }
    assert_eq!(ledger.balances(), rebuilt.balances());
    assert_eq!(fund.total(), rebuilt_fund.total());
    assert_eq!(rebuilt.records_for(&account).len(), 3);
}

#[test]
fn identical_inputs_produce_identical_results() {
    let desk = desk();
    let stored = legacy_desk(vec![contributor("Alice", dec!(3)), contributor("Bob", dec!(7))]);
    let account = AccountId::new();
    let first = run(&stored, &desk.directory, account, dec!(1234.56));
    let second = run(&stored, &desk.directory, account, dec!(1234.56));
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

// ---------------------------------------------------------------------------
// Withdrawals against distributed balances
// ---------------------------------------------------------------------------

#[test]
fn withdrawal_draws_down_distributed_balance_once() {
    let desk = desk();
    let stored = legacy_desk(vec![contributor("Alice", dec!(10)), contributor("Bob", dec!(30))]);
    let ledger = BalanceLedger::new();
    let fund = GrowthFundLedger::new();
    persist_distribution(
        &record(&run(&stored, &desk.directory, AccountId::new(), dec!(1000))),
        &ledger,
        &fund,
    )
    .unwrap();

    let now = Utc::now();
    let balance = ledger.balance(&desk.alice);
    let mut first = Withdrawal::request(desk.alice, Money::new(dec!(30)), balance, now).unwrap();

    // The pending request reserves its amount.
    let available = available_balance(balance, &desk.alice, [&first]);
    assert_eq!(available, Money::new(dec!(20)));
    let err = Withdrawal::request(desk.alice, Money::new(dec!(25)), available, now).unwrap_err();
    assert!(matches!(err, WithdrawalError::InsufficientBalance { .. }));

    first.approve(Some(desk.owner), now).unwrap();
    assert_eq!(
        complete_withdrawal(&mut first, Some(desk.owner), now, &ledger).unwrap(),
        Applied::Applied
    );
    assert_eq!(ledger.balance(&desk.alice), Money::new(dec!(20)));

    // Completing twice is a transition error and does not debit again.
    assert!(complete_withdrawal(&mut first, Some(desk.owner), now, &ledger).is_err());
    assert_eq!(ledger.balance(&desk.alice), Money::new(dec!(20)));
}

// ---------------------------------------------------------------------------
// Current-schema configuration
// ---------------------------------------------------------------------------

#[test]
fn participant_who_is_also_a_contributor_is_credited_for_both() {
    let desk = desk();
    let config = AccountDistributionConfig::new(
        vec![
            ParticipantRow::new(ParticipantKind::User(desk.alice), "Trader", Percentage::new(dec!(50))),
            ParticipantRow::new(ParticipantKind::ContributorPool, "", Percentage::new(dec!(40))),
            ParticipantRow::new(ParticipantKind::GrowthFund, "", Percentage::new(dec!(10))),
        ],
        vec![
            ContributorRow::new(desk.alice, dec!(1), Money::new(dec!(500))),
            ContributorRow::new(desk.bob, dec!(1), Money::new(dec!(1500))),
        ],
    );
    let stored = StoredDistributionConfig::V2(config);
    let result = run(&stored, &desk.directory, AccountId::new(), dec!(200));

    let ledger = BalanceLedger::new();
    persist_distribution(&record(&result), &ledger, &GrowthFundLedger::new()).unwrap();
    // 50% of 200 plus a quarter of the 80 pool.
    assert_eq!(ledger.balance(&desk.alice), Money::new(dec!(120)));
    assert_eq!(ledger.balance(&desk.bob), Money::new(dec!(60)));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Ledger credits plus the growth fund plus the undistributed
        /// remainder account for every cent of the rounded gross.
        #[test]
        fn ledger_totals_account_for_gross(
            alice_units in 0u32..200,
            bob_units in 0u32..200,
            gross_cents in 1i64..10_000_000,
        ) {
            let desk = desk();
            let mut contributors = Vec::new();
            if alice_units > 0 {
                contributors.push(contributor("Alice", Decimal::from(alice_units)));
            }
            if bob_units > 0 {
                contributors.push(contributor("Bob", Decimal::from(bob_units)));
            }
            let stored = legacy_desk(contributors);
            let gross = Decimal::new(gross_cents, 2);
            let result = run(&stored, &desk.directory, AccountId::new(), gross);
            let record = record(&result);

            let ledger = BalanceLedger::new();
            let fund = GrowthFundLedger::new();
            persist_distribution(&record, &ledger, &fund).unwrap();

            let credited: Money = ledger.balances().into_iter().map(|(_, m)| m).sum();
            prop_assert_eq!(
                credited + fund.total() + record.undistributed,
                Money::new(gross).to_currency()
            );
        }
    }
}

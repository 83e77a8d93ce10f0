//! # syndic-ledger — Balances, Growth Fund, Withdrawals
//!
//! In-memory implementations of the persistence-side contracts defined in
//! `syndic-distribution::sinks`:
//!
//! - [`BalanceLedger`] implements `LedgerSink`: stores distribution records
//!   and applies per-user balance deltas.
//! - [`GrowthFundLedger`] implements `GrowthFundSink`: records growth-fund
//!   inflows per account and date.
//! - [`Withdrawal`] is the client withdrawal lifecycle. Completing a
//!   withdrawal debits the balance ledger exactly once.
//!
//! Every write is keyed by an `IdempotencyKey`. Replaying the same write is
//! a no-op reported as `Applied::Duplicate`, which is what lets the API
//! rebuild balances at startup by replaying persisted records.
//!
//! Locks are `parking_lot` and are never held across an `.await`.

pub mod balance;
pub mod error;
pub mod growth_fund;
pub mod withdrawal;

pub use balance::BalanceLedger;
pub use error::LedgerError;
pub use growth_fund::{AccountGrowth, GrowthFundInflow, GrowthFundLedger, GrowthFundSummary};
pub use withdrawal::{
    available_balance, complete_withdrawal, debit_withdrawal, Withdrawal, WithdrawalError,
    WithdrawalStatus,
};

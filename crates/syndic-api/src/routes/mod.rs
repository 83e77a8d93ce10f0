//! # API Route Modules
//!
//! - `users` — the user directory consulted for display names and legacy
//!   name resolution.
//! - `accounts` — trading accounts, distribution configuration (with
//!   legacy migration and live validation), profit recording, and the
//!   recorded distributions.
//! - `balances` — per-user balances and available-to-withdraw amounts.
//! - `growth_fund` — growth-fund ledger summary.
//! - `withdrawals` — client withdrawal requests and their admin lifecycle.

pub mod accounts;
pub mod balances;
pub mod growth_fund;
pub mod users;
pub mod withdrawals;

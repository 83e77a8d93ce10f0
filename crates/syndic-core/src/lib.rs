#![deny(missing_docs)]

//! # syndic-core — Foundational Types for the Syndicate Stack
//!
//! This crate defines the types that every other crate in the workspace
//! depends on. It has no internal crate dependencies — only `serde`,
//! `thiserror`, `chrono`, `uuid`, `sha2`, and `rust_decimal` from the
//! external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Exact decimal money.** [`Money`] and [`Percentage`] wrap
//!    `rust_decimal::Decimal`. No binary floating point touches an amount,
//!    and nothing is rounded until [`Money::to_currency`] is called at the
//!    persistence boundary.
//!
//! 2. **Newtype wrappers for identifiers.** You cannot pass an [`AccountId`]
//!    where a [`UserId`] is expected.
//!
//! 3. **Explicit caller context.** Roles are never read from ambient session
//!    state; every operation that cares receives an [`OperationContext`].
//!
//! 4. **[`SyndicError`] hierarchy.** Structured errors with `thiserror` — no
//!    `Box<dyn Error>`, no `.unwrap()` outside tests.

pub mod error;
pub mod idempotency;
pub mod identity;
pub mod money;
pub mod role;

pub use error::{SyndicError, ValidationError};
pub use idempotency::IdempotencyKey;
pub use identity::{AccountId, DistributionId, UserId, WithdrawalId};
pub use money::{within_tolerance, Money, Percentage, TOLERANCE};
pub use role::{Caller, OperationContext, Role};

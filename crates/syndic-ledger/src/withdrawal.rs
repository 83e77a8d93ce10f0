//! # Withdrawal Lifecycle State Machine
//!
//! A client requests a withdrawal against their balance; an admin approves
//! or rejects it; an approved withdrawal is completed once the funds have
//! been paid out, which debits the balance ledger.
//!
//! ```text
//! Pending --approve--> Approved --complete--> Completed
//!    |                    |
//!    +------reject--------+-------> Rejected
//! ```
//!
//! `Completed` and `Rejected` are terminal. A request may not exceed the
//! user's available balance: the ledger balance minus every withdrawal
//! still pending or approved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syndic_core::{IdempotencyKey, Money, UserId, WithdrawalId};
use syndic_distribution::{Applied, LedgerSink};
use thiserror::Error;

use crate::error::LedgerError;

/// Withdrawal lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    /// Requested, awaiting an admin decision.
    Pending,
    /// Approved, awaiting payout.
    Approved,
    /// Paid out and debited. Terminal state.
    Completed,
    /// Refused. Terminal state.
    Rejected,
}

impl WithdrawalStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Whether this is a terminal state (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Whether the amount is still reserved against the balance.
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition_to(&self, to: WithdrawalStatus) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Approved, Self::Completed)
                | (Self::Approved, Self::Rejected)
        )
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WithdrawalStatus {
    type Err = WithdrawalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(WithdrawalError::UnknownStatus(other.to_string())),
        }
    }
}

/// Error during withdrawal operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WithdrawalError {
    /// Requested amount is zero or negative.
    #[error("withdrawal amount must be positive, got {0}")]
    NonPositiveAmount(Money),

    /// Requested amount exceeds the available balance.
    #[error("withdrawal of {requested} exceeds available balance {available}")]
    InsufficientBalance {
        /// Amount requested.
        requested: Money,
        /// Balance minus outstanding withdrawals.
        available: Money,
    },

    /// Invalid state transition attempted.
    #[error("invalid withdrawal transition from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: WithdrawalStatus,
        /// Attempted target state.
        to: WithdrawalStatus,
    },

    /// A debit was requested for a withdrawal that is not completed.
    #[error("withdrawal is {0}, only completed withdrawals are debited")]
    NotCompleted(WithdrawalStatus),

    /// Unrecognized stored status.
    #[error("unknown withdrawal status: {0}")]
    UnknownStatus(String),
}

/// A client withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Withdrawal {
    /// Identifier.
    pub id: WithdrawalId,
    /// Requesting user.
    pub user_id: UserId,
    /// Amount at currency precision.
    pub amount: Money,
    /// Current state.
    pub status: WithdrawalStatus,
    /// Admin who last moved the request, if any.
    pub decided_by: Option<UserId>,
    /// Reason given on rejection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the request was made.
    pub requested_at: DateTime<Utc>,
    /// When the request last changed state.
    pub updated_at: DateTime<Utc>,
}

impl Withdrawal {
    /// Open a new request, checking it against the available balance.
    pub fn request(
        user_id: UserId,
        amount: Money,
        available: Money,
        now: DateTime<Utc>,
    ) -> Result<Self, WithdrawalError> {
        let amount = amount.to_currency();
        if !amount.is_positive() {
            return Err(WithdrawalError::NonPositiveAmount(amount));
        }
        if amount > available {
            return Err(WithdrawalError::InsufficientBalance {
                requested: amount,
                available,
            });
        }
        Ok(Self {
            id: WithdrawalId::new(),
            user_id,
            amount,
            status: WithdrawalStatus::Pending,
            decided_by: None,
            reason: None,
            requested_at: now,
            updated_at: now,
        })
    }

    /// `Pending -> Approved`.
    pub fn approve(&mut self, by: Option<UserId>, now: DateTime<Utc>) -> Result<(), WithdrawalError> {
        self.transition(WithdrawalStatus::Approved, by, now)
    }

    /// `Pending | Approved -> Rejected`.
    pub fn reject(
        &mut self,
        by: Option<UserId>,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WithdrawalError> {
        self.transition(WithdrawalStatus::Rejected, by, now)?;
        self.reason = reason;
        Ok(())
    }

    /// `Approved -> Completed`. Changes state only; see
    /// [`debit_withdrawal`] for the balance side.
    pub fn complete(&mut self, by: Option<UserId>, now: DateTime<Utc>) -> Result<(), WithdrawalError> {
        self.transition(WithdrawalStatus::Completed, by, now)
    }

    /// Key used for the completion debit.
    pub fn debit_key(&self) -> IdempotencyKey {
        IdempotencyKey::from_raw(format!("withdrawal:{}", self.id))
    }

    fn transition(
        &mut self,
        to: WithdrawalStatus,
        by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<(), WithdrawalError> {
        if !self.status.can_transition_to(to) {
            return Err(WithdrawalError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        tracing::info!(
            withdrawal_id = %self.id,
            from = %self.status,
            to = %to,
            "withdrawal transition"
        );
        self.status = to;
        self.decided_by = by;
        self.updated_at = now;
        Ok(())
    }
}

/// Debit a completed withdrawal from the user's balance.
///
/// Keyed by the withdrawal id, so replaying it (for instance when
/// rebuilding balances from stored withdrawals) applies the debit once.
/// Callers that persist withdrawals write the `Completed` state first and
/// debit afterwards, so a failed write never leaves a debited withdrawal
/// that is still reserved as approved.
pub fn debit_withdrawal(withdrawal: &Withdrawal, ledger: &dyn LedgerSink) -> Result<Applied, LedgerError> {
    if withdrawal.status != WithdrawalStatus::Completed {
        return Err(WithdrawalError::NotCompleted(withdrawal.status).into());
    }
    Ok(ledger.apply_balance_delta(
        withdrawal.user_id,
        Money::ZERO - withdrawal.amount,
        &withdrawal.debit_key(),
    )?)
}

/// `Approved -> Completed` plus the debit, for callers with nothing to
/// persist in between. `withdrawal` is left unchanged on failure.
pub fn complete_withdrawal(
    withdrawal: &mut Withdrawal,
    by: Option<UserId>,
    now: DateTime<Utc>,
    ledger: &dyn LedgerSink,
) -> Result<Applied, LedgerError> {
    let mut completed = withdrawal.clone();
    completed.complete(by, now)?;
    let applied = debit_withdrawal(&completed, ledger)?;
    *withdrawal = completed;
    Ok(applied)
}

/// Balance left to withdraw after reserving outstanding requests.
pub fn available_balance<'a>(
    balance: Money,
    user: &UserId,
    withdrawals: impl IntoIterator<Item = &'a Withdrawal>,
) -> Money {
    let reserved: Money = withdrawals
        .into_iter()
        .filter(|w| &w.user_id == user && w.status.is_outstanding())
        .map(|w| w.amount)
        .sum();
    balance - reserved
}

//! Ledger error type.

use syndic_core::SyndicError;
use syndic_distribution::SinkError;
use thiserror::Error;

use crate::withdrawal::WithdrawalError;

/// Errors from ledger workflows that combine a state change with a write.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The withdrawal rules refused the operation.
    #[error(transparent)]
    Withdrawal(#[from] WithdrawalError),

    /// The underlying sink failed.
    #[error(transparent)]
    Sink(#[from] SinkError),
}

impl From<LedgerError> for SyndicError {
    fn from(err: LedgerError) -> Self {
        SyndicError::Ledger(err.to_string())
    }
}

impl From<WithdrawalError> for SyndicError {
    fn from(err: WithdrawalError) -> Self {
        SyndicError::Ledger(err.to_string())
    }
}

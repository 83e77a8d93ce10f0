//! # Error Hierarchy
//!
//! Structured error types shared by the whole workspace, built with
//! `thiserror`. Subsystem crates define their own enums for domain failures
//! (configuration, distribution, ledger) and convert into [`SyndicError`]
//! where a single top-level type is convenient.

use thiserror::Error;

/// Top-level error type for the syndicate stack.
#[derive(Error, Debug)]
pub enum SyndicError {
    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration was rejected by a domain rule.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A computed distribution violated a post-condition.
    #[error("distribution error: {0}")]
    Distribution(String),

    /// Persistence-side failure reported by a ledger or store.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for domain primitives.
///
/// Each variant carries the rejected input so that operators can diagnose
/// a bad request or config file without guesswork.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Amount string is not a decimal number.
    #[error("invalid amount: \"{0}\" (expected a decimal number such as 1250.50)")]
    InvalidAmount(String),

    /// Percentage string is not a decimal number.
    #[error("invalid percentage: \"{0}\" (expected a decimal number between 0 and 100)")]
    InvalidPercentage(String),

    /// Role name is not one of owner, admin, client.
    #[error("unknown role: \"{0}\" (expected owner, admin, or client)")]
    InvalidRole(String),

    /// Identifier string is not a UUID.
    #[error("invalid {kind}: \"{value}\" (expected a UUID)")]
    InvalidIdentifier {
        /// Which identifier type was being parsed.
        kind: &'static str,
        /// The string that failed to parse.
        value: String,
    },
}

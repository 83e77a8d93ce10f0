//! # Idempotency Keys
//!
//! A profit-recording submission is identified by its account, its as-of
//! date, and its gross amount at currency precision. The key is the SHA-256
//! of those three fields, so a retried form submit produces the same key and
//! the persistence layer can detect the duplicate.
//!
//! Downstream writes (one balance credit per recipient, one growth-fund
//! credit) use [`IdempotencyKey::scoped`] to derive per-write keys from the
//! submission key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::AccountId;
use crate::money::Money;

/// Opaque idempotency key (lowercase hex, optionally with a `:scope` suffix).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Derive the key for a profit-recording submission.
    pub fn for_profit(account: &AccountId, as_of: NaiveDate, gross: Money) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(account.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(as_of.format("%Y-%m-%d").to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(gross.to_currency_string().as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wrap a key supplied by the caller or read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Derive a key for one downstream write of this submission.
    pub fn scoped(&self, scope: &str) -> Self {
        Self(format!("{}:{scope}", self.0))
    }

    /// Return the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

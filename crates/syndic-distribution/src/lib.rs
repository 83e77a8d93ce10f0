//! # syndic-distribution — Profit Distribution Engine
//!
//! Takes a gross profit figure and an account's stored distribution
//! configuration and deterministically computes who receives what.
//!
//! ## Pipeline
//!
//! ```text
//! StoredDistributionConfig (v1 legacy | v2)
//!   -> legacy::normalize          (one-time migration at write time)
//!   -> validation::validate_config -> NormalizedConfig
//!   -> engine::compute_distribution -> DistributionResult (exact amounts)
//!   -> DistributionResult::settle   -> SettledDistribution (2 dp)
//!   -> sinks::persist_distribution  (caller-side: ledger + growth fund)
//! ```
//!
//! ## Purity
//!
//! Validation and computation perform no I/O, read no clock, and hold no
//! shared mutable state. Identical inputs yield identical results. The only
//! collaborator consulted during computation is the read-only
//! [`UserDirectory`], and an unknown user degrades to a fallback label
//! rather than failing the distribution.
//!
//! Serializing concurrent recordings against the same account is the
//! caller's job (see `syndic-api`).

pub mod directory;
pub mod engine;
pub mod legacy;
pub mod model;
pub mod sinks;
pub mod validation;

pub use directory::{resolve_display_name, StaticDirectory, UserDirectory, UNKNOWN_USER_LABEL};
pub use engine::{compute_distribution, DistributionError, DistributionRequest, PoolFallback};
pub use legacy::{
    migrate, normalize, LegacyContributor, LegacyDistributionConfig, LegacyShare, NormalizeError,
    StoredDistributionConfig,
};
pub use model::{
    AccountDistributionConfig, ContributorRow, DistributionEntry, DistributionResult, EntrySource,
    ParticipantKind, ParticipantRow, Recipient, SettledDistribution,
};
pub use sinks::{
    persist_distribution, Applied, DistributionRecord, GrowthFundSink, LedgerSink, PersistOutcome,
    SinkError,
};
pub use validation::{validate_config, ConfigError, NormalizedConfig, ValidationReport};

use syndic_core::SyndicError;

impl From<ConfigError> for SyndicError {
    fn from(err: ConfigError) -> Self {
        SyndicError::Configuration(err.to_string())
    }
}

impl From<NormalizeError> for SyndicError {
    fn from(err: NormalizeError) -> Self {
        SyndicError::Configuration(err.to_string())
    }
}

impl From<DistributionError> for SyndicError {
    fn from(err: DistributionError) -> Self {
        SyndicError::Distribution(err.to_string())
    }
}

impl From<SinkError> for SyndicError {
    fn from(err: SinkError) -> Self {
        SyndicError::Ledger(err.to_string())
    }
}

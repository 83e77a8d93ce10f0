//! # Legacy Configuration Normalizer
//!
//! Older accounts store their tree as bare `{ name, percentage }` pairs,
//! with the Contributor Pool and Growth Fund identified only by their
//! display names. Stored configurations are tagged with a
//! `schema_version`; `v1` is that legacy shape and `v2` the current
//! [`AccountDistributionConfig`].
//!
//! Migration runs once, when a configuration is written. Normalizing a `v2`
//! configuration returns it unchanged, so running the normalizer over
//! already-migrated data is harmless.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use syndic_core::{Money, Percentage};
use thiserror::Error;

use crate::directory::{names_match, UserDirectory};
use crate::model::{
    AccountDistributionConfig, ContributorRow, ParticipantKind, ParticipantRow,
    CONTRIBUTOR_POOL_LABEL, GROWTH_FUND_LABEL,
};

/// Why a legacy configuration could not be normalized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// A legacy contributor name does not match exactly one registered user.
    #[error("contributor \"{0}\" does not match a registered user")]
    UnresolvedContributor(String),

    /// A legacy participant row has a blank name.
    #[error("participant row {index} has an empty name")]
    EmptyName {
        /// Zero-based row index.
        index: usize,
    },
}

/// A legacy participant row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyShare {
    /// Display name, or one of the sentinel names.
    pub name: String,
    /// Share of gross profit.
    pub percentage: Percentage,
    /// Optional descriptive role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A legacy contributor row, keyed by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyContributor {
    /// Contributor display name.
    pub name: String,
    /// Units purchased.
    pub units: Decimal,
    /// Price per unit.
    pub price_per_unit: Money,
}

/// The `v1` stored shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyDistributionConfig {
    /// Participant rows.
    pub participants: Vec<LegacyShare>,
    /// Contributor rows.
    #[serde(default)]
    pub contributors: Vec<LegacyContributor>,
    /// Separately entered growth-fund skim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_fund_percentage: Option<Percentage>,
}

/// A stored configuration of either schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema_version")]
pub enum StoredDistributionConfig {
    /// Legacy, name-keyed rows.
    #[serde(rename = "v1")]
    V1(LegacyDistributionConfig),
    /// Current schema.
    #[serde(rename = "v2")]
    V2(AccountDistributionConfig),
}

impl StoredDistributionConfig {
    /// Return the schema tag.
    pub fn schema_version(&self) -> &'static str {
        match self {
            Self::V1(_) => "v1",
            Self::V2(_) => "v2",
        }
    }
}

impl From<AccountDistributionConfig> for StoredDistributionConfig {
    fn from(config: AccountDistributionConfig) -> Self {
        Self::V2(config)
    }
}

/// Convert a stored configuration into the current schema.
pub fn normalize(
    stored: &StoredDistributionConfig,
    directory: &dyn UserDirectory,
) -> Result<AccountDistributionConfig, NormalizeError> {
    let legacy = match stored {
        StoredDistributionConfig::V2(config) => return Ok(config.clone()),
        StoredDistributionConfig::V1(legacy) => legacy,
    };

    let mut participants = Vec::with_capacity(legacy.participants.len());
    for (index, share) in legacy.participants.iter().enumerate() {
        let name = share.name.trim();
        if name.is_empty() {
            return Err(NormalizeError::EmptyName { index });
        }
        let recipient = if names_match(name, CONTRIBUTOR_POOL_LABEL) {
            ParticipantKind::ContributorPool
        } else if names_match(name, GROWTH_FUND_LABEL) {
            ParticipantKind::GrowthFund
        } else if let Some(user) = directory.find_by_name(name) {
            ParticipantKind::User(user)
        } else {
            tracing::info!(name, "legacy participant kept as manual payout");
            ParticipantKind::Manual(name.to_string())
        };
        let role = share.role.clone().unwrap_or_else(|| match recipient {
            ParticipantKind::ContributorPool => CONTRIBUTOR_POOL_LABEL.to_string(),
            ParticipantKind::GrowthFund => GROWTH_FUND_LABEL.to_string(),
            _ => String::new(),
        });
        participants.push(ParticipantRow::new(recipient, role, share.percentage));
    }

    let contributors = legacy
        .contributors
        .iter()
        .map(|c| {
            directory
                .find_by_name(&c.name)
                .map(|user| ContributorRow::new(user, c.units, c.price_per_unit))
                .ok_or_else(|| NormalizeError::UnresolvedContributor(c.name.clone()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut config = AccountDistributionConfig::new(participants, contributors);
    config.growth_fund_percentage = legacy.growth_fund_percentage;
    Ok(config)
}

/// Normalize and tag as the current schema version.
pub fn migrate(
    stored: &StoredDistributionConfig,
    directory: &dyn UserDirectory,
) -> Result<StoredDistributionConfig, NormalizeError> {
    let config = normalize(stored, directory)?;
    if matches!(stored, StoredDistributionConfig::V1(_)) {
        tracing::info!(
            participants = config.participants.len(),
            contributors = config.contributors.len(),
            "migrated legacy distribution configuration"
        );
    }
    Ok(StoredDistributionConfig::V2(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use rust_decimal_macros::dec;
    use syndic_core::UserId;

    fn share(name: &str, pct: Decimal) -> LegacyShare {
        LegacyShare {
            name: name.to_string(),
            percentage: Percentage::new(pct),
            role: None,
        }
    }

    fn legacy(alice: &str) -> StoredDistributionConfig {
        StoredDistributionConfig::V1(LegacyDistributionConfig {
            participants: vec![
                share("Olivia", dec!(70)),
                share(" contributor pool ", dec!(20)),
                share("GROWTH FUND", dec!(10)),
            ],
            contributors: vec![LegacyContributor {
                name: alice.to_string(),
                units: dec!(10),
                price_per_unit: Money::new(dec!(1000)),
            }],
            growth_fund_percentage: None,
        })
    }

    fn directory() -> (StaticDirectory, UserId, UserId) {
        let olivia = UserId::new();
        let alice = UserId::new();
        let dir = StaticDirectory::new()
            .with_user(olivia, "Olivia")
            .with_user(alice, "Alice");
        (dir, olivia, alice)
    }

    #[test]
    fn sentinel_names_become_variants() {
        let (dir, olivia, alice) = directory();
        let config = normalize(&legacy("Alice"), &dir).unwrap();
        let kinds: Vec<&ParticipantKind> = config.participants.iter().map(|r| &r.recipient).collect();
        assert_eq!(
            kinds,
            vec![
                &ParticipantKind::User(olivia),
                &ParticipantKind::ContributorPool,
                &ParticipantKind::GrowthFund
            ]
        );
        assert_eq!(config.contributors[0].user_id, alice);
        assert_eq!(config.contributor_pool_percentage, Percentage::new(dec!(20)));
    }

    #[test]
    fn unknown_participant_becomes_manual() {
        let dir = StaticDirectory::new();
        let stored = StoredDistributionConfig::V1(LegacyDistributionConfig {
            participants: vec![share("Desk Bonus", dec!(100))],
            contributors: vec![],
            growth_fund_percentage: None,
        });
        let config = normalize(&stored, &dir).unwrap();
        assert_eq!(
            config.participants[0].recipient,
            ParticipantKind::Manual("Desk Bonus".into())
        );
    }

    #[test]
    fn unresolved_contributor_is_an_error() {
        let (dir, _, _) = directory();
        assert_eq!(
            normalize(&legacy("Mallory"), &dir).unwrap_err(),
            NormalizeError::UnresolvedContributor("Mallory".into())
        );
    }

    #[test]
    fn blank_name_is_an_error() {
        let stored = StoredDistributionConfig::V1(LegacyDistributionConfig {
            participants: vec![share("  ", dec!(100))],
            contributors: vec![],
            growth_fund_percentage: None,
        });
        assert_eq!(
            normalize(&stored, &StaticDirectory::new()).unwrap_err(),
            NormalizeError::EmptyName { index: 0 }
        );
    }

    #[test]
    fn normalizing_migrated_config_is_identity() {
        let (dir, _, _) = directory();
        let stored = legacy("Alice");
        let once = normalize(&stored, &dir).unwrap();
        let migrated = migrate(&stored, &dir).unwrap();
        assert_eq!(migrated.schema_version(), "v2");
        assert_eq!(normalize(&migrated, &dir).unwrap(), once);
        assert_eq!(migrate(&migrated, &dir).unwrap(), migrated);
    }

    #[test]
    fn growth_fund_percentage_carries_over() {
        let stored = StoredDistributionConfig::V1(LegacyDistributionConfig {
            participants: vec![share("Desk", dec!(95))],
            contributors: vec![],
            growth_fund_percentage: Some(Percentage::new(dec!(5))),
        });
        let config = normalize(&stored, &StaticDirectory::new()).unwrap();
        assert_eq!(config.growth_fund_percentage, Some(Percentage::new(dec!(5))));
    }

    #[test]
    fn schema_version_tag_round_trips_through_json() {
        let json = serde_json::json!({
            "schema_version": "v1",
            "participants": [{"name": "Desk", "percentage": "100"}]
        });
        let stored: StoredDistributionConfig = serde_json::from_value(json).unwrap();
        assert_eq!(stored.schema_version(), "v1");

        let v2 = serde_json::to_value(StoredDistributionConfig::from(
            AccountDistributionConfig::new(vec![], vec![]),
        ))
        .unwrap();
        assert_eq!(v2["schema_version"], "v2");
    }
}

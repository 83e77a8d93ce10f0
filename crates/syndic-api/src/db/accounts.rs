//! Account persistence operations on the `accounts` table.
//!
//! Only the current (`v2`) configuration schema is ever written; legacy
//! bodies are migrated before they reach this module.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syndic_core::AccountId;
use syndic_distribution::AccountDistributionConfig;
use uuid::Uuid;

use super::{decode_error, encode_error};
use crate::state::AccountRecord;

/// Insert a new account.
pub async fn insert(pool: &PgPool, record: &AccountRecord) -> Result<(), sqlx::Error> {
    let distribution = record
        .distribution
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(encode_error)?;

    sqlx::query(
        "INSERT INTO accounts (id, name, distribution, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(record.id.as_uuid())
    .bind(&record.name)
    .bind(distribution)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace an account's distribution configuration.
pub async fn update_distribution(
    pool: &PgPool,
    id: AccountId,
    config: &AccountDistributionConfig,
    updated_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let config = serde_json::to_value(config).map_err(encode_error)?;

    let result = sqlx::query(
        "UPDATE accounts SET distribution = $1, updated_at = $2 WHERE id = $3",
    )
    .bind(&config)
    .bind(updated_at)
    .bind(id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all accounts on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<AccountRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, AccountRow>(
        "SELECT id, name, distribution, created_at, updated_at
         FROM accounts ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(AccountRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: Uuid,
    name: String,
    distribution: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_record(self) -> Result<AccountRecord, sqlx::Error> {
        let distribution = self
            .distribution
            .map(serde_json::from_value::<AccountDistributionConfig>)
            .transpose()
            .map_err(decode_error)?;
        Ok(AccountRecord {
            id: AccountId::from_uuid(self.id),
            name: self.name,
            distribution,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

//! Distribution record persistence on the `distributions` table.
//!
//! Records are append-only. The unique `idempotency_key` column makes a
//! repeated insert of the same submission a no-op.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use syndic_core::{AccountId, DistributionId, IdempotencyKey, Money, UserId};
use syndic_distribution::{DistributionEntry, DistributionRecord};
use uuid::Uuid;

use super::{decode_error, encode_error};

/// Insert a record. Returns `false` when the idempotency key already exists.
pub async fn insert(pool: &PgPool, record: &DistributionRecord) -> Result<bool, sqlx::Error> {
    let entries = serde_json::to_value(&record.entries).map_err(encode_error)?;

    let result = sqlx::query(
        "INSERT INTO distributions
             (id, account_id, as_of, gross_profit, undistributed, entries,
              idempotency_key, recorded_by, recorded_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
         ON CONFLICT (idempotency_key) DO NOTHING",
    )
    .bind(record.id.as_uuid())
    .bind(record.account_id.as_uuid())
    .bind(record.as_of)
    .bind(record.gross_profit.to_string())
    .bind(record.undistributed.to_string())
    .bind(&entries)
    .bind(record.idempotency_key.as_str())
    .bind(record.recorded_by.map(|u| *u.as_uuid()))
    .bind(record.recorded_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every record in recording order, for ledger replay on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<DistributionRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DistributionRow>(
        "SELECT id, account_id, as_of, gross_profit, undistributed, entries,
                idempotency_key, recorded_by, recorded_at
         FROM distributions ORDER BY recorded_at, id",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(DistributionRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct DistributionRow {
    id: Uuid,
    account_id: Uuid,
    as_of: NaiveDate,
    gross_profit: String,
    undistributed: String,
    entries: serde_json::Value,
    idempotency_key: String,
    recorded_by: Option<Uuid>,
    recorded_at: DateTime<Utc>,
}

impl DistributionRow {
    fn into_record(self) -> Result<DistributionRecord, sqlx::Error> {
        let entries: Vec<DistributionEntry> =
            serde_json::from_value(self.entries).map_err(decode_error)?;
        Ok(DistributionRecord {
            id: DistributionId::from_uuid(self.id),
            account_id: AccountId::from_uuid(self.account_id),
            as_of: self.as_of,
            gross_profit: Money::parse(&self.gross_profit).map_err(decode_error)?,
            entries,
            undistributed: Money::parse(&self.undistributed).map_err(decode_error)?,
            idempotency_key: IdempotencyKey::from_raw(self.idempotency_key),
            recorded_by: self.recorded_by.map(UserId::from_uuid),
            recorded_at: self.recorded_at,
        })
    }
}

//! Withdrawal persistence on the `withdrawals` table.
//!
//! Transition rules are enforced by `syndic_ledger::Withdrawal`, not in SQL.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syndic_core::{Money, UserId, WithdrawalId};
use syndic_ledger::{Withdrawal, WithdrawalStatus};
use uuid::Uuid;

use super::decode_error;

/// Insert a new withdrawal request.
pub async fn insert(pool: &PgPool, w: &Withdrawal) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO withdrawals
             (id, user_id, amount, status, decided_by, reason, requested_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(w.id.as_uuid())
    .bind(w.user_id.as_uuid())
    .bind(w.amount.to_string())
    .bind(w.status.as_str())
    .bind(w.decided_by.map(|u| *u.as_uuid()))
    .bind(&w.reason)
    .bind(w.requested_at)
    .bind(w.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist a state transition.
pub async fn update(pool: &PgPool, w: &Withdrawal) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE withdrawals SET status = $1, decided_by = $2, reason = $3, updated_at = $4
         WHERE id = $5",
    )
    .bind(w.status.as_str())
    .bind(w.decided_by.map(|u| *u.as_uuid()))
    .bind(&w.reason)
    .bind(w.updated_at)
    .bind(w.id.as_uuid())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all withdrawals on startup, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Withdrawal>, sqlx::Error> {
    let rows = sqlx::query_as::<_, WithdrawalRow>(
        "SELECT id, user_id, amount, status, decided_by, reason, requested_at, updated_at
         FROM withdrawals ORDER BY requested_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(WithdrawalRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct WithdrawalRow {
    id: Uuid,
    user_id: Uuid,
    amount: String,
    status: String,
    decided_by: Option<Uuid>,
    reason: Option<String>,
    requested_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WithdrawalRow {
    fn into_record(self) -> Result<Withdrawal, sqlx::Error> {
        let status: WithdrawalStatus = self.status.parse().map_err(decode_error)?;
        Ok(Withdrawal {
            id: WithdrawalId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            amount: Money::parse(&self.amount).map_err(decode_error)?,
            status,
            decided_by: self.decided_by.map(UserId::from_uuid),
            reason: self.reason,
            requested_at: self.requested_at,
            updated_at: self.updated_at,
        })
    }
}

//! User persistence operations on the `users` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use syndic_core::{Role, UserId};
use uuid::Uuid;

use super::decode_error;
use crate::state::UserRecord;

/// Insert a new user.
pub async fn insert(pool: &PgPool, record: &UserRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, display_name, role, created_at)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(record.id.as_uuid())
    .bind(&record.display_name)
    .bind(record.role.as_str())
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Load all users on startup.
pub async fn load_all(pool: &PgPool) -> Result<Vec<UserRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, display_name, role, created_at FROM users ORDER BY created_at",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(UserRow::into_record).collect()
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    display_name: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, sqlx::Error> {
        let role: Role = self.role.parse().map_err(decode_error)?;
        Ok(UserRecord {
            id: UserId::from_uuid(self.id),
            display_name: self.display_name,
            role,
            created_at: self.created_at,
        })
    }
}

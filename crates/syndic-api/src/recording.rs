//! # Profit Recording Workflow
//!
//! Turns an admin's "record profit" request into persisted balances:
//!
//! ```text
//! lock account -> replay check -> validate -> compute -> settle
//!              -> write-through to Postgres -> ledger + growth fund
//! ```
//!
//! Recording is serialized per account, and the configuration is re-read
//! under the lock, so a concurrent edit can never be half-applied. A
//! submission whose idempotency key is already recorded returns the
//! original record instead of distributing twice.

use chrono::{NaiveDate, Utc};
use syndic_core::{AccountId, Money, OperationContext};
use syndic_distribution::{
    compute_distribution, persist_distribution, validate_config, DistributionRecord,
    DistributionRequest,
};

use crate::error::AppError;
use crate::state::AppState;

/// Result of [`record_profit`].
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    /// The stored record (the original one on replay).
    pub record: DistributionRecord,
    /// Whether this submission had already been recorded.
    pub replayed: bool,
}

/// Record one profit event on an account.
pub async fn record_profit(
    state: &AppState,
    account_id: AccountId,
    gross_profit: Money,
    as_of: NaiveDate,
    ctx: &OperationContext,
) -> Result<RecordOutcome, AppError> {
    let _guard = state.account_locks.lock(account_id).await;

    let account = state
        .accounts
        .get(&account_id)
        .ok_or_else(|| AppError::NotFound(format!("account {account_id} not found")))?;
    let config = account.distribution.ok_or_else(|| {
        AppError::Conflict(format!(
            "account {account_id} has no distribution configuration"
        ))
    })?;

    let request = DistributionRequest::new(account_id, gross_profit, as_of)
        .with_pool_fallback(state.config.pool_fallback);
    let key = request.idempotency_key();

    if let Some(existing) = state.ledger.record_by_key(&key) {
        // Re-run the sink writes so a recording interrupted between the
        // record and its credits completes now.
        persist_distribution(&existing, state.ledger.as_ref(), state.growth_fund.as_ref())?;
        tracing::info!(
            account_id = %account_id,
            distribution_id = %existing.id,
            correlation_id = %ctx.correlation_id,
            "duplicate profit submission, returning original record"
        );
        return Ok(RecordOutcome {
            record: existing,
            replayed: true,
        });
    }

    let normalized = validate_config(&config, ctx)?;
    let result = compute_distribution(&normalized, &request, &state.users, ctx)?;
    let settled = result.settle()?;
    let record = DistributionRecord::from_settled(&result, settled, ctx.caller.user_id, Utc::now());

    // Persist before touching balances: the database row is what startup
    // replays, so balances must never get ahead of it.
    if let Some(pool) = &state.db_pool {
        crate::db::distributions::insert(pool, &record)
            .await
            .map_err(|e| AppError::database("failed to persist distribution", e))?;
    }

    let outcome = persist_distribution(&record, state.ledger.as_ref(), state.growth_fund.as_ref())?;

    tracing::info!(
        account_id = %account_id,
        distribution_id = %record.id,
        gross_profit = %record.gross_profit,
        entries = record.entries.len(),
        undistributed = %record.undistributed,
        balances_applied = outcome.balances_applied,
        correlation_id = %ctx.correlation_id,
        "profit recorded"
    );

    Ok(RecordOutcome {
        record,
        replayed: false,
    })
}

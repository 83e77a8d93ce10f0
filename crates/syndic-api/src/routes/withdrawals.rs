//! # Withdrawals API
//!
//! Clients request withdrawals against their own available balance; admins
//! approve, reject, and complete them. Completion debits the balance ledger
//! exactly once (the debit is keyed by the withdrawal id), and only after
//! the `Completed` state has been written to the database.
//!
//! All requests and transitions for one user run under that user's lock, so
//! two concurrent requests cannot both reserve the same balance.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use syndic_core::{Money, Role, UserId, WithdrawalId};
use syndic_ledger::{available_balance, debit_withdrawal, Withdrawal, WithdrawalStatus};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{
    check_positive, extract_optional_json, extract_validated_json, Validate,
};
use crate::state::AppState;

// -- DTOs ---------------------------------------------------------------------

/// Request to withdraw funds.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWithdrawalRequest {
    /// Amount as a decimal string. Rounded to cents.
    #[schema(value_type = String, example = "250.00")]
    pub amount: Money,
    /// Whose balance to withdraw from. Defaults to the caller; only admins
    /// may name another user.
    #[serde(default)]
    pub user_id: Option<Uuid>,
}

impl Validate for CreateWithdrawalRequest {
    fn validate(&self) -> Result<(), String> {
        check_positive("amount", self.amount)
    }
}

/// Optional reason when rejecting.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RejectWithdrawalRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// List filter.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WithdrawalFilter {
    /// Only withdrawals in this status.
    pub status: Option<String>,
}

/// A withdrawal as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WithdrawalView {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "250.00")]
    pub amount: String,
    /// `pending`, `approved`, `completed`, or `rejected`.
    pub status: String,
    pub decided_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalView {
    fn from(w: Withdrawal) -> Self {
        Self {
            id: *w.id.as_uuid(),
            user_id: *w.user_id.as_uuid(),
            amount: w.amount.to_currency_string(),
            status: w.status.as_str().to_string(),
            decided_by: w.decided_by.map(|u| *u.as_uuid()),
            reason: w.reason,
            requested_at: w.requested_at,
            updated_at: w.updated_at,
        }
    }
}

// -- Router -------------------------------------------------------------------

/// Build the withdrawals router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/withdrawals", get(list_withdrawals).post(request_withdrawal))
        .route("/v1/withdrawals/:id/approve", post(approve_withdrawal))
        .route("/v1/withdrawals/:id/reject", post(reject_withdrawal))
        .route("/v1/withdrawals/:id/complete", post(finish_withdrawal))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/withdrawals — Request a withdrawal.
#[utoipa::path(
    post,
    path = "/v1/withdrawals",
    request_body = CreateWithdrawalRequest,
    responses(
        (status = 201, description = "Withdrawal requested", body = WithdrawalView),
        (status = 403, description = "Not the caller's balance", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid amount or insufficient balance", body = crate::error::ErrorBody),
    ),
    tag = "withdrawals"
)]
pub(crate) async fn request_withdrawal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateWithdrawalRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<WithdrawalView>), AppError> {
    let req = extract_validated_json(body)?;
    let user_id = req
        .user_id
        .map(UserId::from_uuid)
        .or(caller.user_id)
        .ok_or_else(|| {
            AppError::Validation("user_id is required for callers without a user".into())
        })?;
    if !caller.can_access_user(&user_id) {
        return Err(AppError::Forbidden(
            "clients may only withdraw from their own balance".into(),
        ));
    }
    if state.users.get(&user_id).is_none() {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }

    let _guard = state.user_locks.lock(user_id).await;
    let available = available_balance(
        state.ledger.balance(&user_id),
        &user_id,
        &state.withdrawals_for(&user_id),
    );
    let withdrawal = Withdrawal::request(user_id, req.amount, available, Utc::now())?;

    if let Some(pool) = &state.db_pool {
        crate::db::withdrawals::insert(pool, &withdrawal)
            .await
            .map_err(|e| AppError::database("failed to persist withdrawal", e))?;
    }
    state.withdrawals.insert(withdrawal.id, withdrawal.clone());

    tracing::info!(
        withdrawal_id = %withdrawal.id,
        user_id = %user_id,
        amount = %withdrawal.amount,
        "withdrawal requested"
    );
    Ok((StatusCode::CREATED, Json(withdrawal.into())))
}

/// GET /v1/withdrawals — List withdrawals, oldest first.
///
/// Clients see their own; admins see everyone's.
#[utoipa::path(
    get,
    path = "/v1/withdrawals",
    params(WithdrawalFilter),
    responses(
        (status = 200, description = "Withdrawals", body = Vec<WithdrawalView>),
        (status = 422, description = "Unknown status filter", body = crate::error::ErrorBody),
    ),
    tag = "withdrawals"
)]
pub(crate) async fn list_withdrawals(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Query(filter): Query<WithdrawalFilter>,
) -> Result<Json<Vec<WithdrawalView>>, AppError> {
    let status = filter
        .status
        .as_deref()
        .map(str::parse::<WithdrawalStatus>)
        .transpose()?;

    let mut withdrawals = if caller.has_role(Role::Admin) {
        state.withdrawals.list()
    } else {
        match caller.user_id {
            Some(user) => state.withdrawals_for(&user),
            None => Vec::new(),
        }
    };
    if let Some(status) = status {
        withdrawals.retain(|w| w.status == status);
    }
    withdrawals.sort_by_key(|w| w.requested_at);
    Ok(Json(withdrawals.into_iter().map(WithdrawalView::from).collect()))
}

/// Apply an admin transition to a withdrawal under its user's lock.
///
/// The transition runs on a copy; the store is only updated once the
/// database write (if any) succeeded. `persisted` then runs on the stored
/// state, still under the lock.
async fn transition(
    state: &AppState,
    id: WithdrawalId,
    apply: impl FnOnce(&mut Withdrawal) -> Result<(), AppError>,
    persisted: impl FnOnce(&Withdrawal) -> Result<(), AppError>,
) -> Result<Withdrawal, AppError> {
    let user_id = state
        .withdrawals
        .get(&id)
        .map(|w| w.user_id)
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id} not found")))?;

    let _guard = state.user_locks.lock(user_id).await;
    let mut withdrawal = state
        .withdrawals
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("withdrawal {id} not found")))?;
    apply(&mut withdrawal)?;

    if let Some(pool) = &state.db_pool {
        crate::db::withdrawals::update(pool, &withdrawal)
            .await
            .map_err(|e| AppError::database("failed to persist withdrawal transition", e))?;
    }
    state.withdrawals.insert(id, withdrawal.clone());
    persisted(&withdrawal)?;
    Ok(withdrawal)
}

/// POST /v1/withdrawals/:id/approve — Approve a pending withdrawal.
#[utoipa::path(
    post,
    path = "/v1/withdrawals/{id}/approve",
    params(("id" = Uuid, Path, description = "Withdrawal ID")),
    responses(
        (status = 200, description = "Approved", body = WithdrawalView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "withdrawals"
)]
pub(crate) async fn approve_withdrawal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<WithdrawalView>, AppError> {
    require_role(&caller, Role::Admin)?;
    let withdrawal = transition(
        &state,
        WithdrawalId::from_uuid(id),
        |w| Ok(w.approve(caller.user_id, Utc::now())?),
        |_| Ok(()),
    )
    .await?;
    Ok(Json(withdrawal.into()))
}

/// POST /v1/withdrawals/:id/reject — Reject a pending or approved withdrawal.
#[utoipa::path(
    post,
    path = "/v1/withdrawals/{id}/reject",
    params(("id" = Uuid, Path, description = "Withdrawal ID")),
    request_body = RejectWithdrawalRequest,
    responses(
        (status = 200, description = "Rejected", body = WithdrawalView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "withdrawals"
)]
pub(crate) async fn reject_withdrawal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RejectWithdrawalRequest>, JsonRejection>,
) -> Result<Json<WithdrawalView>, AppError> {
    require_role(&caller, Role::Admin)?;
    let reason = extract_optional_json(body)?.reason;
    let withdrawal = transition(
        &state,
        WithdrawalId::from_uuid(id),
        |w| Ok(w.reject(caller.user_id, reason, Utc::now())?),
        |_| Ok(()),
    )
    .await?;
    Ok(Json(withdrawal.into()))
}

/// POST /v1/withdrawals/:id/complete — Mark an approved withdrawal as paid
/// out and debit the user's balance.
#[utoipa::path(
    post,
    path = "/v1/withdrawals/{id}/complete",
    params(("id" = Uuid, Path, description = "Withdrawal ID")),
    responses(
        (status = 200, description = "Completed", body = WithdrawalView),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
        (status = 409, description = "Invalid transition", body = crate::error::ErrorBody),
    ),
    tag = "withdrawals"
)]
pub(crate) async fn finish_withdrawal(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<WithdrawalView>, AppError> {
    require_role(&caller, Role::Admin)?;
    let ledger = state.ledger.clone();
    // Hydration replays the same keyed debit for every stored completion,
    // so a debit failure here is repaired on restart.
    let withdrawal = transition(
        &state,
        WithdrawalId::from_uuid(id),
        |w| Ok(w.complete(caller.user_id, Utc::now())?),
        |w| {
            debit_withdrawal(w, ledger.as_ref()).map_err(|e| {
                tracing::error!(withdrawal_id = %w.id, error = %e, "completed withdrawal not debited");
                AppError::from(e)
            })?;
            Ok(())
        },
    )
    .await?;
    tracing::info!(
        withdrawal_id = %withdrawal.id,
        user_id = %withdrawal.user_id,
        amount = %withdrawal.amount,
        "withdrawal completed"
    );
    Ok(Json(withdrawal.into()))
}

//! # Balances API
//!
//! A user's balance is the sum of their distribution credits minus their
//! completed withdrawals. `available` additionally reserves withdrawals
//! that are still pending or approved.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use syndic_core::{Money, Role, UserId};
use syndic_ledger::available_balance;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::state::AppState;

/// One user's balance.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    #[schema(value_type = String, format = Uuid)]
    pub user_id: UserId,
    /// Credits minus completed withdrawals.
    #[schema(value_type = String, example = "700.00")]
    pub balance: Money,
    /// Balance minus pending and approved withdrawals.
    #[schema(value_type = String, example = "650.00")]
    pub available: Money,
}

/// Build the balances router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/balances", get(list_balances))
        .route("/v1/balances/:user_id", get(get_balance))
}

fn balance_of(state: &AppState, user_id: UserId) -> BalanceResponse {
    let balance = state.ledger.balance(&user_id);
    let withdrawals = state.withdrawals_for(&user_id);
    BalanceResponse {
        user_id,
        balance,
        available: available_balance(balance, &user_id, &withdrawals),
    }
}

/// GET /v1/balances/:user_id — A user's balance.
///
/// Clients may only read their own balance.
#[utoipa::path(
    get,
    path = "/v1/balances/{user_id}",
    params(("user_id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Balance", body = BalanceResponse),
        (status = 403, description = "Not the caller's balance", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown user", body = crate::error::ErrorBody),
    ),
    tag = "balances"
)]
pub(crate) async fn get_balance(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(user_id): Path<Uuid>,
) -> Result<Json<BalanceResponse>, AppError> {
    let user_id = UserId::from_uuid(user_id);
    if !caller.can_access_user(&user_id) {
        return Err(AppError::Forbidden(
            "clients may only read their own balance".into(),
        ));
    }
    if state.users.get(&user_id).is_none() {
        return Err(AppError::NotFound(format!("user {user_id} not found")));
    }
    Ok(Json(balance_of(&state, user_id)))
}

/// GET /v1/balances — Every non-zero balance.
#[utoipa::path(
    get,
    path = "/v1/balances",
    responses(
        (status = 200, description = "Non-zero balances", body = Vec<BalanceResponse>),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "balances"
)]
pub(crate) async fn list_balances(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<BalanceResponse>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let balances = state
        .ledger
        .balances()
        .into_iter()
        .map(|(user_id, _)| balance_of(&state, user_id))
        .collect();
    Ok(Json(balances))
}

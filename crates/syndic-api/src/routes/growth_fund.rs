//! # Growth Fund API
//!
//! Read-only view of the growth-fund ledger: the fund total, a per-account
//! breakdown, and the individual inflows.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use syndic_core::{Money, Role};
use syndic_ledger::{AccountGrowth, GrowthFundInflow};
use utoipa::ToSchema;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::state::AppState;

/// Growth-fund summary.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GrowthFundResponse {
    /// Sum of all inflows.
    #[schema(value_type = String, example = "100.00")]
    pub total: Money,
    /// Per-account totals, ordered by account id.
    #[schema(value_type = Vec<Object>)]
    pub accounts: Vec<AccountGrowth>,
    /// Every inflow in arrival order.
    #[schema(value_type = Vec<Object>)]
    pub inflows: Vec<GrowthFundInflow>,
}

/// Build the growth-fund router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/growth-fund", get(get_growth_fund))
}

/// GET /v1/growth-fund — Growth-fund summary.
#[utoipa::path(
    get,
    path = "/v1/growth-fund",
    responses(
        (status = 200, description = "Growth-fund summary", body = GrowthFundResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "growth-fund"
)]
pub(crate) async fn get_growth_fund(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<GrowthFundResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let summary = state.growth_fund.summary();
    Ok(Json(GrowthFundResponse {
        total: summary.total,
        accounts: summary.accounts,
        inflows: state.growth_fund.inflows(),
    }))
}

//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the Bearer token security scheme to the document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "`{role}:{user_id}:{secret}` or a bare `{secret}`. \
                             The secret is set via the AUTH_TOKEN env var.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI document for the whole API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Syndic API",
        version = "0.3.2",
        description = "Profit distribution for a trading syndicate.\n\nRecords profits per trading account and splits them among participants, a proportional contributor pool, and a growth fund. Credits user balances, tracks the growth fund, and manages client withdrawals.\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header. All `/v1/*` endpoints require authentication when AUTH_TOKEN is set. Health probes (`/health/*`) are unauthenticated.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // -- Users ------------------------------------------------------------
        crate::routes::users::create_user,
        crate::routes::users::list_users,
        // -- Accounts & distribution -----------------------------------------
        crate::routes::accounts::create_account,
        crate::routes::accounts::list_accounts,
        crate::routes::accounts::get_account,
        crate::routes::accounts::put_distribution,
        crate::routes::accounts::validate_distribution,
        crate::routes::accounts::record_profit,
        crate::routes::accounts::list_distributions,
        // -- Balances ---------------------------------------------------------
        crate::routes::balances::get_balance,
        crate::routes::balances::list_balances,
        // -- Growth fund ------------------------------------------------------
        crate::routes::growth_fund::get_growth_fund,
        // -- Withdrawals ------------------------------------------------------
        crate::routes::withdrawals::request_withdrawal,
        crate::routes::withdrawals::list_withdrawals,
        crate::routes::withdrawals::approve_withdrawal,
        crate::routes::withdrawals::reject_withdrawal,
        crate::routes::withdrawals::finish_withdrawal,
    ),
    components(
        schemas(
            crate::state::UserRecord,
            crate::state::AccountRecord,
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::routes::users::CreateUserRequest,
            crate::routes::accounts::CreateAccountRequest,
            crate::routes::accounts::DistributionConfigBody,
            crate::routes::accounts::ValidationResponse,
            crate::routes::accounts::RecordProfitRequest,
            crate::routes::accounts::RecordProfitResponse,
            crate::routes::accounts::DistributionsResponse,
            crate::routes::balances::BalanceResponse,
            crate::routes::growth_fund::GrowthFundResponse,
            crate::routes::withdrawals::CreateWithdrawalRequest,
            crate::routes::withdrawals::RejectWithdrawalRequest,
            crate::routes::withdrawals::WithdrawalView,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "User directory"),
        (name = "accounts", description = "Accounts, distribution configuration, and profit recording"),
        (name = "balances", description = "User balances"),
        (name = "growth-fund", description = "Growth-fund ledger"),
        (name = "withdrawals", description = "Client withdrawals"),
    )
)]
pub struct ApiDoc;

/// Router serving the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

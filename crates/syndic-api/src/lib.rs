//! # syndic-api — Axum API Service for the Syndicate Stack
//!
//! ## API Surface
//!
//! | Prefix                              | Module                    | Domain                 |
//! |-------------------------------------|---------------------------|------------------------|
//! | `/v1/users`                         | [`routes::users`]         | User directory         |
//! | `/v1/accounts/*`                    | [`routes::accounts`]      | Accounts & configuration |
//! | `/v1/accounts/:id/profits`          | [`routes::accounts`]      | Profit recording       |
//! | `/v1/balances/*`                    | [`routes::balances`]      | Balances               |
//! | `/v1/growth-fund`                   | [`routes::growth_fund`]   | Growth fund            |
//! | `/v1/withdrawals/*`                 | [`routes::withdrawals`]   | Withdrawals            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer -> AuthMiddleware -> Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod recording;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware so
/// they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };

    let api = Router::new()
        .merge(routes::users::router())
        .merge(routes::accounts::router())
        .merge(routes::balances::router())
        .merge(routes::growth_fund::router())
        .merge(routes::withdrawals::router())
        .merge(openapi::router())
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(from_fn(auth::auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .with_state(state);

    Router::new().merge(unauthenticated).merge(api)
}

/// Liveness probe: the process is up.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe.
///
/// Checks that the in-memory stores are accessible and, when configured,
/// that the database answers. Returns 200 "ready" or 503.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let _ = state.users.len();
    let _ = state.accounts.len();
    let _ = state.ledger.record_count();

    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!("Database health check failed: {e}");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unreachable").into_response();
        }
    }

    (StatusCode::OK, "ready").into_response()
}

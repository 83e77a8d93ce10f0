//! # User Directory API
//!
//! Admin-managed directory of dashboard users. Display names are resolved
//! from here when distributions are computed, and legacy configurations
//! match participant names against it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use syndic_core::{Role, UserId};
use syndic_distribution::UserDirectory;
use utoipa::ToSchema;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{check_name, extract_validated_json, Validate};
use crate::state::{AppState, UserRecord};

/// Request to register a user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Name shown on distribution entries. Must be unique (case-insensitive).
    pub display_name: String,
    /// One of `owner`, `admin`, `client`. Defaults to `client`.
    #[serde(default)]
    pub role: Option<String>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("display_name", &self.display_name)
    }
}

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/users", get(list_users).post(create_user))
}

/// POST /v1/users — Register a user.
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User registered", body = UserRecord),
        (status = 409, description = "Display name already taken", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn create_user(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let role = match req.role.as_deref() {
        Some(r) => r.parse::<Role>()?,
        None => Role::Client,
    };
    // Only an owner may mint another owner.
    if role > caller.role {
        return Err(AppError::Forbidden(format!(
            "cannot create a user with role '{}' as '{}'",
            role.as_str(),
            caller.role.as_str()
        )));
    }

    let display_name = req.display_name.trim().to_string();
    // Names must stay unique or legacy name resolution becomes ambiguous.
    if state.users.find_by_name(&display_name).is_some() {
        return Err(AppError::Conflict(format!(
            "display name '{display_name}' is already taken"
        )));
    }

    let record = UserRecord {
        id: UserId::new(),
        display_name,
        role,
        created_at: Utc::now(),
    };

    if let Some(pool) = &state.db_pool {
        crate::db::users::insert(pool, &record)
            .await
            .map_err(|e| AppError::database("failed to persist user", e))?;
    }
    state.users.insert(record.id, record.clone());

    tracing::info!(user_id = %record.id, role = %record.role, "user registered");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/users — List users, sorted by display name.
#[utoipa::path(
    get,
    path = "/v1/users",
    responses(
        (status = 200, description = "All users", body = Vec<UserRecord>),
        (status = 403, description = "Admin role required", body = crate::error::ErrorBody),
    ),
    tag = "users"
)]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut users = state.users.list();
    users.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    Ok(Json(users))
}

//! # Accounts, Distribution Configuration & Profit Recording
//!
//! Accounts own a distribution configuration. Configurations arrive tagged
//! with their `schema_version`; legacy (`v1`) bodies are migrated to the
//! current schema against the user directory before validation, and only
//! the validated `v2` form is ever stored.
//!
//! Profit recording delegates to [`crate::recording::record_profit`].

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use syndic_core::{AccountId, Money, Percentage, Role};
use syndic_distribution::{
    migrate, validate_config, DistributionRecord, StoredDistributionConfig, ValidationReport,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CallerIdentity};
use crate::error::AppError;
use crate::extractors::{
    check_name, check_positive, extract_json, extract_validated_json, Validate,
};
use crate::state::{AccountRecord, AppState};

// -- Request / Response DTOs --------------------------------------------------

/// Request to create an account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    pub name: String,
}

impl Validate for CreateAccountRequest {
    fn validate(&self) -> Result<(), String> {
        check_name("name", &self.name)
    }
}

/// A distribution configuration in any supported schema version.
///
/// The body is an object tagged with `"schema_version": "v1"` (legacy,
/// name-based shares) or `"v2"` (current, typed recipients).
#[derive(Debug, Deserialize, ToSchema)]
pub struct DistributionConfigBody(#[schema(value_type = Object)] pub StoredDistributionConfig);

/// Live validation feedback for a configuration editor.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    /// Whether the configuration would be accepted.
    pub valid: bool,
    /// Row percentages plus the implicit growth-fund share.
    #[schema(value_type = String, example = "95")]
    pub percentage_total: Percentage,
    /// `100 - percentage_total`.
    #[schema(example = "5")]
    pub delta: String,
    /// The first failing rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Schema version of the submitted body.
    pub schema_version: String,
}

impl ValidationResponse {
    fn from_report(report: ValidationReport, schema_version: &str) -> Self {
        Self {
            valid: report.valid,
            percentage_total: report.percentage_total,
            delta: report.delta.to_string(),
            error: report.error,
            schema_version: schema_version.to_string(),
        }
    }
}

/// Request to record a profit event.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordProfitRequest {
    /// Gross profit as a decimal string.
    #[schema(value_type = String, example = "1000.00")]
    pub gross_profit: Money,
    /// Recording date. Defaults to today (UTC).
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

impl Validate for RecordProfitRequest {
    fn validate(&self) -> Result<(), String> {
        check_positive("gross_profit", self.gross_profit)
    }
}

/// Outcome of a profit recording.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordProfitResponse {
    /// `true` when the same submission had already been recorded; the
    /// original record is returned and nothing was distributed again.
    pub replayed: bool,
    /// The distribution record with settled (2 dp) amounts.
    #[schema(value_type = Object)]
    pub record: DistributionRecord,
}

/// Distributions recorded on one account.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DistributionsResponse {
    #[schema(value_type = String, format = Uuid)]
    pub account_id: AccountId,
    #[schema(value_type = Vec<Object>)]
    pub records: Vec<DistributionRecord>,
}

// -- Router -------------------------------------------------------------------

/// Build the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/accounts", get(list_accounts).post(create_account))
        .route("/v1/accounts/:id", get(get_account))
        .route("/v1/accounts/:id/distribution", put(put_distribution))
        .route(
            "/v1/accounts/:id/distribution/validate",
            post(validate_distribution),
        )
        .route("/v1/accounts/:id/profits", post(record_profit))
        .route("/v1/accounts/:id/distributions", get(list_distributions))
}

fn find_account(state: &AppState, id: AccountId) -> Result<AccountRecord, AppError> {
    state
        .accounts
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("account {id} not found")))
}

// -- Handlers -----------------------------------------------------------------

/// POST /v1/accounts — Create an account without a configuration.
#[utoipa::path(
    post,
    path = "/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account created", body = AccountRecord),
        (status = 422, description = "Invalid request", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn create_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountRecord>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let now = Utc::now();
    let record = AccountRecord {
        id: AccountId::new(),
        name: req.name.trim().to_string(),
        distribution: None,
        created_at: now,
        updated_at: now,
    };

    if let Some(pool) = &state.db_pool {
        crate::db::accounts::insert(pool, &record)
            .await
            .map_err(|e| AppError::database("failed to persist account", e))?;
    }
    state.accounts.insert(record.id, record.clone());

    tracing::info!(account_id = %record.id, "account created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /v1/accounts — List accounts, oldest first.
#[utoipa::path(
    get,
    path = "/v1/accounts",
    responses(
        (status = 200, description = "All accounts", body = Vec<AccountRecord>),
    ),
    tag = "accounts"
)]
pub(crate) async fn list_accounts(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<AccountRecord>>, AppError> {
    require_role(&caller, Role::Admin)?;
    let mut accounts = state.accounts.list();
    accounts.sort_by_key(|a| a.created_at);
    Ok(Json(accounts))
}

/// GET /v1/accounts/:id — Get an account and its configuration.
#[utoipa::path(
    get,
    path = "/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountRecord),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn get_account(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    find_account(&state, AccountId::from_uuid(id)).map(Json)
}

/// PUT /v1/accounts/:id/distribution — Replace the distribution configuration.
///
/// Legacy bodies are migrated first. The configuration is validated and
/// stored in normalized form (implicit growth-fund share turned into an
/// explicit row, pool percentage derived from the pool row). Rejections
/// return 422 `CONFIG_REJECTED` with the failing rule in `details`.
#[utoipa::path(
    put,
    path = "/v1/accounts/{id}/distribution",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = DistributionConfigBody,
    responses(
        (status = 200, description = "Configuration saved", body = AccountRecord),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody),
        (status = 422, description = "Configuration rejected", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn put_distribution(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<DistributionConfigBody>, JsonRejection>,
) -> Result<Json<AccountRecord>, AppError> {
    require_role(&caller, Role::Admin)?;
    let DistributionConfigBody(stored) = extract_json(body)?;
    let account_id = AccountId::from_uuid(id);
    let ctx = caller.context();

    let migrated = migrate(&stored, &state.users)?;
    let config = match migrated {
        StoredDistributionConfig::V2(config) => config,
        StoredDistributionConfig::V1(_) => {
            return Err(AppError::Internal(
                "migration returned a legacy configuration".into(),
            ))
        }
    };
    let normalized = validate_config(&config, &ctx)?.into_inner();

    // Same lock as profit recording: a recording never sees half of an edit.
    let _guard = state.account_locks.lock(account_id).await;
    find_account(&state, account_id)?;
    let now = Utc::now();

    if let Some(pool) = &state.db_pool {
        crate::db::accounts::update_distribution(pool, account_id, &normalized, now)
            .await
            .map_err(|e| AppError::database("failed to persist distribution config", e))?;
    }

    let updated = state
        .accounts
        .update(&account_id, |account| {
            account.distribution = Some(normalized);
            account.updated_at = now;
        })
        .ok_or_else(|| AppError::NotFound(format!("account {account_id} not found")))?;

    tracing::info!(
        account_id = %account_id,
        schema_version = stored.schema_version(),
        correlation_id = %ctx.correlation_id,
        "distribution configuration saved"
    );
    Ok(Json(updated))
}

/// POST /v1/accounts/:id/distribution/validate — Validate without saving.
///
/// Never rejects a well-formed body: the verdict is in the response.
#[utoipa::path(
    post,
    path = "/v1/accounts/{id}/distribution/validate",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = DistributionConfigBody,
    responses(
        (status = 200, description = "Validation report", body = ValidationResponse),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn validate_distribution(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<DistributionConfigBody>, JsonRejection>,
) -> Result<Json<ValidationResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let DistributionConfigBody(stored) = extract_json(body)?;
    find_account(&state, AccountId::from_uuid(id))?;

    let config = syndic_distribution::normalize(&stored, &state.users)?;
    let report = ValidationReport::evaluate(&config, &caller.context());
    Ok(Json(ValidationResponse::from_report(
        report,
        stored.schema_version(),
    )))
}

/// POST /v1/accounts/:id/profits — Record a profit event.
///
/// Returns 201 with the new record, or 200 with the original record when
/// the same (account, date, amount) was already recorded.
#[utoipa::path(
    post,
    path = "/v1/accounts/{id}/profits",
    params(("id" = Uuid, Path, description = "Account ID")),
    request_body = RecordProfitRequest,
    responses(
        (status = 201, description = "Profit recorded", body = RecordProfitResponse),
        (status = 200, description = "Duplicate submission, original record", body = RecordProfitResponse),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody),
        (status = 409, description = "No configuration, or reconciliation failed", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid amount or configuration", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn record_profit(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Result<Json<RecordProfitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordProfitResponse>), AppError> {
    require_role(&caller, Role::Admin)?;
    let req = extract_validated_json(body)?;
    let as_of = req.as_of.unwrap_or_else(|| Utc::now().date_naive());

    let outcome = crate::recording::record_profit(
        &state,
        AccountId::from_uuid(id),
        req.gross_profit,
        as_of,
        &caller.context(),
    )
    .await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(RecordProfitResponse {
            replayed: outcome.replayed,
            record: outcome.record,
        }),
    ))
}

/// GET /v1/accounts/:id/distributions — Recorded distributions, oldest first.
#[utoipa::path(
    get,
    path = "/v1/accounts/{id}/distributions",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Recorded distributions", body = DistributionsResponse),
        (status = 404, description = "Account not found", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn list_distributions(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<DistributionsResponse>, AppError> {
    require_role(&caller, Role::Admin)?;
    let account_id = AccountId::from_uuid(id);
    find_account(&state, account_id)?;
    Ok(Json(DistributionsResponse {
        account_id,
        records: state.ledger.records_for(&account_id),
    }))
}

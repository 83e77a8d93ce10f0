//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from syndic-distribution, syndic-ledger, and
//! syndic-core to HTTP status codes with a JSON body carrying an error
//! code, message, and optional details. Internal error details are never
//! returned to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use syndic_distribution::{ConfigError, DistributionError, NormalizeError, SinkError};
use syndic_ledger::{LedgerError, WithdrawalError};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// The `details` field carries machine-readable context for rejected
/// configurations and withdrawals, and is omitted for 500-class errors.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "CONFIG_REJECTED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// A domain rule rejected the request (422), with structured details.
    #[error("{message}")]
    Rejected {
        /// Machine-readable code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Structured context for the client.
        details: serde_json::Value,
    },

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure, missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure, insufficient permissions (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Rejected { code, .. } => (StatusCode::UNPROCESSABLE_ENTITY, *code),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Wrap a database error. The message is logged, never returned.
    pub fn database(context: &str, err: sqlx::Error) -> Self {
        Self::Internal(format!("{context}: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let details = match self {
            Self::Rejected { details, .. } => Some(details),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<syndic_core::ValidationError> for AppError {
    fn from(err: syndic_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Rejected configurations carry the failing rule so the editor can point
/// at it; percentage mismatches also carry the actual total and the delta.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        let details = match &err {
            ConfigError::NegativeValue(field) => {
                serde_json::json!({ "rule": "non_negative", "field": field })
            }
            ConfigError::ValueOutOfRange(field) => {
                serde_json::json!({ "rule": "in_range", "field": field })
            }
            ConfigError::MultiplePoolRows { count } => {
                serde_json::json!({ "rule": "single_pool_row", "count": count })
            }
            ConfigError::ConflictingGrowthFund => {
                serde_json::json!({ "rule": "single_growth_fund" })
            }
            ConfigError::PercentageMismatch { actual } => serde_json::json!({
                "rule": "percentage_total",
                "actual": actual.to_string(),
                "delta": err.delta().map(|d| d.to_string()),
            }),
        };
        Self::Rejected {
            code: "CONFIG_REJECTED",
            message: err.to_string(),
            details,
        }
    }
}

/// A non-positive profit is a client mistake; a reconciliation failure is
/// a state conflict and nothing has been persisted.
impl From<DistributionError> for AppError {
    fn from(err: DistributionError) -> Self {
        match &err {
            DistributionError::NonPositiveProfit(_) | DistributionError::AmountOutOfRange(_) => {
                Self::Validation(err.to_string())
            }
            DistributionError::ReconciliationFailed { .. } => {
                tracing::error!(error = %err, "distribution failed reconciliation, nothing persisted");
                Self::Conflict(err.to_string())
            }
        }
    }
}

impl From<NormalizeError> for AppError {
    fn from(err: NormalizeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<SinkError> for AppError {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Rejected(msg) => Self::Conflict(msg),
            SinkError::Unavailable(msg) => Self::Internal(msg),
        }
    }
}

impl From<WithdrawalError> for AppError {
    fn from(err: WithdrawalError) -> Self {
        match &err {
            WithdrawalError::NonPositiveAmount(_) | WithdrawalError::UnknownStatus(_) => {
                Self::Validation(err.to_string())
            }
            WithdrawalError::InsufficientBalance {
                requested,
                available,
            } => Self::Rejected {
                code: "INSUFFICIENT_BALANCE",
                message: err.to_string(),
                details: serde_json::json!({
                    "requested": requested.to_currency_string(),
                    "available": available.to_currency_string(),
                }),
            },
            WithdrawalError::InvalidTransition { .. } | WithdrawalError::NotCompleted(_) => {
                Self::Conflict(err.to_string())
            }
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Withdrawal(e) => e.into(),
            LedgerError::Sink(e) => e.into(),
        }
    }
}

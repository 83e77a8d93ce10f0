//! # Request Body Extraction
//!
//! Handlers take `Result<Json<T>, JsonRejection>` so that malformed bodies
//! surface through [`AppError`] with the standard envelope instead of
//! axum's plain-text rejection. Request DTOs implement [`Validate`] for the
//! rules serde cannot express (non-blank names, positive amounts); the
//! field checks shared by several DTOs live here.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use syndic_core::Money;

use crate::error::AppError;

/// Longest accepted display or account name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Business rules on a deserialized request body.
pub trait Validate {
    /// Returns a message naming the offending field on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body. Deserialization failures become `400 BAD_REQUEST`.
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Unwrap and validate a JSON body. Rule failures become `422`.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Like [`extract_json`], but a request sent without a JSON body yields
/// `T::default()`. Used by actions whose body is entirely optional.
pub fn extract_optional_json<T: Default>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    match result {
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        other => extract_json(other),
    }
}

/// A trimmed, non-empty name of at most [`MAX_NAME_LEN`] bytes.
pub fn check_name(field: &str, value: &str) -> Result<(), String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} must not be empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(format!("{field} must not exceed {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

/// A strictly positive amount.
pub fn check_positive(field: &str, amount: Money) -> Result<(), String> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(format!("{field} must be positive, got {amount}"))
    }
}

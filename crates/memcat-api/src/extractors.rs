//! # Custom Extractors & Validation
//!
//! Provides the [`Validate`] trait for request DTOs and helpers to extract
//! and validate JSON bodies and query strings in handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;

use crate::error::AppError;

/// Request types that check business rules beyond what serde enforces.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Extract a JSON body, mapping deserialization errors to [`AppError::BadRequest`].
///
/// ```ignore
/// async fn handler(body: Result<Json<T>, JsonRejection>) -> Result<..., AppError> {
///     let req = extract_json(body)?;
/// }
/// ```
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    result
        .map(|Json(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

/// Extract a JSON body and validate it using the [`Validate`] trait.
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(result)?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

/// Extract and validate query parameters.
pub fn extract_validated_query<T: Validate>(
    result: Result<Query<T>, QueryRejection>,
) -> Result<T, AppError> {
    let Query(value) = result.map_err(|err| AppError::BadRequest(err.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

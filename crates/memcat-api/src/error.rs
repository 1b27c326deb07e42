//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors (unknown rule, busy guard, directory outage, scheduler
//! misconfiguration, storage failures) to HTTP status codes with a JSON body
//! carrying an error code, message, and optional details. Internal error
//! details never reach the client.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use memcat_engine::{ChangeLogError, ExecutionError, RegistryError, SchedulerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Seconds a client should wait before retrying a rejected overlapping run.
pub const BUSY_RETRY_AFTER_SECS: u32 = 5;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "ENGINE_BUSY").
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

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// A rule execution is already in progress (503, retryable).
    #[error("a rule execution is already in progress")]
    Busy,

    /// The member directory could not be reached (502).
    #[error("member directory unavailable: {0}")]
    BadGateway(String),

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
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Busy => (StatusCode::SERVICE_UNAVAILABLE, "ENGINE_BUSY"),
            Self::BadGateway(_) => (StatusCode::BAD_GATEWAY, "DIRECTORY_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::BadGateway(_) => tracing::warn!(error = %self, "member directory unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::Busy) {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(BUSY_RETRY_AFTER_SECS),
            );
        }
        response
    }
}

impl From<memcat_core::ValidationError> for AppError {
    fn from(err: memcat_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ExecutionError> for AppError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::UnknownRule(id) => Self::NotFound(format!("rule {id}")),
            ExecutionError::Busy => Self::Busy,
            ExecutionError::Directory(e) => Self::BadGateway(e.to_string()),
        }
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownRule(id) => Self::NotFound(format!("rule {id}")),
            RegistryError::Invalid(e) => Self::Validation(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Disabled => Self::Conflict(err.to_string()),
            SchedulerError::InvalidInterval(_) => Self::Validation(err.to_string()),
        }
    }
}

impl From<ChangeLogError> for AppError {
    fn from(err: ChangeLogError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcat_engine::DirectoryError;

    #[test]
    fn not_found_status_code() {
        let err = AppError::NotFound("rule x".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn validation_status_code() {
        let err = AppError::Validation("bad field".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(code, "VALIDATION_ERROR");
    }

    #[test]
    fn bad_request_status_code() {
        let err = AppError::BadRequest("malformed JSON".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "BAD_REQUEST");
    }

    #[test]
    fn conflict_status_code() {
        let err = AppError::Conflict("scheduler disabled".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(code, "CONFLICT");
    }

    #[test]
    fn busy_sets_retry_after() {
        let response = AppError::Busy.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &BUSY_RETRY_AFTER_SECS.to_string()
        );
    }

    #[test]
    fn internal_status_code() {
        let err = AppError::Internal("db connection failed".to_string());
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
    }

    #[test]
    fn execution_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(ExecutionError::UnknownRule("nope".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(AppError::from(ExecutionError::Busy), AppError::Busy));
        let err = AppError::from(ExecutionError::Directory(DirectoryError::Unavailable(
            "timeout".into(),
        )));
        assert_eq!(err.status_and_code().1, "DIRECTORY_UNAVAILABLE");
    }

    #[test]
    fn scheduler_errors_map_by_kind() {
        assert_eq!(
            AppError::from(SchedulerError::Disabled).status_and_code().0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(SchedulerError::InvalidInterval(0))
                .status_and_code()
                .0,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn internal_message_is_not_exposed() {
        use http_body_util::BodyExt;

        let response = AppError::Internal("password=hunter2".into()).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error.code, "INTERNAL_ERROR");
        assert!(!body.error.message.contains("hunter2"));
    }
}

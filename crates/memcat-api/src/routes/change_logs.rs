//! # Change Log
//!
//! `GET /v1/change-logs?limit=N`: most recent category transitions.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use memcat_engine::ChangeLogEntry;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_query, Validate};
use crate::state::AppState;

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;

/// Query parameters for listing change log entries.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ChangeLogQuery {
    /// Maximum entries to return (1..=500, default 50).
    pub limit: Option<usize>,
}

impl ChangeLogQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }
}

impl Validate for ChangeLogQuery {
    fn validate(&self) -> Result<(), String> {
        let limit = self.limit();
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(format!("limit must be between 1 and {MAX_LIMIT}, got {limit}"));
        }
        Ok(())
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/change-logs", get(list_change_logs))
}

/// GET /v1/change-logs: Most recent transitions, newest first.
#[utoipa::path(
    get,
    path = "/v1/change-logs",
    params(ChangeLogQuery),
    responses(
        (status = 200, description = "Change log entries, newest first",
            body = Vec<ChangeLogEntry>),
        (status = 422, description = "Limit out of range", body = ErrorBody),
    ),
    tag = "change_logs"
)]
pub(crate) async fn list_change_logs(
    State(state): State<AppState>,
    query: Result<Query<ChangeLogQuery>, QueryRejection>,
) -> Result<Json<Vec<ChangeLogEntry>>, AppError> {
    let query = extract_validated_query(query)?;
    let entries = state.change_log().recent(query.limit()).await?;
    Ok(Json(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_to_fifty() {
        let query = ChangeLogQuery { limit: None };
        assert_eq!(query.limit(), 50);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn limit_bounds_are_inclusive() {
        assert!(ChangeLogQuery { limit: Some(1) }.validate().is_ok());
        assert!(ChangeLogQuery { limit: Some(500) }.validate().is_ok());
        assert!(ChangeLogQuery { limit: Some(0) }.validate().is_err());
        assert!(ChangeLogQuery { limit: Some(501) }.validate().is_err());
    }
}

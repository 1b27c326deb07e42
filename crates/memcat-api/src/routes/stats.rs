//! # Dashboard Statistics
//!
//! `GET /v1/stats`: rule counts and change counts, recomputed per call.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use memcat_engine::{stats, EngineStats};

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/stats", get(get_stats))
}

/// GET /v1/stats: Rule totals, change totals, and changes in the last 7 days.
#[utoipa::path(
    get,
    path = "/v1/stats",
    responses(
        (status = 200, description = "Current engine statistics", body = EngineStats),
        (status = 500, description = "Change log unavailable", body = ErrorBody),
    ),
    tag = "stats"
)]
pub(crate) async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<EngineStats>, AppError> {
    // Snapshot the registry so no lock is held across the store queries.
    let registry = state.registry.read().clone();
    let stats = stats::compute(&registry, state.change_log().as_ref(), state.executor.now()).await?;
    Ok(Json(stats))
}

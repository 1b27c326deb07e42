//! # Scheduler Control
//!
//! Status, start/stop/toggle, and interval configuration for the periodic
//! full run. Status reads never wait on an execution in flight.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use memcat_engine::{SchedulerConfigUpdate, SchedulerStatus};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Body of `PUT /v1/scheduler/config`. At least one field is required.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSchedulerRequest {
    pub enabled: Option<bool>,
    /// Seconds between runs, 1 second to 1 year.
    pub interval_secs: Option<u64>,
}

impl Validate for UpdateSchedulerRequest {
    fn validate(&self) -> Result<(), String> {
        if self.enabled.is_none() && self.interval_secs.is_none() {
            return Err("at least one of enabled, interval_secs is required".to_string());
        }
        Ok(())
    }
}

impl From<UpdateSchedulerRequest> for SchedulerConfigUpdate {
    fn from(req: UpdateSchedulerRequest) -> Self {
        SchedulerConfigUpdate {
            enabled: req.enabled,
            interval_secs: req.interval_secs,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/scheduler", get(get_status))
        .route("/v1/scheduler/start", post(start))
        .route("/v1/scheduler/stop", post(stop))
        .route("/v1/scheduler/toggle", post(toggle))
        .route("/v1/scheduler/config", put(update_config))
}

/// GET /v1/scheduler: Running flag, in-flight flag, and config.
#[utoipa::path(
    get,
    path = "/v1/scheduler",
    responses((status = 200, description = "Scheduler status", body = SchedulerStatus)),
    tag = "scheduler"
)]
pub(crate) async fn get_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status())
}

/// POST /v1/scheduler/start: Arm the timer. No-op when already running.
#[utoipa::path(
    post,
    path = "/v1/scheduler/start",
    responses(
        (status = 200, description = "Scheduler running", body = SchedulerStatus),
        (status = 409, description = "Scheduler is disabled", body = ErrorBody),
        (status = 422, description = "Configured interval is invalid", body = ErrorBody),
    ),
    tag = "scheduler"
)]
pub(crate) async fn start(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, AppError> {
    Ok(Json(state.scheduler.start().await?))
}

/// POST /v1/scheduler/stop: Disarm the timer. A run in flight completes.
#[utoipa::path(
    post,
    path = "/v1/scheduler/stop",
    responses((status = 200, description = "Scheduler stopped", body = SchedulerStatus)),
    tag = "scheduler"
)]
pub(crate) async fn stop(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.stop().await)
}

/// POST /v1/scheduler/toggle: Stop if running, start if stopped.
#[utoipa::path(
    post,
    path = "/v1/scheduler/toggle",
    responses(
        (status = 200, description = "New scheduler status", body = SchedulerStatus),
        (status = 409, description = "Scheduler is disabled", body = ErrorBody),
    ),
    tag = "scheduler"
)]
pub(crate) async fn toggle(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, AppError> {
    Ok(Json(state.scheduler.toggle().await?))
}

/// PUT /v1/scheduler/config: Change `enabled` and/or the interval.
#[utoipa::path(
    put,
    path = "/v1/scheduler/config",
    request_body = UpdateSchedulerRequest,
    responses(
        (status = 200, description = "Updated scheduler status", body = SchedulerStatus),
        (status = 422, description = "Invalid interval", body = ErrorBody),
    ),
    tag = "scheduler"
)]
pub(crate) async fn update_config(
    State(state): State<AppState>,
    body: Result<Json<UpdateSchedulerRequest>, JsonRejection>,
) -> Result<Json<SchedulerStatus>, AppError> {
    let req = extract_validated_json(body)?;
    Ok(Json(state.scheduler.update_config(req.into()).await?))
}

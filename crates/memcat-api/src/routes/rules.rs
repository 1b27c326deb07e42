//! # Rule Catalogue
//!
//! Read access to the loaded rules, the runtime activation toggle, and
//! dry-run previews. The catalogue itself is configuration; only
//! `is_active` can change through the API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use memcat_core::{Rule, RuleId};
use memcat_engine::PreviewEntry;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::extractors::extract_json;
use crate::state::AppState;

/// Body of `PUT /v1/rules/:id/active`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetActiveRequest {
    pub is_active: bool,
}

/// Members a rule would move if it ran now.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreviewResponse {
    pub rule_id: RuleId,
    pub would_change: usize,
    pub members: Vec<PreviewEntry>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/rules", get(list_rules))
        .route("/v1/rules/:id", get(get_rule))
        .route("/v1/rules/:id/preview", get(preview_rule))
        .route("/v1/rules/:id/active", put(set_rule_active))
}

/// GET /v1/rules: All rules in evaluation order.
#[utoipa::path(
    get,
    path = "/v1/rules",
    responses((status = 200, description = "Rule catalogue", body = Vec<Rule>)),
    tag = "rules"
)]
pub(crate) async fn list_rules(State(state): State<AppState>) -> Json<Vec<Rule>> {
    Json(state.registry.read().list())
}

/// GET /v1/rules/:id: One rule.
#[utoipa::path(
    get,
    path = "/v1/rules/{id}",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Rule found", body = Rule),
        (status = 404, description = "Unknown rule", body = ErrorBody),
    ),
    tag = "rules"
)]
pub(crate) async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Rule>, AppError> {
    let rule = state.registry.read().require(&id)?.clone();
    Ok(Json(rule))
}

/// GET /v1/rules/:id/preview: Members the rule would move, without writing.
#[utoipa::path(
    get,
    path = "/v1/rules/{id}/preview",
    params(("id" = String, Path, description = "Rule ID")),
    responses(
        (status = 200, description = "Preview of affected members", body = PreviewResponse),
        (status = 404, description = "Unknown rule", body = ErrorBody),
        (status = 502, description = "Member directory unavailable", body = ErrorBody),
    ),
    tag = "rules"
)]
pub(crate) async fn preview_rule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PreviewResponse>, AppError> {
    let members = state.executor.preview(&id).await?;
    let rule_id = RuleId::new(id)?;
    Ok(Json(PreviewResponse {
        rule_id,
        would_change: members.len(),
        members,
    }))
}

/// PUT /v1/rules/:id/active: Activate or deactivate a rule.
///
/// Takes effect on the next run; a run already in flight keeps the rule
/// set it started with.
#[utoipa::path(
    put,
    path = "/v1/rules/{id}/active",
    params(("id" = String, Path, description = "Rule ID")),
    request_body = SetActiveRequest,
    responses(
        (status = 200, description = "Updated rule", body = Rule),
        (status = 404, description = "Unknown rule", body = ErrorBody),
    ),
    tag = "rules"
)]
pub(crate) async fn set_rule_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SetActiveRequest>, JsonRejection>,
) -> Result<Json<Rule>, AppError> {
    let req = extract_json(body)?;
    let rule = state.registry.write().set_active(&id, req.is_active)?;
    Ok(Json(rule))
}

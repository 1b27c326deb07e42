//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI document for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Membership Categorization Engine API",
        version = "0.1.0",
        description = "Rule-driven membership category maintenance: manual and scheduled \
            executions, rule catalogue, change log, and statistics.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Executions
        crate::routes::executions::execute_all_rules,
        crate::routes::executions::execute_rule,
        crate::routes::executions::execute_rule_for_members,
        // Rules
        crate::routes::rules::list_rules,
        crate::routes::rules::get_rule,
        crate::routes::rules::preview_rule,
        crate::routes::rules::set_rule_active,
        // Change log & stats
        crate::routes::change_logs::list_change_logs,
        crate::routes::stats::get_stats,
        // Scheduler
        crate::routes::scheduler::get_status,
        crate::routes::scheduler::start,
        crate::routes::scheduler::stop,
        crate::routes::scheduler::toggle,
        crate::routes::scheduler::update_config,
    ),
    components(schemas(
        // Domain types
        memcat_core::Rule,
        memcat_core::Condition,
        memcat_core::RuleId,
        memcat_core::MemberId,
        memcat_core::Category,
        memcat_engine::RuleExecutionResult,
        memcat_engine::PreviewEntry,
        memcat_engine::ChangeLogEntry,
        memcat_engine::EngineStats,
        memcat_engine::SchedulerConfig,
        memcat_engine::SchedulerStatus,
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // Request / response DTOs
        crate::routes::executions::ExecuteRuleRequest,
        crate::routes::executions::ExecuteRuleForMembersRequest,
        crate::routes::rules::SetActiveRequest,
        crate::routes::rules::PreviewResponse,
        crate::routes::scheduler::UpdateSchedulerRequest,
    )),
    tags(
        (name = "executions", description = "Manual rule executions"),
        (name = "rules", description = "Rule catalogue and previews"),
        (name = "change_logs", description = "Category transition audit trail"),
        (name = "stats", description = "Dashboard statistics"),
        (name = "scheduler", description = "Periodic execution control"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/v1/executions",
            "/v1/executions/rule",
            "/v1/executions/rule/members",
            "/v1/rules",
            "/v1/rules/{id}",
            "/v1/rules/{id}/preview",
            "/v1/rules/{id}/active",
            "/v1/change-logs",
            "/v1/stats",
            "/v1/scheduler",
            "/v1/scheduler/start",
            "/v1/scheduler/stop",
            "/v1/scheduler/toggle",
            "/v1/scheduler/config",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}

//! # memcat-api: Axum API for the Membership Categorization Engine
//!
//! HTTP surface over [`memcat_engine`]: manual rule executions, the rule
//! catalogue, the change log, statistics, and scheduler control.
//!
//! ## API Surface
//!
//! | Prefix              | Module                    | Domain                 |
//! |---------------------|---------------------------|------------------------|
//! | `/v1/executions*`   | [`routes::executions`]    | Manual runs            |
//! | `/v1/rules/*`       | [`routes::rules`]         | Catalogue and previews |
//! | `/v1/change-logs`   | [`routes::change_logs`]   | Audit trail            |
//! | `/v1/stats`         | [`routes::stats`]         | Dashboard counts       |
//! | `/v1/scheduler/*`   | [`routes::scheduler`]     | Periodic runs          |
//!
//! ## Concurrency
//!
//! Manual runs and scheduled ticks share one execution guard. An
//! overlapping manual request is rejected with `503 ENGINE_BUSY` and a
//! `Retry-After` header; an overlapping tick is skipped.
//!
//! ## OpenAPI
//!
//! Generated with utoipa derive macros, served at `/openapi.json`.

pub mod bootstrap;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::executions::router())
        .merge(routes::rules::router())
        .merge(routes::change_logs::router())
        .merge(routes::stats::router())
        .merge(routes::scheduler::router())
        .merge(openapi::router())
        .layer(TraceLayer::new_for_http());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(health).merge(api).with_state(state)
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the database (when configured) answers.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}

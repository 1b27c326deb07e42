//! # Manual Rule Executions
//!
//! Operator-triggered runs. Each holds the engine-wide execution guard for
//! its duration; a request arriving while any run (manual or scheduled) is
//! in flight gets `503 ENGINE_BUSY` with `Retry-After`.
//!
//! Per-member write failures never fail the request: they are counted in
//! the returned [`RuleExecutionResult`]s.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use memcat_core::MemberId;
use memcat_engine::RuleExecutionResult;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::error::{AppError, ErrorBody};
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Upper bound on member ids accepted by a subset run.
pub const MAX_SUBSET_MEMBERS: usize = 10_000;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Run one rule against every member.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteRuleRequest {
    pub rule_id: String,
}

impl Validate for ExecuteRuleRequest {
    fn validate(&self) -> Result<(), String> {
        validate_rule_id(&self.rule_id)
    }
}

/// Run one rule against the listed members only.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteRuleForMembersRequest {
    pub rule_id: String,
    /// Between 1 and 10 000 member ids. Duplicates are ignored.
    pub member_ids: Vec<String>,
}

impl Validate for ExecuteRuleForMembersRequest {
    fn validate(&self) -> Result<(), String> {
        validate_rule_id(&self.rule_id)?;
        if self.member_ids.is_empty() {
            return Err("member_ids must not be empty".to_string());
        }
        if self.member_ids.len() > MAX_SUBSET_MEMBERS {
            return Err(format!(
                "member_ids must not exceed {MAX_SUBSET_MEMBERS} entries"
            ));
        }
        if self.member_ids.iter().any(|id| id.trim().is_empty()) {
            return Err("member_ids must not contain blank ids".to_string());
        }
        Ok(())
    }
}

fn validate_rule_id(rule_id: &str) -> Result<(), String> {
    if rule_id.trim().is_empty() {
        return Err("rule_id must not be empty".to_string());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/executions", post(execute_all_rules))
        .route("/v1/executions/rule", post(execute_rule))
        .route("/v1/executions/rule/members", post(execute_rule_for_members))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/executions: Run every active rule in priority order.
#[utoipa::path(
    post,
    path = "/v1/executions",
    responses(
        (status = 200, description = "One result per active rule, in execution order",
            body = Vec<RuleExecutionResult>),
        (status = 502, description = "Member directory unavailable", body = ErrorBody),
        (status = 503, description = "Another execution is in progress", body = ErrorBody),
    ),
    tag = "executions"
)]
pub(crate) async fn execute_all_rules(
    State(state): State<AppState>,
) -> Result<Json<Vec<RuleExecutionResult>>, AppError> {
    let results = state.executor.run_all().await?;
    Ok(Json(results))
}

/// POST /v1/executions/rule: Run a single rule, active or not.
#[utoipa::path(
    post,
    path = "/v1/executions/rule",
    request_body = ExecuteRuleRequest,
    responses(
        (status = 200, description = "Execution result", body = RuleExecutionResult),
        (status = 404, description = "Unknown rule", body = ErrorBody),
        (status = 502, description = "Member directory unavailable", body = ErrorBody),
        (status = 503, description = "Another execution is in progress", body = ErrorBody),
    ),
    tag = "executions"
)]
pub(crate) async fn execute_rule(
    State(state): State<AppState>,
    body: Result<Json<ExecuteRuleRequest>, JsonRejection>,
) -> Result<Json<RuleExecutionResult>, AppError> {
    let req = extract_validated_json(body)?;
    let result = state.executor.run_one(&req.rule_id).await?;
    Ok(Json(result))
}

/// POST /v1/executions/rule/members: Run a single rule over a member subset.
///
/// Ids the directory does not know are reported as failures in the result.
#[utoipa::path(
    post,
    path = "/v1/executions/rule/members",
    request_body = ExecuteRuleForMembersRequest,
    responses(
        (status = 200, description = "Execution result", body = RuleExecutionResult),
        (status = 404, description = "Unknown rule", body = ErrorBody),
        (status = 422, description = "Invalid member id list", body = ErrorBody),
        (status = 503, description = "Another execution is in progress", body = ErrorBody),
    ),
    tag = "executions"
)]
pub(crate) async fn execute_rule_for_members(
    State(state): State<AppState>,
    body: Result<Json<ExecuteRuleForMembersRequest>, JsonRejection>,
) -> Result<Json<RuleExecutionResult>, AppError> {
    let req = extract_validated_json(body)?;
    let member_ids = req
        .member_ids
        .into_iter()
        .map(MemberId::new)
        .collect::<Result<Vec<_>, _>>()?;
    let result = state
        .executor
        .run_one_for_subset(&req.rule_id, &member_ids)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subset(ids: Vec<&str>) -> ExecuteRuleForMembersRequest {
        ExecuteRuleForMembersRequest {
            rule_id: "age_rule".into(),
            member_ids: ids.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn subset_requires_at_least_one_member() {
        assert!(subset(vec![]).validate().is_err());
        assert!(subset(vec!["m1"]).validate().is_ok());
    }

    #[test]
    fn subset_rejects_blank_ids() {
        assert!(subset(vec!["m1", "  "]).validate().is_err());
    }

    #[test]
    fn subset_caps_member_count() {
        let ids: Vec<String> = (0..=MAX_SUBSET_MEMBERS).map(|i| format!("m{i}")).collect();
        let req = ExecuteRuleForMembersRequest {
            rule_id: "age_rule".into(),
            member_ids: ids,
        };
        assert!(req.validate().unwrap_err().contains("10000"));
    }

    #[test]
    fn blank_rule_id_is_invalid() {
        let req = ExecuteRuleRequest { rule_id: " ".into() };
        assert!(req.validate().is_err());
    }
}

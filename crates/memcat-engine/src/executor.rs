//! # Batch Executor
//!
//! Applies rules to members: evaluate, write the new category through the
//! member directory, then append an audit entry.
//!
//! ## Pass Semantics
//!
//! Rules run one after another in ascending priority (ties broken by id).
//! Members are snapshotted once per run and each successful write updates
//! the snapshot, so later rules in the same pass see the categories earlier
//! rules produced.
//!
//! ## Execution Guard
//!
//! Every mutating entry point (`run`, `run_all`, `run_one`,
//! `run_one_for_subset`) must hold the engine-wide [`ExecutionGuard`]. A
//! trigger that finds it held returns [`ExecutionError::Busy`] at once; it is
//! never queued or interleaved. The scheduler's tick goes through the same
//! entry points, so manual and scheduled runs exclude each other.
//!
//! ## Failure Isolation
//!
//! A failed write is counted and recorded against its member and the batch
//! continues. The audit entry is appended strictly after a confirmed write.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use memcat_core::{Category, MemberId, MemberSnapshot, Rule, RuleId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::{ChangeLogEntry, ChangeLogStore};
use crate::directory::{DirectoryError, MemberDirectory};
use crate::evaluation::{evaluate, EvaluationContext};
use crate::registry::{sort_by_priority, SharedRegistry};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of applying one rule during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RuleExecutionResult {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub executed_at: DateTime<Utc>,
    /// Members the rule matched (plus requested members the directory did
    /// not know, for subset runs).
    pub affected_members: u32,
    pub success_count: u32,
    pub failed_count: u32,
    /// Matched members already in the target category.
    pub unchanged_count: u32,
    pub errors: Vec<String>,
}

impl RuleExecutionResult {
    fn start(rule: &Rule, executed_at: DateTime<Utc>) -> Self {
        Self {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            executed_at,
            affected_members: 0,
            success_count: 0,
            failed_count: 0,
            unchanged_count: 0,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, message: String) {
        self.affected_members += 1;
        self.failed_count += 1;
        self.errors.push(message);
    }
}

/// A member a rule would move, as reported by [`BatchExecutor::preview`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PreviewEntry {
    pub member_id: MemberId,
    pub member_name: String,
    pub current_category: Category,
    pub target_category: Category,
    pub reason: String,
}

/// Errors that stop a run before any member is touched.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("unknown rule: {0}")]
    UnknownRule(String),

    /// Another run holds the execution guard. Retryable.
    #[error("a rule execution is already in progress")]
    Busy,

    /// The member directory could not be listed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

// ---------------------------------------------------------------------------
// ExecutionGuard
// ---------------------------------------------------------------------------

/// Engine-wide "execution in progress" flag.
#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    in_progress: Arc<AtomicBool>,
}

impl ExecutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard, or `None` when a run already holds it.
    pub fn try_acquire(&self) -> Option<ExecutionPermit> {
        self.in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ExecutionPermit {
                in_progress: Arc::clone(&self.in_progress),
            })
    }

    pub fn is_held(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// Proof of holding the [`ExecutionGuard`]. Releases it on drop.
#[derive(Debug)]
pub struct ExecutionPermit {
    in_progress: Arc<AtomicBool>,
}

impl Drop for ExecutionPermit {
    fn drop(&mut self) {
        self.in_progress.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// BatchExecutor
// ---------------------------------------------------------------------------

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Runs rules against the member directory.
pub struct BatchExecutor {
    registry: SharedRegistry,
    directory: Arc<dyn MemberDirectory>,
    change_log: Arc<dyn ChangeLogStore>,
    guard: ExecutionGuard,
    clock: Clock,
}

impl std::fmt::Debug for BatchExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchExecutor")
            .field("directory", &self.directory.name())
            .field("guard", &self.guard)
            .finish_non_exhaustive()
    }
}

impl BatchExecutor {
    pub fn new(
        registry: SharedRegistry,
        directory: Arc<dyn MemberDirectory>,
        change_log: Arc<dyn ChangeLogStore>,
    ) -> Self {
        Self {
            registry,
            directory,
            change_log,
            guard: ExecutionGuard::new(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the wall clock used to capture the evaluation instant.
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn change_log(&self) -> &Arc<dyn ChangeLogStore> {
        &self.change_log
    }

    pub fn directory(&self) -> &Arc<dyn MemberDirectory> {
        &self.directory
    }

    /// Whether any run currently holds the execution guard.
    pub fn is_running(&self) -> bool {
        self.guard.is_held()
    }

    fn acquire(&self) -> Result<ExecutionPermit, ExecutionError> {
        self.guard.try_acquire().ok_or_else(|| {
            tracing::info!("execution rejected: another run is in progress");
            ExecutionError::Busy
        })
    }

    fn rule(&self, rule_id: &str) -> Result<Rule, ExecutionError> {
        self.registry
            .read()
            .get(rule_id)
            .cloned()
            .ok_or_else(|| ExecutionError::UnknownRule(rule_id.to_string()))
    }

    /// Apply `rules` to `members`. Rules are reordered by priority; their
    /// active flag is not consulted.
    pub async fn run(
        &self,
        rules: Vec<Rule>,
        members: Vec<MemberSnapshot>,
    ) -> Result<Vec<RuleExecutionResult>, ExecutionError> {
        let _permit = self.acquire()?;
        let ctx = EvaluationContext::at(self.now());
        let mut rules = rules;
        sort_by_priority(&mut rules);
        let mut members = members;
        Ok(self.apply(&rules, &mut members, &ctx).await)
    }

    /// Apply every active rule to every member.
    pub async fn run_all(&self) -> Result<Vec<RuleExecutionResult>, ExecutionError> {
        let _permit = self.acquire()?;
        let rules = self.registry.read().active_in_priority_order();
        let mut members = self.directory.list_members().await?;
        let ctx = EvaluationContext::at(self.now());
        tracing::info!(
            rules = rules.len(),
            members = members.len(),
            directory = self.directory.name(),
            "running all active rules"
        );
        Ok(self.apply(&rules, &mut members, &ctx).await)
    }

    /// Apply one rule, active or not, to every member.
    pub async fn run_one(&self, rule_id: &str) -> Result<RuleExecutionResult, ExecutionError> {
        let rule = self.rule(rule_id)?;
        let _permit = self.acquire()?;
        let mut members = self.directory.list_members().await?;
        let ctx = EvaluationContext::at(self.now());
        let mut results = self
            .apply(std::slice::from_ref(&rule), &mut members, &ctx)
            .await;
        Ok(results
            .pop()
            .unwrap_or_else(|| RuleExecutionResult::start(&rule, ctx.now)))
    }

    /// Apply one rule to the given members. Duplicate ids are collapsed;
    /// ids unknown to the directory are reported as failures.
    pub async fn run_one_for_subset(
        &self,
        rule_id: &str,
        member_ids: &[MemberId],
    ) -> Result<RuleExecutionResult, ExecutionError> {
        let rule = self.rule(rule_id)?;
        let _permit = self.acquire()?;

        let mut seen = HashSet::new();
        let requested: Vec<MemberId> = member_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect();
        let mut members = self.directory.get_members(&requested).await?;
        let ctx = EvaluationContext::at(self.now());

        let found: HashSet<&MemberId> = members.iter().map(|m| &m.id).collect();
        let missing: Vec<MemberId> = requested
            .iter()
            .filter(|id| !found.contains(id))
            .cloned()
            .collect();

        let mut result = self
            .apply(std::slice::from_ref(&rule), &mut members, &ctx)
            .await
            .pop()
            .unwrap_or_else(|| RuleExecutionResult::start(&rule, ctx.now));
        for id in missing {
            tracing::warn!(rule_id = %rule.id, member_id = %id, "requested member not found");
            result.fail(format!("member {id}: not found in directory"));
        }
        Ok(result)
    }

    /// Members `rule_id` would move right now, without writing anything.
    /// Does not take the execution guard.
    pub async fn preview(&self, rule_id: &str) -> Result<Vec<PreviewEntry>, ExecutionError> {
        let rule = self.rule(rule_id)?;
        let members = self.directory.list_members().await?;
        let ctx = EvaluationContext::at(self.now());
        Ok(members
            .into_iter()
            .filter_map(|member| {
                let evaluation = evaluate(&rule, &member, &ctx);
                let target = evaluation.target_category?;
                let reason = evaluation.reason?;
                (target != member.category).then(|| PreviewEntry {
                    member_id: member.id,
                    member_name: member.name,
                    current_category: member.category,
                    target_category: target,
                    reason,
                })
            })
            .collect())
    }

    async fn apply(
        &self,
        rules: &[Rule],
        members: &mut [MemberSnapshot],
        ctx: &EvaluationContext,
    ) -> Vec<RuleExecutionResult> {
        let mut results = Vec::with_capacity(rules.len());
        for rule in rules {
            results.push(self.apply_rule(rule, members, ctx).await);
        }
        results
    }

    async fn apply_rule(
        &self,
        rule: &Rule,
        members: &mut [MemberSnapshot],
        ctx: &EvaluationContext,
    ) -> RuleExecutionResult {
        let mut result = RuleExecutionResult::start(rule, ctx.now);

        for member in members.iter_mut() {
            let evaluation = evaluate(rule, member, ctx);
            let (Some(target), Some(reason)) = (evaluation.target_category, evaluation.reason)
            else {
                continue;
            };
            result.affected_members += 1;

            if member.category == target {
                result.unchanged_count += 1;
                continue;
            }

            if let Err(e) = self.directory.set_category(&member.id, &target).await {
                tracing::warn!(
                    rule_id = %rule.id,
                    member_id = %member.id,
                    error = %e,
                    "category update failed"
                );
                result.failed_count += 1;
                result.errors.push(format!("member {}: {e}", member.id));
                continue;
            }

            let entry = ChangeLogEntry::record(member, &target, rule, reason, ctx.now);
            tracing::debug!(
                rule_id = %rule.id,
                member_id = %member.id,
                from = %member.category,
                to = %target,
                "category updated"
            );
            member.category = target;
            result.success_count += 1;

            if let Err(e) = self.change_log.append(entry).await {
                tracing::error!(
                    rule_id = %rule.id,
                    member_id = %member.id,
                    error = %e,
                    "category updated but audit entry could not be stored"
                );
                result
                    .errors
                    .push(format!("member {}: audit entry not stored: {e}", member.id));
            }
        }

        tracing::info!(
            rule_id = %rule.id,
            affected = result.affected_members,
            success = result.success_count,
            failed = result.failed_count,
            unchanged = result.unchanged_count,
            "rule executed"
        );
        result
    }
}

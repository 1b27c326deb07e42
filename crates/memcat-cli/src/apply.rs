//! # Apply Subcommand
//!
//! Runs rules against a members file with the same batch semantics as the
//! server: rules in priority order, each seeing the categories earlier
//! rules assigned. The input file is never modified; `--output` receives
//! the updated members and `--change-log` the transitions.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use memcat_core::MemberSnapshot;
use memcat_engine::{ChangeLogEntry, InMemoryChangeLog, RuleExecutionResult};
use serde::Serialize;

/// Arguments for the `memcat apply` subcommand.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Rule catalogue (YAML). Defaults to the standard rules.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Members file: a JSON array of member snapshots.
    #[arg(long)]
    pub members: PathBuf,

    /// Apply only this rule (active or not). Defaults to every active rule.
    #[arg(long)]
    pub rule: Option<String>,

    /// Write the updated members (JSON) here.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write the change log entries (JSON) here.
    #[arg(long)]
    pub change_log: Option<PathBuf>,

    /// Evaluate as of this RFC 3339 instant instead of now.
    #[arg(long)]
    pub now: Option<String>,
}

/// Everything one `apply` produced.
#[derive(Debug, Serialize)]
pub struct ApplyReport {
    pub results: Vec<RuleExecutionResult>,
    pub changes: Vec<ChangeLogEntry>,
    pub members: Vec<MemberSnapshot>,
}

impl ApplyReport {
    pub fn failed(&self) -> u32 {
        self.results.iter().map(|r| r.failed_count).sum()
    }
}

/// Run the rules and collect the report without writing any files.
pub fn apply(args: &ApplyArgs) -> Result<ApplyReport> {
    let registry = crate::load_rules(args.rules.as_deref())?;
    if let Some(id) = &args.rule {
        registry.require(id)?;
    }
    let directory = Arc::new(crate::load_members(&args.members)?);
    let change_log = Arc::new(InMemoryChangeLog::new());
    let executor = crate::executor(
        registry,
        directory.clone(),
        change_log.clone(),
        crate::parse_now(args.now.as_deref())?,
    );

    let results = crate::runtime()?.block_on(async {
        match &args.rule {
            Some(id) => executor.run_one(id).await.map(|r| vec![r]),
            None => executor.run_all().await,
        }
    })?;

    Ok(ApplyReport {
        results,
        changes: change_log.all(),
        members: directory.snapshot(),
    })
}

/// Execute the apply subcommand.
///
/// Returns exit code: 0 when every write succeeded, 1 when any failed.
pub fn run_apply(args: &ApplyArgs) -> Result<u8> {
    let report = apply(args)?;

    for result in &report.results {
        println!(
            "{}: {} matched, {} changed, {} unchanged, {} failed",
            result.rule_id,
            result.affected_members,
            result.success_count,
            result.unchanged_count,
            result.failed_count
        );
        for error in &result.errors {
            println!("  ERROR: {error}");
        }
    }
    for change in &report.changes {
        println!(
            "  {} ({}): {} -> {} by {} [{}]",
            change.member_id,
            change.member_name,
            change.old_category,
            change.new_category,
            change.rule_id,
            change.reason
        );
    }

    if let Some(path) = &args.output {
        write_json(path, &report.members)?;
        tracing::info!(path = %path.display(), "updated members written");
    }
    if let Some(path) = &args.change_log {
        write_json(path, &report.changes)?;
        tracing::info!(path = %path.display(), "change log written");
    }

    Ok(if report.failed() > 0 { 1 } else { 0 })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn args(dir: &tempfile::TempDir) -> ApplyArgs {
        ApplyArgs {
            rules: None,
            members: fixtures::members_file(dir),
            rule: None,
            output: Some(dir.path().join("out.json")),
            change_log: Some(dir.path().join("changes.json")),
            now: Some(fixtures::NOW.into()),
        }
    }

    #[test]
    fn senator_over_forty_gets_one_transition() {
        let dir = tempfile::tempdir().unwrap();
        let report = apply(&args(&dir)).unwrap();

        let m1: Vec<&ChangeLogEntry> = report
            .changes
            .iter()
            .filter(|c| c.member_id == "m1")
            .collect();
        assert_eq!(m1.len(), 1);
        assert_eq!(m1[0].new_category, "honorary");
        assert_eq!(report.changes.len(), 2);
        assert_eq!(report.failed(), 0);
    }

    #[test]
    fn writes_output_files_and_leaves_input_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(&dir);
        let before = std::fs::read_to_string(&args.members).unwrap();

        assert_eq!(run_apply(&args).unwrap(), 0);

        assert_eq!(std::fs::read_to_string(&args.members).unwrap(), before);
        let out: Vec<MemberSnapshot> =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("out.json")).unwrap())
                .unwrap();
        let m2 = out.iter().find(|m| m.id == "m2").unwrap();
        assert_eq!(m2.category, "affiliate");
        let changes: Vec<ChangeLogEntry> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("changes.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn single_rule_apply() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(&dir);
        args.rule = Some("age_rule".into());
        let report = apply(&args).unwrap();
        assert_eq!(report.results.len(), 1);
        // Without the senator rule first, both over-40 members become affiliates.
        assert_eq!(report.results[0].success_count, 2);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = apply(&args(&dir)).unwrap();
        let round_two = dir.path().join("round_two.json");
        std::fs::write(&round_two, serde_json::to_string(&first.members).unwrap()).unwrap();

        let second = apply(&ApplyArgs {
            members: round_two,
            ..args(&dir)
        })
        .unwrap();
        assert!(second.changes.is_empty());
        assert!(second.results.iter().all(|r| r.success_count == 0));
    }
}

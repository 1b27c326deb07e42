//! # Preview Subcommand
//!
//! Dry run: for each rule, the members it would move right now. Rules are
//! previewed independently against the unmodified members file, so a member
//! can show up under more than one rule; `apply` resolves that in priority
//! order.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use memcat_core::RuleId;
use memcat_engine::{InMemoryChangeLog, PreviewEntry};
use serde::Serialize;

/// Arguments for the `memcat preview` subcommand.
#[derive(Args, Debug)]
pub struct PreviewArgs {
    /// Rule catalogue (YAML). Defaults to the standard rules.
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Members file: a JSON array of member snapshots.
    #[arg(long)]
    pub members: PathBuf,

    /// Preview only this rule (active or not). Defaults to every active rule.
    #[arg(long)]
    pub rule: Option<String>,

    /// Evaluate as of this RFC 3339 instant instead of now.
    #[arg(long)]
    pub now: Option<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

/// Preview of one rule.
#[derive(Debug, Serialize)]
pub struct RulePreview {
    pub rule_id: RuleId,
    pub members: Vec<PreviewEntry>,
}

/// Compute previews without printing.
pub fn preview(args: &PreviewArgs) -> Result<Vec<RulePreview>> {
    let registry = crate::load_rules(args.rules.as_deref())?;
    let rule_ids: Vec<RuleId> = match &args.rule {
        Some(id) => vec![registry.require(id)?.id.clone()],
        None => registry
            .active_in_priority_order()
            .into_iter()
            .map(|rule| rule.id)
            .collect(),
    };
    let directory = Arc::new(crate::load_members(&args.members)?);
    let executor = crate::executor(
        registry,
        directory,
        Arc::new(InMemoryChangeLog::new()),
        crate::parse_now(args.now.as_deref())?,
    );

    crate::runtime()?.block_on(async {
        let mut previews = Vec::with_capacity(rule_ids.len());
        for rule_id in rule_ids {
            let members = executor.preview(rule_id.as_str()).await?;
            previews.push(RulePreview { rule_id, members });
        }
        Ok::<_, anyhow::Error>(previews)
    })
}

/// Execute the preview subcommand. Always exits 0 on success.
pub fn run_preview(args: &PreviewArgs) -> Result<u8> {
    let previews = preview(args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&previews)?);
        return Ok(0);
    }
    for preview in &previews {
        println!("{}: {} member(s) would change", preview.rule_id, preview.members.len());
        for entry in &preview.members {
            println!(
                "  {} ({}): {} -> {} [{}]",
                entry.member_id,
                entry.member_name,
                entry.current_category,
                entry.target_category,
                entry.reason
            );
        }
    }
    Ok(0)
}

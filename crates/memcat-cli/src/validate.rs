//! # Validate Subcommand
//!
//! Loads a rule catalogue and reports every rule in execution order.
//! A catalogue that fails to parse or validate exits with status 1.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use memcat_core::Rule;

/// Arguments for the `memcat validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Rule catalogue (YAML).
    #[arg(value_name = "RULES")]
    pub path: PathBuf,
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 when the catalogue is valid, 1 otherwise.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let registry = match crate::load_rules(Some(&args.path)) {
        Ok(registry) => registry,
        Err(e) => {
            println!("FAIL: {e:#}");
            return Ok(1);
        }
    };

    println!(
        "Rules: {} loaded ({} active)",
        registry.total(),
        registry.active_count()
    );
    for rule in &registry.list() {
        println!("  {}", describe(rule));
    }
    Ok(0)
}

/// One-line summary of a rule, e.g.
/// `[3] age_rule: age ≥ 40 -> affiliate (only from: active)`.
pub fn describe(rule: &Rule) -> String {
    let mut line = format!(
        "[{}] {}: {} -> {}",
        rule.priority, rule.id, rule.condition, rule.target_category
    );
    if !rule.applies_to.is_empty() {
        let from: Vec<&str> = rule.applies_to.iter().map(|c| c.as_str()).collect();
        line.push_str(&format!(" (only from: {})", from.join(", ")));
    }
    if !rule.is_active {
        line.push_str(" [inactive]");
    }
    line
}

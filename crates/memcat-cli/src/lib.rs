//! # memcat-cli: Offline Tooling for the Categorization Engine
//!
//! Provides the `memcat` command-line interface for working with rule
//! catalogues and member exports without a running server.
//!
//! ## Subcommands
//!
//! - `memcat validate`: Load and validate a rule catalogue.
//! - `memcat preview`: Show which members each rule would move.
//! - `memcat apply`: Run the rules against a members file and write the
//!   updated members plus the change log.
//!
//! ```bash
//! memcat validate config/rules.yaml
//! memcat preview --members members.json --rule age_rule
//! memcat apply --rules config/rules.yaml --members members.json --output out.json
//! ```

pub mod apply;
pub mod preview;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use memcat_engine::{BatchExecutor, InMemoryChangeLog, InMemoryDirectory, RuleRegistry};

/// Load a rule catalogue, or the standard rules when `path` is `None`.
pub fn load_rules(path: Option<&Path>) -> Result<RuleRegistry> {
    match path {
        Some(path) => RuleRegistry::from_path(path)
            .with_context(|| format!("failed to load rules from {}", path.display())),
        None => Ok(RuleRegistry::standard()),
    }
}

/// Load a JSON array of member snapshots.
pub fn load_members(path: &Path) -> Result<InMemoryDirectory> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read members file {}", path.display()))?;
    InMemoryDirectory::from_json(&json)
        .with_context(|| format!("invalid members file {}", path.display()))
}

/// Parse an RFC 3339 `--now` override.
pub fn parse_now(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("--now must be an RFC 3339 timestamp, got {s:?}"))
    })
    .transpose()
}

/// An executor over in-memory stores, optionally pinned to `now`.
pub(crate) fn executor(
    registry: RuleRegistry,
    directory: Arc<InMemoryDirectory>,
    change_log: Arc<InMemoryChangeLog>,
    now: Option<DateTime<Utc>>,
) -> BatchExecutor {
    let executor = BatchExecutor::new(registry.into_shared(), directory, change_log);
    match now {
        Some(now) => executor.with_clock(move || now),
        None => executor,
    }
}

/// Single-threaded runtime for driving the async engine from the CLI.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_now_accepts_rfc3339() {
        let now = parse_now(Some("2026-10-17T09:00:00Z")).unwrap().unwrap();
        assert_eq!(now.to_rfc3339(), "2026-10-17T09:00:00+00:00");
        assert!(parse_now(None).unwrap().is_none());
        assert!(parse_now(Some("yesterday")).is_err());
    }

    #[test]
    fn missing_members_file_has_context() {
        let err = load_members(Path::new("/nonexistent/members.json")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read members file"));
    }

    #[test]
    fn no_rules_path_loads_standard_catalogue() {
        assert_eq!(load_rules(None).unwrap().total(), 3);
    }
}

//! # Stats Aggregator
//!
//! Summary counts for the dashboard, recomputed on every call from the rule
//! registry and the change log.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::{ChangeLogError, ChangeLogStore};
use crate::registry::RuleRegistry;

/// Width of the "recent changes" window.
pub const RECENT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EngineStats {
    pub total_rules: usize,
    pub active_rules: usize,
    pub total_changes: u64,
    /// Changes with `executed_at` in the last [`RECENT_WINDOW_DAYS`] days.
    pub recent_changes: u64,
}

/// Compute stats as of `now`.
pub async fn compute(
    registry: &RuleRegistry,
    change_log: &dyn ChangeLogStore,
    now: DateTime<Utc>,
) -> Result<EngineStats, ChangeLogError> {
    let total_rules = registry.total();
    let active_rules = registry.active_count();
    let total_changes = change_log.count().await?;
    let recent_changes = change_log
        .count_between(now - Duration::days(RECENT_WINDOW_DAYS), now)
        .await?;
    Ok(EngineStats {
        total_rules,
        active_rules,
        total_changes,
        recent_changes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ChangeLogEntry, InMemoryChangeLog};
    use chrono::TimeZone;

    #[tokio::test]
    async fn counts_rules_and_recent_window() {
        let mut registry = RuleRegistry::standard();
        registry.set_active("age_rule", false).unwrap();

        let log = InMemoryChangeLog::new();
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        let rule = registry.get("senator_rule").unwrap().clone();
        let member = memcat_core::MemberSnapshot::new(
            memcat_core::MemberId::new("m1").unwrap(),
            "Ana",
            memcat_core::Category::new("active").unwrap(),
        );
        for days_ago in [0, 3, 7, 8, 30] {
            log.append(ChangeLogEntry::record(
                &member,
                &rule.target_category,
                &rule,
                "senator id S1 present",
                now - Duration::days(days_ago),
            ))
            .await
            .unwrap();
        }

        let stats = compute(&registry, &log, now).await.unwrap();
        assert_eq!(
            stats,
            EngineStats {
                total_rules: 3,
                active_rules: 2,
                total_changes: 5,
                recent_changes: 3,
            }
        );
    }
}

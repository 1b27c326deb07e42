//! # Change Audit Log
//!
//! Append-only record of every category transition the engine applied.
//!
//! ## Invariants
//!
//! - An entry is appended only after the directory confirmed the write.
//! - `old_category` and `new_category` always differ.
//! - `reason` is never empty.
//! - Entries are never updated or deleted.
//!
//! Reads return newest first. Entries sharing an `executed_at` come back in
//! reverse append order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memcat_core::{Category, MemberId, MemberSnapshot, Rule, RuleId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ChangeLogEntry
// ---------------------------------------------------------------------------

/// One applied category transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChangeLogEntry {
    pub id: Uuid,
    pub executed_at: DateTime<Utc>,
    pub member_id: MemberId,
    pub member_name: String,
    pub old_category: Category,
    pub new_category: Category,
    pub rule_id: RuleId,
    pub rule_name: String,
    /// Human-readable trigger, e.g. `age 42 ≥ 40`.
    pub reason: String,
}

impl ChangeLogEntry {
    /// Record `member` moving from its current category to `new_category`
    /// because of `rule`.
    pub fn record(
        member: &MemberSnapshot,
        new_category: &Category,
        rule: &Rule,
        reason: impl Into<String>,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            executed_at,
            member_id: member.id.clone(),
            member_name: member.name.clone(),
            old_category: member.category.clone(),
            new_category: new_category.clone(),
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            reason: reason.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChangeLogStore
// ---------------------------------------------------------------------------

/// Errors from a change log backend.
#[derive(Debug, thiserror::Error)]
pub enum ChangeLogError {
    #[error("change log storage failure: {0}")]
    Storage(String),
}

/// Durable, append-only store for [`ChangeLogEntry`] records.
#[async_trait]
pub trait ChangeLogStore: Send + Sync {
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), ChangeLogError>;

    /// At most `limit` entries, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<ChangeLogEntry>, ChangeLogError>;

    async fn count(&self) -> Result<u64, ChangeLogError>;

    /// Entries with `executed_at` in `[since, until]`.
    async fn count_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, ChangeLogError>;
}

/// Process-local change log. Entries are held in append order.
#[derive(Debug, Default)]
pub struct InMemoryChangeLog {
    entries: RwLock<Vec<ChangeLogEntry>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in append order.
    pub fn all(&self) -> Vec<ChangeLogEntry> {
        self.entries.read().clone()
    }
}

#[async_trait]
impl ChangeLogStore for InMemoryChangeLog {
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), ChangeLogError> {
        self.entries.write().push(entry);
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeLogEntry>, ChangeLogError> {
        let entries = self.entries.read();
        let mut ordered: Vec<(usize, &ChangeLogEntry)> = entries.iter().enumerate().collect();
        ordered.sort_by(|(ia, a), (ib, b)| {
            b.executed_at.cmp(&a.executed_at).then_with(|| ib.cmp(ia))
        });
        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn count(&self) -> Result<u64, ChangeLogError> {
        Ok(self.entries.read().len() as u64)
    }

    async fn count_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, ChangeLogError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| e.executed_at >= since && e.executed_at <= until)
            .count() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use memcat_core::Condition;

    fn entry(member: &str, at: DateTime<Utc>) -> ChangeLogEntry {
        let snapshot = MemberSnapshot::new(
            MemberId::new(member).unwrap(),
            member,
            Category::new("active").unwrap(),
        );
        let rule = Rule::new(
            RuleId::new("senator_rule").unwrap(),
            "Senators",
            Condition::HasSenatorId,
            Category::new("honorary").unwrap(),
            2,
        );
        ChangeLogEntry::record(
            &snapshot,
            &rule.target_category,
            &rule,
            "senator id S1 present",
            at,
        )
    }

    #[test]
    fn record_captures_transition() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let e = entry("m1", at);
        assert_eq!(e.old_category, "active");
        assert_eq!(e.new_category, "honorary");
        assert_eq!(e.rule_name, "Senators");
        assert_eq!(e.id.get_version_num(), 4);
    }

    #[tokio::test]
    async fn recent_is_newest_first_with_append_order_tiebreak() {
        let log = InMemoryChangeLog::new();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        log.append(entry("a", t0)).await.unwrap();
        log.append(entry("b", t0 + Duration::hours(1))).await.unwrap();
        log.append(entry("c", t0 + Duration::hours(1))).await.unwrap();
        log.append(entry("d", t0 - Duration::hours(1))).await.unwrap();

        let ids: Vec<String> = log
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.member_id.to_string())
            .collect();
        assert_eq!(ids, ["c", "b", "a", "d"]);
        assert_eq!(log.recent(2).await.unwrap().len(), 2);
        assert!(log.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn count_between_is_inclusive() {
        let log = InMemoryChangeLog::new();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();
        log.append(entry("a", t0 - Duration::days(7))).await.unwrap();
        log.append(entry("b", t0 - Duration::days(8))).await.unwrap();
        log.append(entry("c", t0)).await.unwrap();

        assert_eq!(log.count().await.unwrap(), 3);
        assert_eq!(
            log.count_between(t0 - Duration::days(7), t0).await.unwrap(),
            2
        );
    }
}

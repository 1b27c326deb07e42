//! Change log persistence: `rule_change_logs`.
//!
//! Rows are inserted once and never updated. Ordering ties on
//! `executed_at` are broken by the insertion sequence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memcat_core::{Category, MemberId, RuleId};
use memcat_engine::{ChangeLogEntry, ChangeLogError, ChangeLogStore};
use sqlx::PgPool;
use uuid::Uuid;

/// [`ChangeLogStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgChangeLog {
    pool: PgPool,
}

impl PgChangeLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row for a change log entry.
#[derive(Debug, sqlx::FromRow)]
struct ChangeLogRow {
    id: Uuid,
    executed_at: DateTime<Utc>,
    member_id: String,
    member_name: String,
    old_category: String,
    new_category: String,
    rule_id: String,
    rule_name: String,
    reason: String,
}

impl TryFrom<ChangeLogRow> for ChangeLogEntry {
    type Error = ChangeLogError;

    fn try_from(row: ChangeLogRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: memcat_core::ValidationError| {
            ChangeLogError::Storage(format!("corrupt change log row {id}: {e}"))
        };
        Ok(ChangeLogEntry {
            id,
            executed_at: row.executed_at,
            member_id: MemberId::new(row.member_id).map_err(corrupt)?,
            member_name: row.member_name,
            old_category: Category::new(row.old_category).map_err(corrupt)?,
            new_category: Category::new(row.new_category).map_err(corrupt)?,
            rule_id: RuleId::new(row.rule_id).map_err(corrupt)?,
            rule_name: row.rule_name,
            reason: row.reason,
        })
    }
}

fn storage(e: sqlx::Error) -> ChangeLogError {
    ChangeLogError::Storage(e.to_string())
}

fn to_count(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

#[async_trait]
impl ChangeLogStore for PgChangeLog {
    async fn append(&self, entry: ChangeLogEntry) -> Result<(), ChangeLogError> {
        sqlx::query(
            "INSERT INTO rule_change_logs (id, executed_at, member_id, member_name,
             old_category, new_category, rule_id, rule_name, reason)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id)
        .bind(entry.executed_at)
        .bind(entry.member_id.as_str())
        .bind(&entry.member_name)
        .bind(entry.old_category.as_str())
        .bind(entry.new_category.as_str())
        .bind(entry.rule_id.as_str())
        .bind(&entry.rule_name)
        .bind(&entry.reason)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<ChangeLogEntry>, ChangeLogError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ChangeLogRow>(
            "SELECT id, executed_at, member_id, member_name, old_category,
             new_category, rule_id, rule_name, reason
             FROM rule_change_logs
             ORDER BY executed_at DESC, seq DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(ChangeLogEntry::try_from).collect()
    }

    async fn count(&self) -> Result<u64, ChangeLogError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rule_change_logs")
            .fetch_one(&self.pool)
            .await
            .map_err(storage)?;
        Ok(to_count(n))
    }

    async fn count_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<u64, ChangeLogError> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM rule_change_logs
             WHERE executed_at >= $1 AND executed_at <= $2",
        )
        .bind(since)
        .bind(until)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(to_count(n))
    }
}

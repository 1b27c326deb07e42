//! Scheduler configuration persistence: the single `scheduler_config` row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use memcat_engine::{SchedulerConfig, SchedulerConfigStore, SchedulerStoreError};
use sqlx::PgPool;

const ROW_ID: i16 = 1;

/// [`SchedulerConfigStore`] backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgSchedulerConfigStore {
    pool: PgPool,
}

impl PgSchedulerConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SchedulerConfigRow {
    enabled: bool,
    interval_secs: i64,
    last_execution: Option<DateTime<Utc>>,
    next_execution: Option<DateTime<Utc>>,
}

impl TryFrom<SchedulerConfigRow> for SchedulerConfig {
    type Error = SchedulerStoreError;

    fn try_from(row: SchedulerConfigRow) -> Result<Self, Self::Error> {
        let interval_secs = u64::try_from(row.interval_secs).map_err(|_| {
            SchedulerStoreError(format!("stored interval is negative: {}", row.interval_secs))
        })?;
        Ok(SchedulerConfig {
            enabled: row.enabled,
            interval_secs,
            last_execution: row.last_execution,
            next_execution: row.next_execution,
        })
    }
}

fn storage(e: sqlx::Error) -> SchedulerStoreError {
    SchedulerStoreError(e.to_string())
}

#[async_trait]
impl SchedulerConfigStore for PgSchedulerConfigStore {
    async fn load(&self) -> Result<Option<SchedulerConfig>, SchedulerStoreError> {
        let row = sqlx::query_as::<_, SchedulerConfigRow>(
            "SELECT enabled, interval_secs, last_execution, next_execution
             FROM scheduler_config WHERE id = $1",
        )
        .bind(ROW_ID)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(SchedulerConfig::try_from).transpose()
    }

    async fn save(&self, config: &SchedulerConfig) -> Result<(), SchedulerStoreError> {
        let interval_secs = i64::try_from(config.interval_secs).map_err(|_| {
            SchedulerStoreError(format!("interval out of range: {}", config.interval_secs))
        })?;
        sqlx::query(
            "INSERT INTO scheduler_config (id, enabled, interval_secs, last_execution,
             next_execution, updated_at)
             VALUES ($1, $2, $3, $4, $5, NOW())
             ON CONFLICT (id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                interval_secs = EXCLUDED.interval_secs,
                last_execution = EXCLUDED.last_execution,
                next_execution = EXCLUDED.next_execution,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(ROW_ID)
        .bind(config.enabled)
        .bind(interval_secs)
        .bind(config.last_execution)
        .bind(config.next_execution)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }
}

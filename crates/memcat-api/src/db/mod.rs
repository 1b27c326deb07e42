//! # Database Persistence Layer
//!
//! Postgres persistence for the change log and the scheduler configuration
//! via SQLx.
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, change
//! log entries and scheduler settings survive restarts. When absent, the API
//! runs with in-memory stores (suitable for development and testing).
//!
//! The rule catalogue is configuration (`RULES_FILE`), not a table.

pub mod change_logs;
pub mod scheduler_config;

pub use change_logs::PgChangeLog;
pub use scheduler_config::PgSchedulerConfigStore;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only mode. \
                 Change log and scheduler state will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

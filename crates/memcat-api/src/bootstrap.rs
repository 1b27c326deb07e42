//! # Service Bootstrap
//!
//! Builds [`AppState`] from [`AppConfig`] at startup.
//!
//! ## Bootstrap Sequence
//!
//! 1. **Load rules** from `RULES_FILE`, or the built-in standard catalogue.
//! 2. **Select the member directory**: HTTP when `MEMBER_DIRECTORY_URL` is
//!    set, otherwise in-memory (seeded from `MEMBERS_FILE` when present).
//! 3. **Select stores**: Postgres when a pool exists, in-memory otherwise.
//! 4. **Restore the scheduler** from its persisted config, falling back to
//!    the environment defaults.
//!
//! The scheduler is not started here; the caller decides.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use memcat_directory::{DirectoryClientError, HttpMemberDirectory};
use memcat_engine::{
    BatchExecutor, ChangeLogStore, InMemoryChangeLog, InMemoryDirectory,
    InMemorySchedulerConfigStore, MemberDirectory, RegistryError, RuleRegistry, Scheduler,
    SchedulerConfigStore,
};
use sqlx::PgPool;

use crate::db::{PgChangeLog, PgSchedulerConfigStore};
use crate::state::{AppConfig, AppState};

/// Errors during service bootstrap.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("failed to load rules: {0}")]
    Rules(#[from] RegistryError),

    #[error("failed to read members file {path}: {source}")]
    MembersIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid members file {path}: {source}")]
    MembersJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to create member directory client: {0}")]
    Directory(#[from] DirectoryClientError),
}

/// Assemble application state from configuration and an optional pool.
pub async fn build_state(
    config: AppConfig,
    db_pool: Option<PgPool>,
) -> Result<AppState, BootstrapError> {
    let registry = match &config.rules_file {
        Some(path) => {
            let registry = RuleRegistry::from_path(path)?;
            tracing::info!(path = %path.display(), rules = registry.total(), "rules loaded");
            registry
        }
        None => {
            tracing::info!("RULES_FILE not set, using standard rules");
            RuleRegistry::standard()
        }
    };

    let directory = member_directory(&config)?;

    let (change_log, scheduler_store): (Arc<dyn ChangeLogStore>, Arc<dyn SchedulerConfigStore>) =
        match &db_pool {
            Some(pool) => (
                Arc::new(PgChangeLog::new(pool.clone())),
                Arc::new(PgSchedulerConfigStore::new(pool.clone())),
            ),
            None => (
                Arc::new(InMemoryChangeLog::new()),
                Arc::new(InMemorySchedulerConfigStore::new()),
            ),
        };

    let executor = Arc::new(BatchExecutor::new(
        registry.into_shared(),
        directory,
        change_log,
    ));
    let scheduler = Scheduler::restore(
        executor.clone(),
        scheduler_store,
        config.scheduler_defaults,
    )
    .await;

    tracing::info!(
        directory = executor.directory().name(),
        persistent = db_pool.is_some(),
        scheduler_enabled = scheduler.state().snapshot().enabled,
        "engine initialized"
    );

    Ok(AppState::with_components(
        config,
        executor,
        Arc::new(scheduler),
        db_pool,
    ))
}

fn member_directory(config: &AppConfig) -> Result<Arc<dyn MemberDirectory>, BootstrapError> {
    if let Some(directory) = &config.directory {
        tracing::info!(base_url = %directory.base_url, "using HTTP member directory");
        return Ok(Arc::new(HttpMemberDirectory::new(directory.clone())?));
    }
    match &config.members_file {
        Some(path) => {
            let directory = load_members(path)?;
            tracing::info!(
                path = %path.display(),
                members = directory.len(),
                "using in-memory member directory"
            );
            Ok(Arc::new(directory))
        }
        None => {
            tracing::warn!("no member directory configured, starting with no members");
            Ok(Arc::new(InMemoryDirectory::default()))
        }
    }
}

fn load_members(path: &Path) -> Result<InMemoryDirectory, BootstrapError> {
    let json = std::fs::read_to_string(path).map_err(|source| BootstrapError::MembersIo {
        path: path.to_path_buf(),
        source,
    })?;
    InMemoryDirectory::from_json(&json).map_err(|source| BootstrapError::MembersJson {
        path: path.to_path_buf(),
        source,
    })
}

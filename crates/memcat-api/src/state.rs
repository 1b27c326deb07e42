//! # Application State
//!
//! Shared state handed to every handler: the rule registry, the batch
//! executor (which owns the execution guard), the scheduler, and the
//! optional database pool.
//!
//! Configuration is read from the environment once at startup into
//! [`AppConfig`].

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use memcat_directory::config::ConfigError as DirectoryConfigError;
use memcat_directory::DirectoryConfig;
use memcat_engine::scheduler::DEFAULT_INTERVAL_SECS;
use memcat_engine::{
    BatchExecutor, ChangeLogStore, InMemoryChangeLog, InMemoryDirectory,
    InMemorySchedulerConfigStore, MemberDirectory, RuleRegistry, Scheduler, SchedulerConfig,
    SchedulerState, SharedRegistry,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Errors reading [`AppConfig`] from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error(transparent)]
    Directory(#[from] DirectoryConfigError),
}

/// Server configuration. Secrets are redacted by the nested configs' `Debug`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// YAML rule catalogue. `None` loads the built-in standard rules.
    pub rules_file: Option<PathBuf>,
    /// Remote member directory. When `None`, members come from
    /// `members_file` (or an empty in-memory directory).
    pub directory: Option<DirectoryConfig>,
    /// JSON array of member snapshots seeding the in-memory directory.
    pub members_file: Option<PathBuf>,
    /// Scheduler settings used when none are persisted.
    pub scheduler_defaults: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            rules_file: None,
            directory: None,
            members_file: None,
            scheduler_defaults: SchedulerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `PORT` | `8080` |
    /// | `RULES_FILE` | built-in standard rules |
    /// | `MEMBER_DIRECTORY_URL` | in-memory directory |
    /// | `MEMBERS_FILE` | empty in-memory directory |
    /// | `SCHEDULER_ENABLED` | `true` |
    /// | `SCHEDULER_INTERVAL_SECS` | `86400` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            port: env_parse("PORT")?.unwrap_or(defaults.port),
            rules_file: env_path("RULES_FILE"),
            directory: DirectoryConfig::from_env()?,
            members_file: env_path("MEMBERS_FILE"),
            scheduler_defaults: SchedulerConfig::new(
                env_parse("SCHEDULER_ENABLED")?.unwrap_or(true),
                env_parse("SCHEDULER_INTERVAL_SECS")?.unwrap_or(DEFAULT_INTERVAL_SECS),
            ),
        })
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared application state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Rule catalogue. Only activation flags change at runtime.
    pub registry: SharedRegistry,

    /// Runs rules; owns the engine-wide execution guard shared by manual
    /// and scheduled runs.
    pub executor: Arc<BatchExecutor>,

    pub scheduler: Arc<Scheduler>,

    /// PostgreSQL pool backing the change log and scheduler config.
    /// `None` means in-memory-only mode.
    pub db_pool: Option<PgPool>,

    pub config: AppConfig,
}

impl AppState {
    /// In-memory state with the standard rules and an empty member directory.
    pub fn new() -> Self {
        Self::in_memory(Arc::new(InMemoryDirectory::default()))
    }

    /// In-memory state with the standard rules over `directory`.
    pub fn in_memory(directory: Arc<dyn MemberDirectory>) -> Self {
        let executor = BatchExecutor::new(
            RuleRegistry::standard().into_shared(),
            directory,
            Arc::new(InMemoryChangeLog::new()),
        );
        Self::with_executor(AppConfig::default(), executor, None)
    }

    /// Wrap an executor with a fresh in-memory scheduler store.
    pub fn with_executor(
        config: AppConfig,
        executor: BatchExecutor,
        db_pool: Option<PgPool>,
    ) -> Self {
        let executor = Arc::new(executor);
        let scheduler = Scheduler::new(
            executor.clone(),
            SchedulerState::new(config.scheduler_defaults),
            Arc::new(InMemorySchedulerConfigStore::new()),
        );
        Self::with_components(config, executor, Arc::new(scheduler), db_pool)
    }

    /// Assemble state from already-built components.
    pub fn with_components(
        config: AppConfig,
        executor: Arc<BatchExecutor>,
        scheduler: Arc<Scheduler>,
        db_pool: Option<PgPool>,
    ) -> Self {
        Self {
            registry: executor.registry().clone(),
            executor,
            scheduler,
            db_pool,
            config,
        }
    }

    pub fn change_log(&self) -> &Arc<dyn ChangeLogStore> {
        self.executor.change_log()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

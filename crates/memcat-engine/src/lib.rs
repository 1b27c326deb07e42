//! # memcat-engine: Membership Categorization Engine
//!
//! Re-evaluates members against a prioritized catalogue of rules and moves
//! them into the category the first applicable rule names, recording every
//! transition in an append-only audit log.
//!
//! ## Components
//!
//! - **Registry** ([`registry`]): the rule catalogue, loaded once from YAML or
//!   the built-in standard set. Only activation flags change at runtime.
//!
//! - **Evaluator** ([`evaluation`]): pure predicate per condition kind,
//!   evaluated at one instant captured per run.
//!
//! - **Directory** ([`directory`]): the gateway trait to the member store
//!   with its single narrow write, `set_category`.
//!
//! - **Executor** ([`executor`]): the batch algorithm and the engine-wide
//!   execution guard that makes manual and scheduled runs mutually
//!   exclusive.
//!
//! - **Audit** ([`audit`]): change log entries and their store trait.
//!
//! - **Stats** ([`stats`]): dashboard counts derived on each call.
//!
//! - **Scheduler** ([`scheduler`]): interval timer driving full runs.
//!
//! ## Crate Policy
//!
//! - Depends only on `memcat-core` internally.
//! - Storage and transport sit behind `async_trait` seams; in-memory
//!   implementations live here, Postgres and HTTP ones in the outer crates.
//! - Locks are never held across `.await`.

pub mod audit;
pub mod directory;
pub mod evaluation;
pub mod executor;
pub mod registry;
pub mod scheduler;
pub mod stats;

pub use audit::{ChangeLogEntry, ChangeLogError, ChangeLogStore, InMemoryChangeLog};
pub use directory::{DirectoryError, InMemoryDirectory, MemberDirectory};
pub use evaluation::{evaluate, Evaluation, EvaluationContext};
pub use executor::{
    BatchExecutor, ExecutionError, ExecutionGuard, ExecutionPermit, PreviewEntry,
    RuleExecutionResult,
};
pub use registry::{RegistryError, RuleRegistry, SharedRegistry};
pub use scheduler::{
    InMemorySchedulerConfigStore, Scheduler, SchedulerConfig, SchedulerConfigStore,
    SchedulerConfigUpdate, SchedulerError, SchedulerState, SchedulerStatus, SchedulerStoreError,
};
pub use stats::EngineStats;

//! # Scheduler
//!
//! Periodically triggers a full run of every active rule.
//!
//! ## State Machine
//!
//! Two states, **Stopped** and **Running**:
//!
//! - `start()`: Stopped → Running, only when `config.enabled`. Arms a
//!   recurring timer with period `config.interval_secs`. Starting a running
//!   scheduler is a no-op.
//! - `stop()`: Running → Stopped. Idempotent.
//! - `toggle()`: stop if running, start if stopped.
//! - Tick (Running only): calls [`BatchExecutor::run_all`]. A tick that finds
//!   a run in flight is skipped, not queued. After a completed run,
//!   `last_execution = now` and `next_execution = now + interval` are written
//!   under one lock.
//!
//! Stopping never aborts an in-flight run: the timer task only observes the
//! stop signal between ticks.
//!
//! ## Ownership
//!
//! Configuration lives in an injectable [`SchedulerState`] rather than a
//! process-wide singleton, so independent schedulers can coexist.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use utoipa::ToSchema;

use crate::executor::{BatchExecutor, ExecutionError};

/// Default period between scheduled runs: one day.
pub const DEFAULT_INTERVAL_SECS: u64 = 86_400;

/// Longest accepted period: one year.
pub const MAX_INTERVAL_SECS: u64 = 365 * 86_400;

// ---------------------------------------------------------------------------
// SchedulerConfig
// ---------------------------------------------------------------------------

/// Persisted scheduler configuration and run timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Seconds between scheduled runs, within `1..=MAX_INTERVAL_SECS`.
    pub interval_secs: u64,
    pub last_execution: Option<DateTime<Utc>>,
    pub next_execution: Option<DateTime<Utc>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new(true, DEFAULT_INTERVAL_SECS)
    }
}

impl SchedulerConfig {
    pub fn new(enabled: bool, interval_secs: u64) -> Self {
        Self {
            enabled,
            interval_secs,
            last_execution: None,
            next_execution: None,
        }
    }

    fn period(&self) -> Result<Duration, SchedulerError> {
        validate_interval(self.interval_secs)?;
        Ok(Duration::from_secs(self.interval_secs))
    }
}

fn validate_interval(interval_secs: u64) -> Result<(), SchedulerError> {
    if (1..=MAX_INTERVAL_SECS).contains(&interval_secs) {
        Ok(())
    } else {
        Err(SchedulerError::InvalidInterval(interval_secs))
    }
}

/// Partial update for [`Scheduler::update_config`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchedulerConfigUpdate {
    pub enabled: Option<bool>,
    pub interval_secs: Option<u64>,
}

/// Read-only view returned by [`Scheduler::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SchedulerStatus {
    pub is_running: bool,
    /// Whether any rule execution, scheduled or manual, is in flight.
    pub execution_in_progress: bool,
    pub config: SchedulerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("scheduler is disabled")]
    Disabled,

    #[error("scheduler interval must be between 1 and {MAX_INTERVAL_SECS} seconds, got {0}")]
    InvalidInterval(u64),
}

// ---------------------------------------------------------------------------
// SchedulerState
// ---------------------------------------------------------------------------

/// Shared handle to one scheduler's configuration.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    config: Arc<RwLock<SchedulerConfig>>,
}

impl SchedulerState {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub fn snapshot(&self) -> SchedulerConfig {
        *self.config.read()
    }

    /// Record a completed run. Both timestamps change under one write lock.
    fn record_run(&self, now: DateTime<Utc>) -> SchedulerConfig {
        let mut config = self.config.write();
        config.last_execution = Some(now);
        config.next_execution = ChronoDuration::from_std(Duration::from_secs(config.interval_secs))
            .ok()
            .and_then(|interval| now.checked_add_signed(interval));
        *config
    }

    fn apply(&self, update: SchedulerConfigUpdate) -> SchedulerConfig {
        let mut config = self.config.write();
        if let Some(enabled) = update.enabled {
            config.enabled = enabled;
        }
        if let Some(interval_secs) = update.interval_secs {
            config.interval_secs = interval_secs;
        }
        *config
    }
}

// ---------------------------------------------------------------------------
// SchedulerConfigStore
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
#[error("scheduler config storage failure: {0}")]
pub struct SchedulerStoreError(pub String);

/// Durable home for the scheduler configuration.
#[async_trait]
pub trait SchedulerConfigStore: Send + Sync {
    async fn load(&self) -> Result<Option<SchedulerConfig>, SchedulerStoreError>;
    async fn save(&self, config: &SchedulerConfig) -> Result<(), SchedulerStoreError>;
}

#[derive(Debug, Default)]
pub struct InMemorySchedulerConfigStore {
    saved: RwLock<Option<SchedulerConfig>>,
}

impl InMemorySchedulerConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchedulerConfigStore for InMemorySchedulerConfigStore {
    async fn load(&self) -> Result<Option<SchedulerConfig>, SchedulerStoreError> {
        Ok(*self.saved.read())
    }

    async fn save(&self, config: &SchedulerConfig) -> Result<(), SchedulerStoreError> {
        *self.saved.write() = Some(*config);
        Ok(())
    }
}

async fn persist(store: &dyn SchedulerConfigStore, config: &SchedulerConfig) {
    if let Err(e) = store.save(config).await {
        tracing::warn!(error = %e, "failed to persist scheduler config");
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

struct TimerTask {
    stop: watch::Sender<bool>,
}

/// Interval scheduler driving [`BatchExecutor::run_all`].
pub struct Scheduler {
    executor: Arc<BatchExecutor>,
    state: SchedulerState,
    store: Arc<dyn SchedulerConfigStore>,
    timer: Mutex<Option<TimerTask>>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        executor: Arc<BatchExecutor>,
        state: SchedulerState,
        store: Arc<dyn SchedulerConfigStore>,
    ) -> Self {
        Self {
            executor,
            state,
            store,
            timer: Mutex::new(None),
        }
    }

    /// Build a scheduler from the persisted config, falling back to
    /// `defaults` when nothing is stored or the store cannot be read.
    pub async fn restore(
        executor: Arc<BatchExecutor>,
        store: Arc<dyn SchedulerConfigStore>,
        defaults: SchedulerConfig,
    ) -> Self {
        let config = match store.load().await {
            Ok(Some(config)) => config,
            Ok(None) => defaults,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load scheduler config, using defaults");
                defaults
            }
        };
        Self::new(executor, SchedulerState::new(config), store)
    }

    pub fn state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    /// Snapshot of the running flag and config. Never waits on a run.
    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            is_running: self.is_running(),
            execution_in_progress: self.executor.is_running(),
            config: self.state.snapshot(),
        }
    }

    /// Arm the timer.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Disabled`] when the config is disabled, and
    /// [`SchedulerError::InvalidInterval`] for an out-of-range interval. The
    /// scheduler stays stopped in both cases.
    pub async fn start(&self) -> Result<SchedulerStatus, SchedulerError> {
        let config = self.state.snapshot();
        if !config.enabled {
            return Err(SchedulerError::Disabled);
        }
        let period = config.period()?;
        let started = {
            let mut timer = self.timer.lock();
            if timer.is_some() {
                false
            } else {
                *timer = Some(self.spawn_timer(period));
                true
            }
        };
        if started {
            tracing::info!(interval_secs = config.interval_secs, "scheduler started");
            persist(self.store.as_ref(), &config).await;
        }
        Ok(self.status())
    }

    /// Disarm the timer. Stopping a stopped scheduler is a no-op.
    pub async fn stop(&self) -> SchedulerStatus {
        let stopped = self.take_timer();
        if stopped {
            tracing::info!("scheduler stopped");
            persist(self.store.as_ref(), &self.state.snapshot()).await;
        }
        self.status()
    }

    /// Stop if running, start if stopped.
    pub async fn toggle(&self) -> Result<SchedulerStatus, SchedulerError> {
        if self.is_running() {
            Ok(self.stop().await)
        } else {
            self.start().await
        }
    }

    /// Change `enabled` and/or the interval. Disabling a running scheduler
    /// stops it; a new interval re-arms a running timer.
    pub async fn update_config(
        &self,
        update: SchedulerConfigUpdate,
    ) -> Result<SchedulerStatus, SchedulerError> {
        if let Some(interval_secs) = update.interval_secs {
            validate_interval(interval_secs)?;
        }
        let before = self.state.snapshot();
        let config = self.state.apply(update);

        if self.is_running() {
            if !config.enabled {
                self.take_timer();
                tracing::info!("scheduler disabled and stopped");
            } else if config.interval_secs != before.interval_secs {
                let period = config.period()?;
                let mut timer = self.timer.lock();
                if let Some(old) = timer.take() {
                    let _ = old.stop.send(true);
                }
                *timer = Some(self.spawn_timer(period));
                tracing::info!(interval_secs = config.interval_secs, "scheduler re-armed");
            }
        }
        persist(self.store.as_ref(), &config).await;
        Ok(self.status())
    }

    fn take_timer(&self) -> bool {
        match self.timer.lock().take() {
            Some(task) => {
                let _ = task.stop.send(true);
                true
            }
            None => false,
        }
    }

    fn spawn_timer(&self, period: Duration) -> TimerTask {
        let (stop, mut stop_rx) = watch::channel(false);
        let executor = Arc::clone(&self.executor);
        let state = self.state.clone();
        let store = Arc::clone(&self.store);

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // A stop that lands during a run must win over the overdue tick.
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }
                if *stop_rx.borrow() {
                    break;
                }
                tick(&executor, &state, store.as_ref()).await;
            }
            tracing::debug!("scheduler timer exited");
        });

        TimerTask { stop }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(task) = self.timer.get_mut().take() {
            let _ = task.stop.send(true);
        }
    }
}

async fn tick(
    executor: &BatchExecutor,
    state: &SchedulerState,
    store: &dyn SchedulerConfigStore,
) {
    match executor.run_all().await {
        Ok(results) => {
            let config = state.record_run(executor.now());
            let changed: u32 = results.iter().map(|r| r.success_count).sum();
            let failed: u32 = results.iter().map(|r| r.failed_count).sum();
            tracing::info!(rules = results.len(), changed, failed, "scheduled run completed");
            persist(store, &config).await;
        }
        Err(ExecutionError::Busy) => {
            tracing::info!("scheduled tick skipped: a run is already in progress");
        }
        Err(e) => {
            tracing::warn!(error = %e, "scheduled run failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::InMemoryChangeLog;
    use crate::directory::{DirectoryError, InMemoryDirectory, MemberDirectory};
    use crate::registry::RuleRegistry;
    use memcat_core::{Category, MemberId, MemberSnapshot};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Takes `delay` to list members and counts how often it is asked.
    struct SlowDirectory {
        inner: InMemoryDirectory,
        delay: Duration,
        listed: AtomicUsize,
    }

    #[async_trait]
    impl MemberDirectory for SlowDirectory {
        fn name(&self) -> &str {
            "slow"
        }

        async fn list_members(&self) -> Result<Vec<MemberSnapshot>, DirectoryError> {
            self.listed.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.inner.list_members().await
        }

        async fn get_members(
            &self,
            ids: &[MemberId],
        ) -> Result<Vec<MemberSnapshot>, DirectoryError> {
            self.inner.get_members(ids).await
        }

        async fn set_category(
            &self,
            member_id: &MemberId,
            category: &Category,
        ) -> Result<(), DirectoryError> {
            self.inner.set_category(member_id, category).await
        }
    }

    type Fixture = (
        Scheduler,
        Arc<InMemoryChangeLog>,
        Arc<InMemorySchedulerConfigStore>,
    );

    fn senator() -> InMemoryDirectory {
        InMemoryDirectory::new([MemberSnapshot::new(
            MemberId::new("m1").unwrap(),
            "Ana",
            Category::new("active").unwrap(),
        )
        .with_senator_id("S1")])
    }

    fn scheduler(config: SchedulerConfig) -> Fixture {
        scheduler_over(Arc::new(senator()), config)
    }

    fn scheduler_over(directory: Arc<dyn MemberDirectory>, config: SchedulerConfig) -> Fixture {
        let log = Arc::new(InMemoryChangeLog::new());
        let executor = Arc::new(BatchExecutor::new(
            RuleRegistry::standard().into_shared(),
            directory,
            log.clone(),
        ));
        let store = Arc::new(InMemorySchedulerConfigStore::new());
        let scheduler = Scheduler::new(executor, SchedulerState::new(config), store.clone());
        (scheduler, log, store)
    }

    #[tokio::test]
    async fn start_rejected_when_disabled() {
        let (s, _, _) = scheduler(SchedulerConfig::new(false, 60));
        assert_eq!(s.start().await.unwrap_err(), SchedulerError::Disabled);
        assert!(!s.status().is_running);
    }

    #[tokio::test]
    async fn start_rejects_zero_interval() {
        let (s, _, _) = scheduler(SchedulerConfig::new(true, 0));
        assert_eq!(s.start().await.unwrap_err(), SchedulerError::InvalidInterval(0));
        assert!(!s.is_running());
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_toggle_flips() {
        let (s, _, _) = scheduler(SchedulerConfig::new(true, 60));
        assert!(!s.stop().await.is_running);

        assert!(s.toggle().await.unwrap().is_running);
        assert!(s.start().await.unwrap().is_running);
        assert!(!s.toggle().await.unwrap().is_running);
        assert!(!s.stop().await.is_running);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_runs_rules_and_records_timestamps() {
        let (s, log, store) = scheduler(SchedulerConfig::new(true, 60));
        s.start().await.unwrap();
        assert!(s.status().config.last_execution.is_none());

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        let config = s.status().config;
        let last = config.last_execution.unwrap();
        assert_eq!(config.next_execution.unwrap() - last, ChronoDuration::seconds(60));
        assert_eq!(log.all().len(), 1);
        assert_eq!(store.load().await.unwrap().unwrap().last_execution, Some(last));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_scheduler_does_not_tick() {
        let (s, log, _) = scheduler(SchedulerConfig::new(true, 60));
        s.start().await.unwrap();
        s.stop().await;
        tokio::time::sleep(Duration::from_secs(300)).await;
        tokio::task::yield_now().await;
        assert!(log.all().is_empty());
        assert!(s.status().config.last_execution.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_during_run_prevents_further_runs() {
        for _ in 0..20 {
            let directory = Arc::new(SlowDirectory {
                inner: senator(),
                delay: Duration::from_secs(150),
                listed: AtomicUsize::new(0),
            });
            let (s, log, _) = scheduler_over(directory.clone(), SchedulerConfig::new(true, 60));
            s.start().await.unwrap();

            // The t=60 run is still listing members at t=90.
            tokio::time::sleep(Duration::from_secs(90)).await;
            assert_eq!(directory.listed.load(Ordering::SeqCst), 1);
            assert!(!s.stop().await.is_running);

            tokio::time::sleep(Duration::from_secs(1_000)).await;
            tokio::task::yield_now().await;
            assert_eq!(directory.listed.load(Ordering::SeqCst), 1);
            // The in-flight run still completes.
            assert_eq!(log.all().len(), 1);
        }
    }

    #[tokio::test]
    async fn update_config_disables_running_scheduler() {
        let (s, _, store) = scheduler(SchedulerConfig::new(true, 60));
        s.start().await.unwrap();

        let status = s
            .update_config(SchedulerConfigUpdate {
                enabled: Some(false),
                interval_secs: None,
            })
            .await
            .unwrap();
        assert!(!status.is_running);
        assert!(!status.config.enabled);
        assert!(!store.load().await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn update_config_validates_interval() {
        let (s, _, _) = scheduler(SchedulerConfig::new(true, 60));
        let err = s
            .update_config(SchedulerConfigUpdate {
                enabled: None,
                interval_secs: Some(0),
            })
            .await
            .unwrap_err();
        assert_eq!(err, SchedulerError::InvalidInterval(0));
        let too_long = s
            .update_config(SchedulerConfigUpdate {
                enabled: None,
                interval_secs: Some(MAX_INTERVAL_SECS + 1),
            })
            .await;
        assert!(too_long.is_err());
        assert_eq!(s.status().config.interval_secs, 60);
    }

    #[tokio::test(start_paused = true)]
    async fn new_interval_rearms_timer() {
        let (s, log, _) = scheduler(SchedulerConfig::new(true, 3_600));
        s.start().await.unwrap();
        s.update_config(SchedulerConfigUpdate {
            enabled: None,
            interval_secs: Some(10),
        })
        .await
        .unwrap();
        assert!(s.is_running());

        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::task::yield_now().await;
        assert_eq!(log.all().len(), 1);
    }

    #[tokio::test]
    async fn restore_prefers_persisted_config() {
        let store = Arc::new(InMemorySchedulerConfigStore::new());
        store.save(&SchedulerConfig::new(false, 120)).await.unwrap();
        let executor = Arc::new(BatchExecutor::new(
            RuleRegistry::standard().into_shared(),
            Arc::new(InMemoryDirectory::default()),
            Arc::new(InMemoryChangeLog::new()),
        ));
        let s = Scheduler::restore(executor, store, SchedulerConfig::default()).await;
        assert_eq!(s.status().config, SchedulerConfig::new(false, 120));
    }
}

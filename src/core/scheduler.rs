//! The scheduler: a time-ordered pending set plus a single coordinating
//! thread that dispatches due items into named worker pools.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use crate::builders::{build_registry, build_registry_with_factory};
use crate::config::{SchedulerConfig, DEFAULT_POOL_NAME};
use crate::core::error::SchedulerError;
use crate::core::registry::PoolRegistry;
use crate::core::thread_factory::ThreadFactory;
use crate::core::work_item::{Action, PendingSet, WorkItem};

/// Lifecycle states of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Built from configuration; submissions are recorded but nothing runs.
    Configured,
    /// Coordinating loop is running; due items are dispatched.
    Started,
    /// Coordinating loop has exited; the pending set is abandoned.
    Stopped,
    /// Pools are shut down; no further submissions are accepted.
    Disposed,
}

impl LifecycleState {
    const fn name(self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Started => "started",
            Self::Stopped => "stopped",
            Self::Disposed => "disposed",
        }
    }
}

/// Pending set plus lifecycle, guarded by one mutex.
struct SchedulerState {
    lifecycle: LifecycleState,
    pending: PendingSet,
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    /// Signaled on every mutation that can change the earliest-due
    /// computation, and on lifecycle transitions.
    cond: Condvar,
    registry: PoolRegistry,
}

/// Background-task scheduler over a registry of worker pools.
///
/// One-shot and periodic actions are submitted with a delay and an optional
/// repeat interval and held in a time-ordered pending set. A single
/// coordinating thread, hosted by the `"default"` pool, wakes at the next
/// due time and dispatches due items to their target pools. The
/// coordinating thread never runs submitted actions itself.
///
/// Lifecycle: `Configured → Started → Stopped`, with `Disposed` reachable
/// from any state.
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Wrap an already-built registry in a scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the registry lacks a
    /// `"default"` pool to host the coordinating thread.
    pub fn new(registry: PoolRegistry) -> Result<Self, SchedulerError> {
        if registry.default_pool().is_none() {
            return Err(SchedulerError::InvalidConfig(
                "registry has no `default` pool to host the coordinating thread".into(),
            ));
        }
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(SchedulerState {
                    lifecycle: LifecycleState::Configured,
                    pending: PendingSet::new(),
                }),
                cond: Condvar::new(),
                registry,
            }),
        })
    }

    /// Build the pool registry from configuration and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for malformed descriptors.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(build_registry(config)?)
    }

    /// Build the pool registry from configuration using a caller-supplied
    /// thread factory.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] for malformed descriptors.
    pub fn from_config_with_factory(
        config: &SchedulerConfig,
        factory: Arc<dyn ThreadFactory>,
    ) -> Result<Self, SchedulerError> {
        Self::new(build_registry_with_factory(config, factory)?)
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.state.lock().lifecycle
    }

    /// The registry of pools owned by this scheduler.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry {
        &self.inner.registry
    }

    /// Number of items currently in the pending set.
    #[must_use]
    pub fn pending_items(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    /// Start the coordinating loop on the default pool.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] unless the scheduler is in
    /// `Configured` state, or a pool error if the loop cannot be hosted.
    pub fn start(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Configured {
                return Err(SchedulerError::InvalidState {
                    expected: LifecycleState::Configured.name(),
                    actual: state.lifecycle.name(),
                });
            }
            state.lifecycle = LifecycleState::Started;
        }

        let default_pool = self.inner.registry.default_pool().ok_or_else(|| {
            SchedulerError::InvalidConfig("default pool disappeared before start".into())
        })?;
        let inner = Arc::clone(&self.inner);
        if let Err(e) = default_pool.execute(move || coordinating_loop(&inner)) {
            self.inner.state.lock().lifecycle = LifecycleState::Configured;
            return Err(e.into());
        }
        info!("scheduler started");
        Ok(())
    }

    /// Run `action` once on the default pool as soon as possible.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute<F>(&self, action: F) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(DEFAULT_POOL_NAME, Duration::ZERO, Duration::ZERO, Arc::new(action))
    }

    /// Run `action` once on the default pool after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute_after<F>(&self, delay: Duration, action: F) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(DEFAULT_POOL_NAME, delay, Duration::ZERO, Arc::new(action))
    }

    /// Run `action` on the default pool after `delay`, then every
    /// `interval`, measured from each actual dispatch. A zero `interval`
    /// means one-shot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute_periodic<F>(
        &self,
        delay: Duration,
        interval: Duration,
        action: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(DEFAULT_POOL_NAME, delay, interval, Arc::new(action))
    }

    /// Run `action` once on the named pool as soon as possible.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute_in_pool<F>(&self, pool: &str, action: F) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(pool, Duration::ZERO, Duration::ZERO, Arc::new(action))
    }

    /// Run `action` once on the named pool after `delay`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute_after_in_pool<F>(
        &self,
        pool: &str,
        delay: Duration,
        action: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(pool, delay, Duration::ZERO, Arc::new(action))
    }

    /// Run `action` on the named pool after `delay`, then every `interval`,
    /// measured from each actual dispatch. A zero `interval` means one-shot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] after `dispose`.
    pub fn execute_periodic_in_pool<F>(
        &self,
        pool: &str,
        delay: Duration,
        interval: Duration,
        action: F,
    ) -> Result<(), SchedulerError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.schedule(pool, delay, interval, Arc::new(action))
    }

    /// Record a work item and signal the coordinating loop.
    ///
    /// Submissions are accepted in every state except `Disposed`; nothing
    /// runs until the scheduler is started.
    fn schedule(
        &self,
        pool: &str,
        delay: Duration,
        interval: Duration,
        action: Action,
    ) -> Result<(), SchedulerError> {
        let item = WorkItem {
            action,
            pool: pool.to_string(),
            interval: if interval.is_zero() { None } else { Some(interval) },
            next_run: Instant::now() + delay,
            seq: 0,
        };

        let mut state = self.inner.state.lock();
        if state.lifecycle == LifecycleState::Disposed {
            return Err(SchedulerError::InvalidState {
                expected: "configured, started, or stopped",
                actual: state.lifecycle.name(),
            });
        }
        debug!(
            pool = %item.pool,
            delay_ms = delay.as_millis() as u64,
            interval_ms = interval.as_millis() as u64,
            "work item recorded"
        );
        state.pending.insert(item);
        drop(state);
        self.inner.cond.notify_all();
        Ok(())
    }

    /// Stop the coordinating loop. The pending set is abandoned in place.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidState`] unless currently `Started`.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle != LifecycleState::Started {
                return Err(SchedulerError::InvalidState {
                    expected: LifecycleState::Started.name(),
                    actual: state.lifecycle.name(),
                });
            }
            state.lifecycle = LifecycleState::Stopped;
        }
        self.inner.cond.notify_all();
        info!("scheduler stopped");
        Ok(())
    }

    /// Stop the loop if needed, drop all pending items, and shut down every
    /// pool. Idempotent; reachable from any state.
    pub fn dispose(&self) {
        {
            let mut state = self.inner.state.lock();
            if state.lifecycle == LifecycleState::Disposed {
                return;
            }
            state.lifecycle = LifecycleState::Disposed;
            state.pending.clear();
        }
        self.inner.cond.notify_all();
        self.inner.registry.shutdown_all();
        info!("scheduler disposed");
    }
}

/// The single coordinating thread: wake at the next due time, dispatch the
/// due item to its pool, reinsert periodic items, repeat. Exits as soon as
/// the lifecycle leaves `Started`. Nothing thrown by a dispatched action can
/// reach this loop; pool invocations catch and log failures.
fn coordinating_loop(inner: &Arc<SchedulerInner>) {
    debug!("coordinating loop running");
    loop {
        let item = {
            let mut state = inner.state.lock();
            loop {
                if state.lifecycle != LifecycleState::Started {
                    debug!(
                        state = state.lifecycle.name(),
                        "coordinating loop exiting"
                    );
                    return;
                }
                match state.pending.peek_earliest_due() {
                    None => {
                        // Idle: sleep until a submission or stop() signals.
                        inner.cond.wait(&mut state);
                    }
                    Some(due_at) => {
                        let now = Instant::now();
                        if due_at <= now {
                            break state.pending.pop_earliest();
                        }
                        let _ = inner.cond.wait_for(&mut state, due_at - now);
                    }
                }
            }
        };

        let Some(mut item) = item else { continue };

        let dispatched_at = Instant::now();
        let action = Arc::clone(&item.action);
        match inner.registry.select(&item.pool) {
            Some(pool) => {
                debug!(pool = %pool.name(), seq = item.seq, "dispatching due item");
                if let Err(e) = pool.execute(move || action()) {
                    warn!(
                        pool = %item.pool,
                        seq = item.seq,
                        error = %e,
                        "dispatch failed"
                    );
                }
            }
            None => {
                error!(pool = %item.pool, "no pool available for dispatch, dropping item");
            }
        }

        if item.reschedule(dispatched_at) {
            let mut state = inner.state.lock();
            if state.lifecycle == LifecycleState::Started {
                state.pending.reinsert(item);
                drop(state);
                inner.cond.notify_all();
            }
        }
    }
}

//! Managed worker thread pool with min/max sizing, keep-alive expiry, and a
//! configurable saturation policy.
//!
//! Workers block on the hand-off queue; no polling anywhere. Closing the
//! queue at shutdown unblocks idle workers naturally, and queued jobs still
//! drain to workers when the shutdown is graceful.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{BlockPolicy, ThreadPoolConfig};
use crate::core::error::PoolError;
use crate::core::queue::{TakeError, TryPutError, WorkQueue};
use crate::core::thread_factory::ThreadFactory;

/// A unit of work handed to a pool.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A job plus the identity used in logs.
struct QueuedJob {
    id: u64,
    job: Job,
}

/// Pool statistics counters (lock-free atomics).
#[derive(Debug, Default)]
struct PoolCounters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of pool utilization.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Currently live worker threads.
    pub live_threads: usize,
    /// Jobs waiting in the hand-off queue.
    pub queued_jobs: usize,
    /// Jobs accepted by `execute`.
    pub submitted_jobs: u64,
    /// Jobs that ran to completion.
    pub completed_jobs: u64,
    /// Jobs that panicked while running.
    pub failed_jobs: u64,
    /// Jobs rejected or discarded by the saturation policy.
    pub rejected_jobs: u64,
}

/// Live-thread accounting, guarded by one pool-local mutex.
#[derive(Debug, Default)]
struct LiveState {
    live: usize,
    next_worker: usize,
}

/// State shared between the pool handle and its worker threads.
struct PoolShared {
    config: ThreadPoolConfig,
    queue: WorkQueue<QueuedJob>,
    counters: PoolCounters,
    live: Mutex<LiveState>,
    /// Intake stopped; set once by `shutdown`.
    shutdown: AtomicBool,
    /// Non-graceful stop: workers exit without running dequeued jobs.
    hard_stop: AtomicBool,
}

impl PoolShared {
    fn min_threads(&self) -> usize {
        usize::try_from(self.config.min_pool_size.max(1)).unwrap_or(1)
    }

    /// `None` means the pool may grow without bound.
    fn max_threads(&self) -> Option<usize> {
        if self.config.max_pool_size <= 0 {
            None
        } else {
            usize::try_from(self.config.max_pool_size).ok()
        }
    }

    fn keep_alive(&self) -> Option<Duration> {
        u64::try_from(self.config.keep_alive_time_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    /// Run one job, catching panics so a failing job never takes down the
    /// worker that ran it or the thread that submitted it.
    fn run_guarded(&self, queued: QueuedJob) {
        let id = queued.id;
        match panic::catch_unwind(AssertUnwindSafe(queued.job)) {
            Ok(()) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    pool = %self.config.name,
                    job_id = id,
                    panic = %panic_message(&payload),
                    "job panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

/// A managed set of worker threads pulling from a shared hand-off queue.
///
/// The live thread count stays between the configured minimum and maximum;
/// threads above the minimum that idle past the keep-alive expire. When both
/// the threads and the queue are saturated, the configured [`BlockPolicy`]
/// decides what happens to a newly submitted job.
pub struct WorkerPool {
    shared: Arc<PoolShared>,
    factory: Arc<dyn ThreadFactory>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    job_seq: AtomicU64,
}

impl WorkerPool {
    /// Create a pool and prestart its minimum worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] for bad settings or
    /// [`PoolError::Spawn`] if a worker thread cannot be created.
    pub fn new(
        config: ThreadPoolConfig,
        factory: Arc<dyn ThreadFactory>,
    ) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let shared = Arc::new(PoolShared {
            queue: WorkQueue::with_capacity(config.queue_size),
            config,
            counters: PoolCounters::default(),
            live: Mutex::new(LiveState::default()),
            shutdown: AtomicBool::new(false),
            hard_stop: AtomicBool::new(false),
        });

        let pool = Self {
            shared,
            factory,
            handles: Mutex::new(Vec::new()),
            job_seq: AtomicU64::new(0),
        };

        for _ in 0..pool.shared.min_threads() {
            pool.spawn_worker(None)?;
        }

        info!(
            pool = %pool.shared.config.name,
            min = pool.shared.config.min_pool_size,
            max = pool.shared.config.max_pool_size,
            queue_size = pool.shared.config.queue_size,
            block_policy = ?pool.shared.config.block_policy,
            "worker pool started"
        );
        Ok(pool)
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.config.name
    }

    /// Hand a job to a worker thread.
    ///
    /// If all threads are busy and the queue is full, the pool grows up to
    /// its maximum; past that, the configured saturation policy applies.
    ///
    /// # Errors
    ///
    /// - [`PoolError::PoolShutdown`] once `shutdown` has begun.
    /// - [`PoolError::Rejected`] under the ABORT policy at saturation.
    /// - [`PoolError::Spawn`] if growing the pool fails.
    pub fn execute<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return Err(PoolError::PoolShutdown(self.name().to_string()));
        }

        let id = self.job_seq.fetch_add(1, Ordering::Relaxed);
        self.shared.counters.submitted.fetch_add(1, Ordering::Relaxed);
        let queued = QueuedJob {
            id,
            job: Box::new(job),
        };

        // Below the floor, always grow and seed the new worker directly.
        if self.shared.live.lock().live < self.shared.min_threads() {
            return self.spawn_worker(Some(queued)).map(|_| ());
        }

        match self.shared.queue.try_put(queued) {
            Ok(()) => {
                debug!(pool = %self.name(), job_id = id, "job queued");
                Ok(())
            }
            Err(TryPutError::Closed(_)) => {
                Err(PoolError::PoolShutdown(self.name().to_string()))
            }
            Err(TryPutError::Full(queued)) => {
                let can_grow = {
                    let live = self.shared.live.lock().live;
                    self.shared.max_threads().map_or(true, |max| live < max)
                };
                if can_grow {
                    self.spawn_worker(Some(queued)).map(|_| ())
                } else {
                    self.apply_block_policy(queued)
                }
            }
        }
    }

    /// Apply the configured saturation policy to a job the queue refused.
    fn apply_block_policy(&self, queued: QueuedJob) -> Result<(), PoolError> {
        let id = queued.id;
        match self.shared.config.block_policy {
            BlockPolicy::Run => {
                debug!(pool = %self.name(), job_id = id, "pool saturated, running job on the calling thread");
                self.shared.run_guarded(queued);
                Ok(())
            }
            BlockPolicy::Wait => {
                debug!(pool = %self.name(), job_id = id, "pool saturated, blocking submitter until capacity frees");
                self.shared
                    .queue
                    .put(queued)
                    .map_err(|_| PoolError::QueueClosed)
            }
            BlockPolicy::Abort => {
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(pool = %self.name(), job_id = id, "pool saturated, rejecting job");
                Err(PoolError::Rejected(self.name().to_string()))
            }
            BlockPolicy::Discard => {
                self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(pool = %self.name(), job_id = id, "pool saturated, discarding job");
                Ok(())
            }
            BlockPolicy::DiscardOldest => {
                if let Some(oldest) = self.shared.queue.discard_oldest() {
                    self.shared.counters.rejected.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        pool = %self.name(),
                        job_id = oldest.id,
                        "pool saturated, discarded oldest queued job"
                    );
                }
                match self.shared.queue.try_put(queued) {
                    Ok(()) => Ok(()),
                    Err(TryPutError::Closed(_)) => {
                        Err(PoolError::PoolShutdown(self.name().to_string()))
                    }
                    Err(TryPutError::Full(queued)) => {
                        // A racing submitter refilled the slot; fall back to
                        // running in the caller rather than dropping work.
                        self.shared.run_guarded(queued);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Spawn one worker, optionally seeded with a first job.
    fn spawn_worker(&self, seed: Option<QueuedJob>) -> Result<(), PoolError> {
        let worker_id = {
            let mut live = self.shared.live.lock();
            live.live += 1;
            let id = live.next_worker;
            live.next_worker += 1;
            id
        };

        let shared = Arc::clone(&self.shared);
        let name = format!("{}-worker-{worker_id}", self.name());
        let handle = match self.factory.spawn(
            name,
            self.shared.config.priority,
            Box::new(move || worker_loop(&shared, seed)),
        ) {
            Ok(handle) => handle,
            Err(e) => {
                self.shared.live.lock().live -= 1;
                return Err(e);
            }
        };

        let mut handles = self.handles.lock();
        // Workers expired past keep-alive leave finished handles behind;
        // prune them here so the vec tracks live workers, not pool history.
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(())
    }

    /// Currently live worker threads.
    #[must_use]
    pub fn live_threads(&self) -> usize {
        self.shared.live.lock().live
    }

    /// Snapshot of the pool's counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            live_threads: self.live_threads(),
            queued_jobs: self.shared.queue.len(),
            submitted_jobs: self.shared.counters.submitted.load(Ordering::Relaxed),
            completed_jobs: self.shared.counters.completed.load(Ordering::Relaxed),
            failed_jobs: self.shared.counters.failed.load(Ordering::Relaxed),
            rejected_jobs: self.shared.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Whether shutdown has completed and no worker threads remain.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire) && self.live_threads() == 0
    }

    /// Stop accepting work and wind the pool down. Idempotent.
    ///
    /// In graceful mode queued jobs still drain and the call waits up to the
    /// configured shutdown wait time (negative: indefinitely; zero: not at
    /// all) for workers to finish. Otherwise workers exit before starting
    /// any newly dequeued job. A running job cannot be interrupted; workers
    /// that outlive the wait are detached with a warning.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        let graceful = self.shared.config.shutdown_graceful;
        info!(pool = %self.name(), graceful, "shutting down worker pool");

        if !graceful {
            self.shared.hard_stop.store(true, Ordering::Release);
        }
        self.shared.queue.close();

        let wait_ms = self.shared.config.shutdown_wait_time_ms;
        let mut handles = self.handles.lock();
        if wait_ms == 0 {
            let detached = handles.len();
            handles.clear();
            debug!(pool = %self.name(), detached, "no grace period, detaching workers");
            return;
        }

        let deadline = u64::try_from(wait_ms)
            .ok()
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        for handle in handles.drain(..) {
            match deadline {
                None => {
                    if handle.join().is_err() {
                        warn!(pool = %self.name(), "worker exited by panic during shutdown");
                    }
                }
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if !join_with_timeout(handle, remaining) {
                        warn!(
                            pool = %self.name(),
                            "worker did not exit within the shutdown wait, detaching"
                        );
                    }
                }
            }
        }
        info!(pool = %self.name(), "worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Unblock idle workers, but never join in Drop: an explicit
        // shutdown() is required for an orderly wind-down.
        if !self.shared.shutdown.swap(true, Ordering::AcqRel) {
            self.shared.hard_stop.store(true, Ordering::Release);
            self.shared.queue.close();
            debug!(pool = %self.name(), "pool dropped without explicit shutdown, detaching workers");
        }
    }
}

/// Join a worker through a helper thread so the wait can be bounded.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let joiner = std::thread::spawn(move || {
        let _ = tx.send(handle.join().is_ok());
    });
    match rx.recv_timeout(timeout) {
        Ok(_) => {
            let _ = joiner.join();
            true
        }
        Err(_) => false,
    }
}

/// Body of one worker thread.
fn worker_loop(shared: &PoolShared, seed: Option<QueuedJob>) {
    if let Some(seed) = seed {
        shared.run_guarded(seed);
    }

    loop {
        if shared.hard_stop.load(Ordering::Acquire) {
            break;
        }

        let queued = match shared.keep_alive() {
            Some(keep_alive) => match shared.queue.take_timeout(keep_alive) {
                Ok(queued) => queued,
                Err(TakeError::Timeout) => {
                    // Idle past keep-alive: expire only above the floor.
                    let mut live = shared.live.lock();
                    if live.live > shared.min_threads() {
                        live.live -= 1;
                        drop(live);
                        debug!(pool = %shared.config.name, "idle worker expired past keep-alive");
                        return;
                    }
                    continue;
                }
                Err(TakeError::Closed) => break,
            },
            None => match shared.queue.take() {
                Some(queued) => queued,
                None => break,
            },
        };

        // A hard stop abandons dequeued jobs instead of running them.
        if shared.hard_stop.load(Ordering::Acquire) {
            debug!(pool = %shared.config.name, job_id = queued.id, "hard stop, dropping dequeued job");
            break;
        }

        shared.run_guarded(queued);
    }

    shared.live.lock().live -= 1;
    debug!(pool = %shared.config.name, "worker exiting after shutdown");
}

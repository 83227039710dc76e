//! Error types for scheduler and pool operations.

use thiserror::Error;

/// Errors produced by a worker pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool is saturated and the ABORT policy rejected the job.
    #[error("pool `{0}` saturated, job rejected")]
    Rejected(String),
    /// The pool no longer accepts work.
    #[error("pool `{0}` has been shut down")]
    PoolShutdown(String),
    /// The hand-off queue was closed while submitting.
    #[error("work queue closed")]
    QueueClosed,
    /// The thread factory failed to spawn a worker.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
    /// Pool settings failed validation.
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Errors produced by the scheduler and its configuration surface.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Configuration was malformed; fatal at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A lifecycle operation was invoked in the wrong state.
    #[error("invalid scheduler state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the operation requires.
        expected: &'static str,
        /// State the scheduler was actually in.
        actual: &'static str,
    },
    /// A pool-level failure surfaced through the scheduler API.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;

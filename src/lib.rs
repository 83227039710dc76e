//! # cronpool
//!
//! A recurring-task scheduler backed by managed worker thread pools.
//!
//! This library provides a dedicated scheduling layer for background work:
//! one-shot and periodic jobs are submitted with a delay and an optional
//! repeat interval, held in a time-ordered pending set, and dispatched to
//! named pools of OS worker threads when they come due.
//!
//! ## Core pieces
//!
//! - **Scheduler**: owns the pending set and a single coordinating thread
//!   that wakes at the next due time and dispatches due items.
//! - **WorkerPool**: a managed set of worker threads with min/max sizing,
//!   keep-alive expiry for idle threads, and a configurable saturation
//!   policy for when threads and queue are both full.
//! - **PoolRegistry**: named pools built from configuration, always
//!   containing a `"default"` pool sized to also host the coordinating
//!   thread.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use cronpool::config::SchedulerConfig;
//! use cronpool::Scheduler;
//!
//! let scheduler = Scheduler::from_config(&SchedulerConfig::default())?;
//! scheduler.start()?;
//!
//! // Fire once, five seconds from now.
//! scheduler.execute_after(Duration::from_secs(5), || {
//!     println!("delayed job");
//! })?;
//!
//! // Fire every minute, starting immediately.
//! scheduler.execute_periodic(Duration::ZERO, Duration::from_secs(60), || {
//!     println!("periodic maintenance");
//! })?;
//!
//! scheduler.dispose();
//! ```
//!
//! Submitted actions run on pool worker threads, never on the coordinating
//! thread; a panicking action is caught and logged without affecting other
//! pending items or the coordinating loop.
//!
//! For complete examples, see `tests/scheduler_test.rs` and
//! `tests/worker_pool_test.rs`.

#![warn(clippy::all)]

/// Scheduler, worker pools, queues, and the pending work-item set.
pub mod core;
/// Configuration models for pool descriptors and scheduler defaults.
pub mod config;
/// Builders to construct a pool registry from configuration.
pub mod builders;
/// Shared utilities.
pub mod util;

pub use crate::core::{PoolRegistry, Scheduler, WorkerPool};

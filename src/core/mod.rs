//! Scheduler, worker pools, queues, and the pending work-item set.

pub mod error;
pub mod pool;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod thread_factory;
pub mod work_item;

pub use error::{AppResult, PoolError, SchedulerError};
pub use pool::{Job, PoolStats, WorkerPool};
pub use queue::{TakeError, TryPutError, WorkQueue};
pub use registry::PoolRegistry;
pub use scheduler::{LifecycleState, Scheduler};
pub use thread_factory::{DefaultThreadFactory, ThreadFactory};
pub use work_item::{Action, PendingSet, WorkItem};

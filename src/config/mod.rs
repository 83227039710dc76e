//! Configuration models for pool descriptors and scheduler defaults.

pub mod pool;

pub use pool::{
    BlockPolicy, SchedulerConfig, ThreadFactoryConfig, ThreadPoolConfig, ThreadPriority,
    DEFAULT_KEEP_ALIVE_MS, DEFAULT_MAX_POOL_SIZE, DEFAULT_MIN_POOL_SIZE, DEFAULT_POOL_NAME,
    DEFAULT_QUEUE_SIZE, DEFAULT_SHUTDOWN_WAIT_MS,
};

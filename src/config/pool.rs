//! Pool descriptor and scheduler configuration structures.

use serde::{Deserialize, Serialize};

/// Name of the always-present pool that also hosts the coordinating thread.
pub const DEFAULT_POOL_NAME: &str = "default";

/// Floor for the default pool's minimum size; one slot is reserved for the
/// coordinating thread itself.
pub const DEFAULT_MIN_POOL_SIZE: i64 = 5;

/// Stock maximum pool size.
pub const DEFAULT_MAX_POOL_SIZE: i64 = 5;

/// Stock keep-alive for idle threads above the minimum, in milliseconds.
pub const DEFAULT_KEEP_ALIVE_MS: i64 = 60_000;

/// Stock queue size; negative means unbounded.
pub const DEFAULT_QUEUE_SIZE: i64 = -1;

/// Stock shutdown wait time; negative means wait indefinitely.
pub const DEFAULT_SHUTDOWN_WAIT_MS: i64 = -1;

/// Thread factory selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadFactoryConfig {
    /// Built-in factory using `std::thread::Builder`.
    #[default]
    Default,
}

/// Priority tag applied to worker threads by the thread factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThreadPriority {
    /// Lowest priority.
    Min,
    /// Normal priority.
    #[default]
    Norm,
    /// Highest priority.
    Max,
}

/// Behavior when a pool's threads and queue are both saturated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BlockPolicy {
    /// Run the job synchronously on the calling thread.
    #[default]
    Run,
    /// Block the caller until queue capacity frees.
    Wait,
    /// Reject the job with an error.
    Abort,
    /// Silently drop the new job.
    Discard,
    /// Drop the oldest queued job and accept the new one.
    DiscardOldest,
}

/// Descriptor for one worker thread pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPoolConfig {
    /// Unique pool name.
    pub name: String,
    /// Hand-off queue size: `< 0` unbounded, `0` synchronous hand-off,
    /// `> 0` bounded.
    #[serde(default = "default_queue_size")]
    pub queue_size: i64,
    /// Maximum live threads; `<= 0` means unbounded.
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: i64,
    /// Minimum live threads kept while the pool is active.
    #[serde(default = "default_min_pool_size")]
    pub min_pool_size: i64,
    /// Priority tag for worker threads.
    #[serde(default)]
    pub priority: ThreadPriority,
    /// Idle time after which threads above the minimum terminate.
    #[serde(default = "default_keep_alive_ms")]
    pub keep_alive_time_ms: i64,
    /// Saturation policy.
    #[serde(default)]
    pub block_policy: BlockPolicy,
    /// Whether shutdown lets queued and in-flight work finish.
    #[serde(default)]
    pub shutdown_graceful: bool,
    /// How long a graceful shutdown waits for workers, in milliseconds;
    /// `< 0` waits indefinitely, `0` grants no grace period.
    #[serde(default = "default_shutdown_wait_ms")]
    pub shutdown_wait_time_ms: i64,
}

fn default_queue_size() -> i64 {
    DEFAULT_QUEUE_SIZE
}

fn default_max_pool_size() -> i64 {
    DEFAULT_MAX_POOL_SIZE
}

fn default_min_pool_size() -> i64 {
    DEFAULT_MIN_POOL_SIZE
}

fn default_keep_alive_ms() -> i64 {
    DEFAULT_KEEP_ALIVE_MS
}

fn default_shutdown_wait_ms() -> i64 {
    DEFAULT_SHUTDOWN_WAIT_MS
}

impl ThreadPoolConfig {
    /// Create a descriptor with stock defaults for the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue_size: DEFAULT_QUEUE_SIZE,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            min_pool_size: DEFAULT_MIN_POOL_SIZE,
            priority: ThreadPriority::default(),
            keep_alive_time_ms: DEFAULT_KEEP_ALIVE_MS,
            block_policy: BlockPolicy::default(),
            shutdown_graceful: false,
            shutdown_wait_time_ms: DEFAULT_SHUTDOWN_WAIT_MS,
        }
    }

    /// Descriptor for the auto-created default pool.
    #[must_use]
    pub fn default_pool() -> Self {
        Self::new(DEFAULT_POOL_NAME)
    }

    /// Set the queue size.
    #[must_use]
    pub const fn with_queue_size(mut self, queue_size: i64) -> Self {
        self.queue_size = queue_size;
        self
    }

    /// Set the maximum pool size.
    #[must_use]
    pub const fn with_max_pool_size(mut self, max_pool_size: i64) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    /// Set the minimum pool size.
    #[must_use]
    pub const fn with_min_pool_size(mut self, min_pool_size: i64) -> Self {
        self.min_pool_size = min_pool_size;
        self
    }

    /// Set the thread priority tag.
    #[must_use]
    pub const fn with_priority(mut self, priority: ThreadPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the idle keep-alive time in milliseconds.
    #[must_use]
    pub const fn with_keep_alive_time_ms(mut self, keep_alive_time_ms: i64) -> Self {
        self.keep_alive_time_ms = keep_alive_time_ms;
        self
    }

    /// Set the saturation policy.
    #[must_use]
    pub const fn with_block_policy(mut self, block_policy: BlockPolicy) -> Self {
        self.block_policy = block_policy;
        self
    }

    /// Set the graceful-shutdown flag and wait time.
    #[must_use]
    pub const fn with_shutdown(mut self, graceful: bool, wait_time_ms: i64) -> Self {
        self.shutdown_graceful = graceful;
        self.shutdown_wait_time_ms = wait_time_ms;
        self
    }

    /// Validate descriptor values.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message for the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("pool name must not be empty".into());
        }
        if self.min_pool_size < 1 {
            return Err("min_pool_size must be at least 1".into());
        }
        if self.max_pool_size > 0 && self.min_pool_size > self.max_pool_size {
            return Err(format!(
                "min_pool_size {} exceeds max_pool_size {}",
                self.min_pool_size, self.max_pool_size
            ));
        }
        if self.keep_alive_time_ms < 0 {
            return Err("keep_alive_time_ms must not be negative".into());
        }
        Ok(())
    }
}

/// Root scheduler configuration.
///
/// An empty pool list is valid: the registry builder auto-creates the
/// `"default"` pool whenever no descriptor names it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Thread factory selection.
    #[serde(default)]
    pub thread_factory: ThreadFactoryConfig,
    /// Pool descriptors, keyed by their unique names.
    #[serde(default)]
    pub thread_pools: Vec<ThreadPoolConfig>,
}

impl SchedulerConfig {
    /// Validate all pool descriptors and name uniqueness.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message for the first invalid descriptor.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for pool in &self.thread_pools {
            pool.validate()
                .map_err(|e| format!("pool `{}` invalid: {e}", pool.name))?;
            if !seen.insert(pool.name.as_str()) {
                return Err(format!("duplicate pool name `{}`", pool.name));
            }
        }
        Ok(())
    }

    /// Parse scheduler configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a descriptive message if parsing or validation fails.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

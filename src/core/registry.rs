//! Named registry of worker pools.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::config::{ThreadPoolConfig, DEFAULT_POOL_NAME};
use crate::core::error::PoolError;
use crate::core::pool::WorkerPool;
use crate::core::thread_factory::ThreadFactory;

/// A named mapping from pool name to [`WorkerPool`] instance.
///
/// Owned by the scheduler rather than held in ambient global state.
/// Registries built from configuration always contain a `"default"` pool;
/// dispatches naming an unknown pool fall back to it with a warning.
pub struct PoolRegistry {
    pools: RwLock<HashMap<String, Arc<WorkerPool>>>,
    factory: Arc<dyn ThreadFactory>,
    anon_seq: AtomicU64,
}

impl PoolRegistry {
    /// Create an empty registry backed by the given thread factory.
    #[must_use]
    pub fn new(factory: Arc<dyn ThreadFactory>) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            factory,
            anon_seq: AtomicU64::new(0),
        }
    }

    /// Create and register a pool from its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] for bad settings or a duplicate
    /// name, or [`PoolError::Spawn`] if worker threads cannot be created.
    pub fn add_pool(&self, config: ThreadPoolConfig) -> Result<Arc<WorkerPool>, PoolError> {
        if self.pools.read().contains_key(&config.name) {
            return Err(PoolError::InvalidConfig(format!(
                "pool `{}` already registered",
                config.name
            )));
        }
        let name = config.name.clone();
        let pool = Arc::new(WorkerPool::new(config, Arc::clone(&self.factory))?);
        self.pools.write().insert(name, Arc::clone(&pool));
        Ok(pool)
    }

    /// Create and register an anonymous pool for one-off needs.
    ///
    /// The descriptor's name is replaced with a generated `"anon-N"` name.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`PoolRegistry::add_pool`].
    pub fn create_pool(
        &self,
        mut config: ThreadPoolConfig,
    ) -> Result<Arc<WorkerPool>, PoolError> {
        let n = self.anon_seq.fetch_add(1, Ordering::Relaxed);
        config.name = format!("anon-{n}");
        info!(pool = %config.name, "creating anonymous pool");
        self.add_pool(config)
    }

    /// Look up a pool by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<WorkerPool>> {
        self.pools.read().get(name).cloned()
    }

    /// The always-present default pool, if registered.
    #[must_use]
    pub fn default_pool(&self) -> Option<Arc<WorkerPool>> {
        self.get(DEFAULT_POOL_NAME)
    }

    /// Resolve a pool for dispatch, substituting the default pool (with a
    /// warning) when the name is unknown.
    #[must_use]
    pub fn select(&self, name: &str) -> Option<Arc<WorkerPool>> {
        if let Some(pool) = self.get(name) {
            return Some(pool);
        }
        warn!(pool = %name, "unknown pool requested, falling back to the default pool");
        self.default_pool()
    }

    /// Names of all registered pools.
    #[must_use]
    pub fn pool_names(&self) -> Vec<String> {
        self.pools.read().keys().cloned().collect()
    }

    /// Shut down every registered pool. Idempotent.
    pub fn shutdown_all(&self) {
        let pools: Vec<Arc<WorkerPool>> = self.pools.read().values().cloned().collect();
        for pool in pools {
            pool.shutdown();
        }
    }
}

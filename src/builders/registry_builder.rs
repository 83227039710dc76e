//! Construction of a [`PoolRegistry`] from scheduler configuration.

use std::sync::Arc;

use tracing::info;

use crate::config::{
    SchedulerConfig, ThreadFactoryConfig, ThreadPoolConfig, DEFAULT_MIN_POOL_SIZE,
    DEFAULT_POOL_NAME,
};
use crate::core::error::SchedulerError;
use crate::core::registry::PoolRegistry;
use crate::core::thread_factory::{DefaultThreadFactory, ThreadFactory};

/// Build a registry with one pool per descriptor.
///
/// If no descriptor names the `"default"` pool, one is created with stock
/// defaults. A user-supplied `"default"` pool with a minimum below
/// [`DEFAULT_MIN_POOL_SIZE`] has it raised: that pool also hosts the
/// scheduler's coordinating thread and must never be sized at zero.
///
/// # Errors
///
/// Returns [`SchedulerError::InvalidConfig`] for malformed descriptors; on
/// failure, pools already created are shut down before returning.
pub fn build_registry(config: &SchedulerConfig) -> Result<PoolRegistry, SchedulerError> {
    let factory: Arc<dyn ThreadFactory> = match config.thread_factory {
        ThreadFactoryConfig::Default => Arc::new(DefaultThreadFactory),
    };
    build_registry_with_factory(config, factory)
}

/// Build a registry like [`build_registry`], but spawn worker threads
/// through the supplied factory instead of the configured one.
///
/// # Errors
///
/// Same failure modes as [`build_registry`].
pub fn build_registry_with_factory(
    config: &SchedulerConfig,
    factory: Arc<dyn ThreadFactory>,
) -> Result<PoolRegistry, SchedulerError> {
    config.validate().map_err(SchedulerError::InvalidConfig)?;
    let registry = PoolRegistry::new(factory);

    match populate(&registry, config) {
        Ok(()) => Ok(registry),
        Err(e) => {
            registry.shutdown_all();
            Err(e)
        }
    }
}

fn populate(registry: &PoolRegistry, config: &SchedulerConfig) -> Result<(), SchedulerError> {
    let mut has_default = false;
    for descriptor in &config.thread_pools {
        let mut descriptor = descriptor.clone();
        if descriptor.name == DEFAULT_POOL_NAME {
            has_default = true;
            if descriptor.min_pool_size < DEFAULT_MIN_POOL_SIZE {
                info!(
                    configured = descriptor.min_pool_size,
                    raised_to = DEFAULT_MIN_POOL_SIZE,
                    "raising minimum size of the default pool"
                );
                descriptor.min_pool_size = DEFAULT_MIN_POOL_SIZE;
                if descriptor.max_pool_size > 0
                    && descriptor.max_pool_size < descriptor.min_pool_size
                {
                    descriptor.max_pool_size = descriptor.min_pool_size;
                }
            }
        }
        registry.add_pool(descriptor)?;
    }

    if !has_default {
        info!("no default pool configured, creating one with stock defaults");
        registry.add_pool(ThreadPoolConfig::default_pool())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_pool_is_auto_created() {
        let cfg = SchedulerConfig {
            thread_factory: ThreadFactoryConfig::Default,
            thread_pools: vec![ThreadPoolConfig::new("background")
                .with_min_pool_size(1)
                .with_max_pool_size(2)],
        };
        let registry = build_registry(&cfg).unwrap();
        let default = registry.default_pool().unwrap();
        assert!(default.live_threads() >= 5);
        assert!(registry.get("background").is_some());
        registry.shutdown_all();
    }

    #[test]
    fn undersized_default_pool_is_raised() {
        let cfg = SchedulerConfig {
            thread_factory: ThreadFactoryConfig::Default,
            thread_pools: vec![ThreadPoolConfig::new(DEFAULT_POOL_NAME)
                .with_min_pool_size(1)
                .with_max_pool_size(2)],
        };
        let registry = build_registry(&cfg).unwrap();
        assert!(registry.default_pool().unwrap().live_threads() >= 5);
        registry.shutdown_all();
    }

    #[test]
    fn invalid_descriptor_aborts_the_build() {
        let cfg = SchedulerConfig {
            thread_factory: ThreadFactoryConfig::Default,
            thread_pools: vec![ThreadPoolConfig::new("bad").with_min_pool_size(0)],
        };
        assert!(matches!(
            build_registry(&cfg),
            Err(SchedulerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn caller_supplied_factory_spawns_the_workers() {
        use crate::config::ThreadPriority;
        use crate::core::error::PoolError;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::thread::JoinHandle;

        struct CountingFactory {
            spawned: AtomicUsize,
        }
        impl ThreadFactory for CountingFactory {
            fn spawn(
                &self,
                name: String,
                priority: ThreadPriority,
                body: Box<dyn FnOnce() + Send + 'static>,
            ) -> Result<JoinHandle<()>, PoolError> {
                self.spawned.fetch_add(1, Ordering::Relaxed);
                DefaultThreadFactory.spawn(name, priority, body)
            }
        }

        let factory = Arc::new(CountingFactory {
            spawned: AtomicUsize::new(0),
        });
        let registry = build_registry_with_factory(
            &SchedulerConfig::default(),
            Arc::clone(&factory) as Arc<dyn ThreadFactory>,
        )
        .unwrap();
        // The auto-created default pool prestarts its five minimum workers.
        assert_eq!(factory.spawned.load(Ordering::Relaxed), 5);
        registry.shutdown_all();
    }

    #[test]
    fn empty_config_yields_just_the_default_pool() {
        let registry = build_registry(&SchedulerConfig::default()).unwrap();
        let mut names = registry.pool_names();
        names.sort();
        assert_eq!(names, [DEFAULT_POOL_NAME]);
        registry.shutdown_all();
    }
}

//! Pluggable worker-thread creation.

use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::config::ThreadPriority;
use crate::core::error::PoolError;

/// Strategy for creating worker threads.
///
/// Implementations name each thread and tag it with the configured
/// priority. The built-in factory records the tag; platform-specific
/// implementations may additionally apply an OS-level priority.
pub trait ThreadFactory: Send + Sync + 'static {
    /// Spawn a thread running `body` under the given name and priority tag.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the OS rejects the thread creation.
    fn spawn(
        &self,
        name: String,
        priority: ThreadPriority,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> Result<JoinHandle<()>, PoolError>;
}

/// Built-in factory using [`std::thread::Builder`].
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultThreadFactory;

impl ThreadFactory for DefaultThreadFactory {
    fn spawn(
        &self,
        name: String,
        priority: ThreadPriority,
        body: Box<dyn FnOnce() + Send + 'static>,
    ) -> Result<JoinHandle<()>, PoolError> {
        debug!(thread = %name, priority = ?priority, "spawning worker thread");
        thread::Builder::new()
            .name(name)
            .spawn(body)
            .map_err(|e| PoolError::Spawn(e.to_string()))
    }
}

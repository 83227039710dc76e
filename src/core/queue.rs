//! Blocking FIFO hand-off queue between submitters and worker threads.

use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

/// Outcome of a non-blocking [`WorkQueue::try_put`].
#[derive(Debug)]
pub enum TryPutError<T> {
    /// The queue is at capacity; the item is handed back to the caller.
    Full(T),
    /// The queue was closed; the item is handed back to the caller.
    Closed(T),
}

/// Outcome of a timed [`WorkQueue::take_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeError {
    /// No item arrived within the timeout.
    Timeout,
    /// The queue was closed and fully drained.
    Closed,
}

/// A blocking, FIFO hand-off channel between submitters and workers.
///
/// Capacity modes: `capacity < 0` is unbounded, `capacity == 0` is a
/// rendezvous (synchronous hand-off, `put` blocks until a worker takes),
/// `capacity > 0` is bounded. Closing the queue drops the sender so idle
/// workers unblock; items already queued still drain to takers.
pub struct WorkQueue<T> {
    tx: Mutex<Option<Sender<T>>>,
    rx: Receiver<T>,
}

impl<T> WorkQueue<T> {
    /// Create a queue with the given capacity mode.
    #[must_use]
    pub fn with_capacity(capacity: i64) -> Self {
        let (tx, rx) = if capacity < 0 {
            unbounded()
        } else {
            // capacity 0 yields a rendezvous channel
            bounded(usize::try_from(capacity).unwrap_or(usize::MAX))
        };
        Self {
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Insert an item, blocking the caller while the queue is at capacity.
    ///
    /// Returns the item back if the queue was closed.
    pub fn put(&self, item: T) -> Result<(), T> {
        // Clone the sender under a brief lock so the blocking send itself
        // never holds the mutex.
        let tx = match self.tx.lock().as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(item),
        };
        tx.send(item).map_err(|e| e.into_inner())
    }

    /// Insert an item without blocking.
    pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
        let tx = match self.tx.lock().as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(TryPutError::Closed(item)),
        };
        match tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(item)) => Err(TryPutError::Full(item)),
            Err(TrySendError::Disconnected(item)) => Err(TryPutError::Closed(item)),
        }
    }

    /// Remove and return the earliest-inserted item, blocking while empty.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub fn take(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Remove and return the earliest-inserted item, waiting at most
    /// `timeout`.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => TakeError::Timeout,
            RecvTimeoutError::Disconnected => TakeError::Closed,
        })
    }

    /// Remove and return the oldest queued item from the submit side.
    ///
    /// Used by the discard-oldest saturation policy; does not block.
    pub fn discard_oldest(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Exact number of items currently between `put` and `take`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Stop accepting new items. Queued items still drain to takers.
    pub fn close(&self) {
        let mut tx = self.tx.lock();
        *tx = None;
    }

    /// Whether [`WorkQueue::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

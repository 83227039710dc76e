//! Scheduled work items and the time-ordered pending set.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A repeatable action shared between the pending set and pool dispatches.
pub type Action = Arc<dyn Fn() + Send + Sync + 'static>;

/// A unit of schedulable work plus its timing metadata.
///
/// Items are totally ordered by `(next_run, seq)`: earliest due time first,
/// insertion order breaking ties.
pub struct WorkItem {
    /// The action to run on dispatch.
    pub action: Action,
    /// Name of the pool this item is dispatched to.
    pub pool: String,
    /// Repeat interval; `None` means one-shot.
    pub interval: Option<Duration>,
    /// Earliest time at which the item may execute.
    pub next_run: Instant,
    /// Insertion sequence number, assigned by the pending set.
    pub seq: u64,
}

impl WorkItem {
    /// Recompute `next_run` for a periodic item after dispatch.
    ///
    /// The interval is measured from the actual dispatch time, not the ideal
    /// firing time: a stalled coordinator absorbs missed ticks instead of
    /// firing a catch-up burst.
    pub fn reschedule(&mut self, dispatched_at: Instant) -> bool {
        match self.interval {
            Some(interval) => {
                self.next_run = dispatched_at + interval;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("pool", &self.pool)
            .field("interval", &self.interval)
            .field("next_run", &self.next_run)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}

impl PartialEq for WorkItem {
    fn eq(&self, other: &Self) -> bool {
        self.next_run == other.next_run && self.seq == other.seq
    }
}

impl Eq for WorkItem {}

impl PartialOrd for WorkItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WorkItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_run
            .cmp(&other.next_run)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Binary min-heap of pending work items.
///
/// Not synchronized itself; the scheduler guards it with a single mutex and
/// signals its condvar on every mutation that can change the earliest-due
/// computation.
#[derive(Default)]
pub struct PendingSet {
    heap: BinaryHeap<Reverse<WorkItem>>,
    next_seq: u64,
}

impl PendingSet {
    /// Create an empty pending set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, assigning it the next insertion sequence number.
    pub fn insert(&mut self, mut item: WorkItem) {
        item.seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(item));
    }

    /// Reinsert a rescheduled periodic item, keeping its sequence number.
    pub fn reinsert(&mut self, item: WorkItem) {
        self.heap.push(Reverse(item));
    }

    /// Due time of the earliest pending item, if any.
    #[must_use]
    pub fn peek_earliest_due(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(item)| item.next_run)
    }

    /// Remove and return the earliest pending item.
    pub fn pop_earliest(&mut self) -> Option<WorkItem> {
        self.heap.pop().map(|Reverse(item)| item)
    }

    /// Number of pending items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drop all pending items.
    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(pool: &str, next_run: Instant) -> WorkItem {
        WorkItem {
            action: Arc::new(|| {}),
            pool: pool.to_string(),
            interval: None,
            next_run,
            seq: 0,
        }
    }

    #[test]
    fn pop_order_follows_next_run() {
        let base = Instant::now();
        let mut pending = PendingSet::new();
        pending.insert(item("a", base + Duration::from_millis(30)));
        pending.insert(item("b", base + Duration::from_millis(10)));
        pending.insert(item("c", base + Duration::from_millis(20)));

        let order: Vec<String> = std::iter::from_fn(|| pending.pop_earliest())
            .map(|i| i.pool)
            .collect();
        assert_eq!(order, ["b", "c", "a"]);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let due = Instant::now() + Duration::from_millis(5);
        let mut pending = PendingSet::new();
        for name in ["first", "second", "third"] {
            pending.insert(item(name, due));
        }

        let order: Vec<String> = std::iter::from_fn(|| pending.pop_earliest())
            .map(|i| i.pool)
            .collect();
        assert_eq!(order, ["first", "second", "third"]);
    }

    #[test]
    fn peek_reports_earliest_without_removal() {
        let base = Instant::now();
        let mut pending = PendingSet::new();
        assert!(pending.peek_earliest_due().is_none());

        pending.insert(item("a", base + Duration::from_secs(2)));
        pending.insert(item("b", base + Duration::from_secs(1)));
        assert_eq!(
            pending.peek_earliest_due(),
            Some(base + Duration::from_secs(1))
        );
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn reschedule_is_relative_to_dispatch_time() {
        let mut it = item("p", Instant::now());
        it.interval = Some(Duration::from_millis(100));
        let dispatched = Instant::now() + Duration::from_secs(5);
        assert!(it.reschedule(dispatched));
        assert_eq!(it.next_run, dispatched + Duration::from_millis(100));

        it.interval = None;
        assert!(!it.reschedule(dispatched));
    }
}

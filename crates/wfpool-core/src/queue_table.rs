//! The live, mutable backlog each worker enqueues into.
//!
//! Every named queue owns a `Vec<Option<Task>>` backlog plus a `cursor`
//! marking how far a previous snapshot build has already consumed it.
//! Items are never shifted out of the front of the vector on every take —
//! that would be O(n) per task — instead a taken slot is left as `None`
//! (a hole) and the cursor advances past it. The vector is compacted only
//! when the hole count crosses `max_slice`, or when the whole backlog is
//! moved out wholesale (see `snapshot::build_snapshot`).
//!
//! Queue names are never removed from the table once they have been seen,
//! even after being drained to empty: weight assignments and any
//! in-flight straggler appends need a stable slot to land in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A unit of work submitted to the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// `None` is the default (unnamed) queue.
pub type QueueName = Option<Arc<str>>;

pub(crate) struct QueueEntry {
    pub(crate) backlog: Vec<Option<Task>>,
    pub(crate) cursor: usize,
}

impl QueueEntry {
    fn new() -> Self {
        Self {
            backlog: Vec::new(),
            cursor: 0,
        }
    }

    /// Physical length including holes, the quantity the swap's batch-size
    /// arithmetic is written against.
    pub(crate) fn len(&self) -> usize {
        self.backlog.len()
    }

    /// Unconsumed items: physical length minus the consumed cursor.
    pub(crate) fn backlog_len(&self) -> usize {
        self.backlog.len().saturating_sub(self.cursor)
    }
}

pub(crate) struct Inner {
    pub(crate) entries: HashMap<QueueName, QueueEntry>,
    weights: HashMap<QueueName, u32>,
}

impl Inner {
    fn entry_mut(&mut self, queue: &QueueName) -> &mut QueueEntry {
        self.entries
            .entry(queue.clone())
            .or_insert_with(QueueEntry::new)
    }

    /// Dispatch weight for a queue, as seen from inside `with_inner`.
    pub(crate) fn weight_of(&self, queue: &QueueName) -> u32 {
        self.weights.get(queue).copied().unwrap_or(1)
    }
}

/// The set of per-queue backlogs a pool dispatches from.
///
/// Guarded by a single mutex: appends, weight changes, and snapshot
/// construction all take it briefly. Dispatch itself never touches this
/// lock once a snapshot has been built — see `snapshot::Snapshot`.
pub struct QueueTable {
    inner: Mutex<Inner>,
}

impl Default for QueueTable {
    fn default() -> Self {
        Self::new()
    }
}

impl QueueTable {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                weights: HashMap::new(),
            }),
        }
    }

    /// Append a task to the named queue's backlog.
    pub fn append(&self, queue: QueueName, task: Task) {
        let mut inner = self.inner.lock().unwrap();
        inner.entry_mut(&queue).backlog.push(Some(task));
    }

    /// Set a queue's dispatch weight. Weights are clamped to a minimum of 1.
    pub fn set_weight(&self, queue: QueueName, weight: u32) {
        let mut inner = self.inner.lock().unwrap();
        inner.weights.insert(queue, weight.max(1));
    }

    /// Current dispatch weight for a queue. Unset queues default to 1.
    pub fn weight(&self, queue: &QueueName) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.weights.get(queue).copied().unwrap_or(1)
    }

    /// Approximate unconsumed backlog length for a queue (tasks appended
    /// but not yet folded into a dispatched snapshot).
    pub fn backlog_len(&self, queue: &QueueName) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .get(queue)
            .map(QueueEntry::backlog_len)
            .unwrap_or(0)
    }

    /// True if every known queue has nothing left unconsumed.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.entries.values().all(|e| e.backlog_len() == 0)
    }

    /// Run `f` with exclusive access to the table's internals. Used by
    /// `snapshot::build_snapshot` to perform the swap under this same lock,
    /// held only for the duration of the batch-sizing and draining steps
    /// (never across the straggler sleep).
    pub(crate) fn with_inner<R>(&self, f: impl FnOnce(&mut Inner) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        f(&mut inner)
    }
}

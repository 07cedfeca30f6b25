//! The single point of indirection workers dequeue through.
//!
//! `DispatchCore` holds either a live `Snapshot` being drained (`Running`)
//! or nothing (`Exhausted`). A worker that empties the current snapshot,
//! or finds the core already `Exhausted`, takes the core's write lock —
//! which doubles as the swap mutex — and asks `wfpool_core::build_snapshot`
//! for the next run. The `RwLock` itself is the "atomic-like indirection"
//! the scheduling model calls for: readers (the common case, popping from
//! an already-live snapshot) never block each other, and a swap is simply
//! a single write-guarded replacement of the enum.

use std::sync::{Arc, Condvar, Mutex, RwLock};
use wfpool_core::{config::PoolConfig, queue_table::Task, QueueTable, Snapshot};

enum DispatchState {
    Exhausted,
    Running(Arc<Snapshot>),
}

/// Coordinates workers around a single shared snapshot.
pub struct DispatchCore {
    state: RwLock<DispatchState>,
    not_empty: Mutex<bool>,
    not_empty_cv: Condvar,
}

impl DispatchCore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(DispatchState::Exhausted),
            not_empty: Mutex::new(false),
            not_empty_cv: Condvar::new(),
        }
    }

    /// True if there is currently no live snapshot to drain.
    pub fn is_exhausted(&self) -> bool {
        matches!(*self.state.read().unwrap(), DispatchState::Exhausted)
    }

    fn signal_not_empty(&self) {
        let mut flag = self.not_empty.lock().unwrap();
        *flag = true;
        self.not_empty_cv.notify_all();
    }

    /// Wake any worker parked on the exhausted-state wait so it re-checks
    /// for work immediately rather than sitting out its liveness timeout.
    /// Called whenever a task is appended to the table; the actual swap
    /// decision still happens inside `next_task`.
    pub fn notify_append(&self) {
        self.signal_not_empty();
    }

    fn clear_not_empty(&self) {
        *self.not_empty.lock().unwrap() = false;
    }

    /// Block until a swap signals new work, or `timeout` elapses.
    ///
    /// Returns `true` if woken by a signal, `false` on timeout — in either
    /// case the caller should simply retry `next_task`.
    pub fn wait_not_empty(&self, timeout: std::time::Duration) -> bool {
        let guard = self.not_empty.lock().unwrap();
        if *guard {
            return true;
        }
        let (guard, result) = self
            .not_empty_cv
            .wait_timeout_while(guard, timeout, |flag| !*flag)
            .unwrap();
        drop(guard);
        !result.timed_out()
    }

    /// Pop the next task, swapping in a fresh snapshot from `table` as
    /// needed. Returns `None` only when the table had nothing left to
    /// dispatch at the moment of the swap.
    pub fn next_task(&self, table: &QueueTable, config: &PoolConfig) -> Option<Task> {
        {
            let guard = self.state.read().unwrap();
            if let DispatchState::Running(snapshot) = &*guard {
                if let Some(task) = snapshot.take_next() {
                    return Some(task);
                }
            }
        }

        let mut guard = self.state.write().unwrap();
        if let DispatchState::Running(snapshot) = &*guard {
            if let Some(task) = snapshot.take_next() {
                return Some(task);
            }
        }

        let mut attempt = 0u32;
        loop {
            let snapshot = wfpool_core::build_snapshot(table, config);
            if snapshot.remaining() == 0 {
                attempt += 1;
                if table.is_empty() || attempt >= config.swap_recursion_limit.max(1) {
                    *guard = DispatchState::Exhausted;
                    self.clear_not_empty();
                    return None;
                }
                continue;
            }
            let snapshot = Arc::new(snapshot);
            let task = snapshot.take_next();
            *guard = DispatchState::Running(snapshot);
            self.signal_not_empty();
            return task;
        }
    }
}

impl Default for DispatchCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_table_stays_exhausted() {
        let table = QueueTable::new();
        let config = PoolConfig::new();
        let dispatch = DispatchCore::new();
        assert!(dispatch.next_task(&table, &config).is_none());
        assert!(dispatch.is_exhausted());
    }

    #[test]
    fn dispatches_every_submitted_task_once() {
        let table = QueueTable::new();
        for _ in 0..50 {
            table.append(None, Box::new(|| {}));
        }
        let config = PoolConfig::new().min_batch(1).max_batch(10);
        let dispatch = DispatchCore::new();
        let mut count = 0;
        while let Some(task) = dispatch.next_task(&table, &config) {
            task();
            count += 1;
            if count > 1000 {
                break;
            }
        }
        assert_eq!(count, 50);
    }
}

//! A multi-queue, weight-fair, daemon thread pool.
//!
//! `Pool` dispatches `FnOnce` tasks submitted to any number of named
//! queues across a fixed-ish set of worker threads, interleaving the
//! queues by a per-queue integer weight so that no single busy queue can
//! starve the others. See `SubQueue` for a handle bound to one queue name,
//! and [`PoolConfig`](wfpool_core::PoolConfig) for tuning knobs.
//!
//! ```
//! use wfpool::Pool;
//!
//! let pool = Pool::new();
//! pool.apply_async(|| println!("hello from the pool"), ());
//! pool.join(None);
//! ```

mod queue_name;

pub use queue_name::IntoQueueName;
pub use wfpool_core::config::PoolConfig;
pub use wfpool_core::queue_table::QueueName;
pub use wfpool_error::{ConfigError, PoolError, PoolResult, TaskPayload};

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use wfpool_runtime::PoolInner;

enum Outcome<T> {
    Value(T),
    Err(TaskPayload),
}

/// A handle to a running thread pool.
///
/// Cloning a `Pool` is cheap (it's a reference-counted handle to shared
/// state) and every clone observes the same queues and workers.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    /// Build a pool from `PoolConfig::from_env()` and start its workers.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::from_env())
    }

    /// Build a pool with explicit configuration and start its workers.
    pub fn with_config(config: PoolConfig) -> Self {
        let pool = Self {
            inner: PoolInner::new(config),
        };
        pool.start();
        pool
    }

    /// Start worker threads if they haven't been started yet. Safe to call
    /// more than once; only the first call has an effect.
    pub fn start(&self) {
        self.inner.start();
    }

    /// True if the pool has been started and every worker thread it spawned
    /// is still alive. Useful for health-check glue; `is_started` alone
    /// only reports whether `start` has run, not whether a worker later
    /// died of an internal invariant violation.
    pub fn check_started(&self) -> bool {
        self.inner.check_started()
    }

    /// True once `start` (or the first submission) has spawned workers.
    pub fn is_started(&self) -> bool {
        self.inner.is_started()
    }

    /// Submit a task to run on any worker, without waiting for a result.
    pub fn apply_async<F>(&self, task: F, queue: impl IntoQueueName)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.submit(queue.into_queue_name(), Box::new(task));
    }

    /// Submit a task and block for its result (or `timeout`, or a panic).
    ///
    /// Returns [`PoolError::PoolShutDown`] if the pool has already been
    /// `stop`/`terminate`d — its workers are gone, so a newly queued task
    /// would never be dispatched. Returns [`PoolError::Timeout`] if
    /// `timeout` elapses before the task runs to completion (the task
    /// itself is not cancelled and keeps running). Returns
    /// [`PoolError::Task`] if the task panicked.
    pub fn apply<F, T>(
        &self,
        task: F,
        queue: impl IntoQueueName,
        timeout: Option<Duration>,
    ) -> PoolResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.inner.is_stopped() {
            return Err(PoolError::PoolShutDown);
        }

        let slot: Arc<(Mutex<Option<Outcome<T>>>, Condvar)> =
            Arc::new((Mutex::new(None), Condvar::new()));
        let slot_for_task = slot.clone();

        self.apply_async(
            move || {
                let result = panic::catch_unwind(AssertUnwindSafe(task));
                let outcome = match result {
                    Ok(value) => Outcome::Value(value),
                    Err(payload) => Outcome::Err(TaskPayload::from_panic(payload)),
                };
                let (lock, cvar) = &*slot_for_task;
                *lock.lock().unwrap() = Some(outcome);
                cvar.notify_one();
            },
            queue,
        );

        let (lock, cvar) = &*slot;
        let guard = lock.lock().unwrap();
        let mut guard = match timeout {
            Some(d) => {
                let (guard, result) = cvar
                    .wait_timeout_while(guard, d, |slot| slot.is_none())
                    .unwrap();
                if result.timed_out() && guard.is_none() {
                    return Err(PoolError::Timeout);
                }
                guard
            }
            None => cvar.wait_while(guard, |slot| slot.is_none()).unwrap(),
        };

        match guard.take() {
            Some(Outcome::Value(value)) => Ok(value),
            Some(Outcome::Err(payload)) => Err(PoolError::task(payload)),
            None => Err(PoolError::Timeout),
        }
    }

    /// Set the dispatch weight for a queue. Weights below 1 are clamped to 1.
    pub fn set_queueprio(&self, queue: impl IntoQueueName, weight: u32) {
        self.inner.table.set_weight(queue.into_queue_name(), weight);
    }

    /// Current dispatch weight for a queue (default 1).
    pub fn queueprio(&self, queue: impl IntoQueueName) -> u32 {
        self.inner.table.weight(&queue.into_queue_name())
    }

    /// Approximate count of tasks submitted to `queue` but not yet
    /// dispatched to a worker.
    pub fn queuelen(&self, queue: impl IntoQueueName) -> usize {
        self.inner.table.backlog_len(&queue.into_queue_name())
    }

    /// Alias for `queuelen(())`.
    pub fn qsize(&self) -> usize {
        self.queuelen(())
    }

    /// This pool's underlying task-queue handle. `Pool` already forwards
    /// every queue-shaped operation, so the handle is simply `self`.
    pub fn task_queue(&self) -> &Pool {
        self
    }

    /// Resize the live worker count.
    pub fn set_workers(&self, workers: usize) {
        self.inner.resize(workers);
    }

    /// Block until every submitted task has finished, or `timeout` elapses.
    /// Returns `true` if the pool quiesced, `false` on timeout.
    pub fn join(&self, timeout: Option<Duration>) -> bool {
        self.inner.join(timeout)
    }

    /// Mark the pool as closing. No new tasks should be submitted after
    /// this; already-queued tasks still run to completion.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Stop dispatching immediately, abandoning anything still queued.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Alias for `stop`.
    pub fn terminate(&self) {
        self.stop();
    }

    /// Register a hook invoked on every worker thread after each task it
    /// runs, success or panic alike. Intended for cache-eviction style
    /// maintenance work that needs to happen between tasks.
    pub fn add_cleanup_hook<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.add_cleanup_hook(Arc::new(hook));
    }

    /// True if the calling thread is one of this pool's own workers.
    pub fn in_worker(&self) -> bool {
        wfpool_runtime::tls::in_worker()
    }

    /// A handle bound to a single named queue.
    pub fn subqueue(&self, queue: impl IntoQueueName, priority: u32) -> SubQueue {
        let queue = queue.into_queue_name();
        self.inner.table.set_weight(queue.clone(), priority);
        SubQueue {
            pool: self.inner.clone(),
            queue,
        }
    }

    /// OS process id the pool was constructed under. wfpool does not
    /// itself re-spawn workers across `fork()`; this is informational.
    pub fn pid(&self) -> u32 {
        self.inner.pid
    }
}

/// A handle to one named queue of a [`Pool`].
///
/// Forwards submission and inspection to the parent pool with the queue
/// name already bound.
#[derive(Clone)]
pub struct SubQueue {
    pool: Arc<PoolInner>,
    queue: QueueName,
}

impl SubQueue {
    pub fn apply_async<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.submit(self.queue.clone(), Box::new(task));
    }

    pub fn apply<F, T>(&self, task: F, timeout: Option<Duration>) -> PoolResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let pool = Pool {
            inner: self.pool.clone(),
        };
        pool.apply(task, self.queue.clone(), timeout)
    }

    pub fn queuelen(&self) -> usize {
        self.pool.table.backlog_len(&self.queue)
    }

    pub fn set_priority(&self, weight: u32) {
        self.pool.table.set_weight(self.queue.clone(), weight);
    }

    pub fn priority(&self) -> u32 {
        self.pool.table.weight(&self.queue)
    }

    pub fn start(&self) {
        self.pool.start();
    }

    pub fn join(&self, timeout: Option<Duration>) -> bool {
        self.pool.join(timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn apply_returns_value() {
        let pool = Pool::with_config(PoolConfig::new().workers(2));
        let result = pool.apply(|| 2 + 2, (), Some(Duration::from_secs(5)));
        assert_eq!(result.unwrap(), 4);
    }

    #[test]
    fn apply_propagates_panic() {
        let pool = Pool::with_config(PoolConfig::new().workers(2));
        let result: PoolResult<()> = pool.apply(
            || panic!("boom"),
            (),
            Some(Duration::from_secs(5)),
        );
        let err = result.unwrap_err();
        assert!(err.is_task());
        assert!(format!("{err}").contains("boom"));
    }

    #[test]
    fn apply_times_out_without_cancelling_task() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let result: PoolResult<()> = pool.apply(
            move || {
                std::thread::sleep(Duration::from_millis(200));
                ran_clone.fetch_add(1, Ordering::SeqCst);
            },
            (),
            Some(Duration::from_millis(10)),
        );
        assert!(result.unwrap_err().is_timeout());
        pool.join(Some(Duration::from_secs(5)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn many_tasks_dispatched_exactly_once() {
        let pool = Pool::with_config(PoolConfig::new().workers(4).min_batch(5).max_batch(50));
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..5000 {
            let counter = counter.clone();
            pool.apply_async(move || { counter.fetch_add(1, Ordering::SeqCst); }, ());
        }
        assert!(pool.join(Some(Duration::from_secs(10))));
        assert_eq!(counter.load(Ordering::SeqCst), 5000);
    }

    #[test]
    fn named_queues_are_independent_and_fifo() {
        // Dispatch order is FIFO per queue (invariant 2), but completion
        // order across workers is not — a second worker can finish task
        // i+1 and push to the shared log before the worker running task i
        // does. Pin this down to one worker so completion order and
        // dispatch order coincide and the test actually exercises FIFO.
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        let log_a = Arc::new(Mutex::new(Vec::new()));
        let log_b = Arc::new(Mutex::new(Vec::new()));
        for i in 0..20 {
            let log_a = log_a.clone();
            pool.apply_async(move || log_a.lock().unwrap().push(i), "a");
        }
        for i in 0..20 {
            let log_b = log_b.clone();
            pool.apply_async(move || log_b.lock().unwrap().push(i), "b");
        }
        assert!(pool.join(Some(Duration::from_secs(10))));
        assert_eq!(*log_a.lock().unwrap(), (0..20).collect::<Vec<_>>());
        assert_eq!(*log_b.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn subqueue_forwards_to_parent() {
        let pool = Pool::with_config(PoolConfig::new().workers(2));
        let sub = pool.subqueue("priority", 5);
        assert_eq!(pool.queueprio("priority"), 5);
        let result = sub.apply(|| "ok", Some(Duration::from_secs(5)));
        assert_eq!(result.unwrap(), "ok");
    }

    #[test]
    fn in_worker_detects_pool_threads() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        assert!(!pool.in_worker());
        let result = pool.apply(
            {
                let pool = pool.clone();
                move || pool.in_worker()
            },
            (),
            Some(Duration::from_secs(5)),
        );
        assert!(result.unwrap());
    }

    #[test]
    fn close_then_close_is_a_no_op() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        pool.close();
        pool.close();
        assert!(pool.join(Some(Duration::from_secs(5))));
    }

    #[test]
    fn terminate_then_terminate_is_a_no_op() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        pool.terminate();
        pool.terminate();
    }

    #[test]
    fn apply_after_terminate_reports_pool_shut_down() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        pool.terminate();
        let result: PoolResult<()> = pool.apply(|| (), (), Some(Duration::from_secs(5)));
        assert!(matches!(result, Err(PoolError::PoolShutDown)));
    }

    #[test]
    fn cleanup_hook_runs_after_every_task() {
        let pool = Pool::with_config(PoolConfig::new().workers(1));
        let hook_runs = Arc::new(AtomicUsize::new(0));
        let hook_runs_clone = hook_runs.clone();
        pool.add_cleanup_hook(move || {
            hook_runs_clone.fetch_add(1, Ordering::SeqCst);
        });
        for _ in 0..10 {
            pool.apply_async(|| (), ());
        }
        assert!(pool.join(Some(Duration::from_secs(5))));
        assert_eq!(hook_runs.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn empty_pool_join_returns_immediately() {
        let pool = Pool::with_config(PoolConfig::new().workers(2));
        assert!(pool.join(Some(Duration::ZERO)));
    }

    #[test]
    fn check_started_tracks_worker_liveness() {
        let pool = Pool::with_config(PoolConfig::new().workers(2));
        assert!(pool.is_started());
        assert!(pool.check_started());
        // Calling start() again on an already-started pool is a no-op.
        pool.start();
        assert!(pool.check_started());
    }

    #[test]
    fn stop_abandons_queued_tasks() {
        let pool = Pool::with_config(PoolConfig::new().workers(1).min_batch(1).max_batch(10));
        let ran = Arc::new(AtomicUsize::new(0));
        // Block the single worker on a long task so everything submitted
        // after it sits in the backlog when `stop` fires.
        let blocker_started = Arc::new((Mutex::new(false), Condvar::new()));
        {
            let blocker_started = blocker_started.clone();
            pool.apply_async(
                move || {
                    let (lock, cvar) = &*blocker_started;
                    *lock.lock().unwrap() = true;
                    cvar.notify_one();
                    std::thread::sleep(Duration::from_millis(200));
                },
                (),
            );
        }
        {
            let (lock, cvar) = &*blocker_started;
            let guard = lock.lock().unwrap();
            let _ = cvar.wait_while(guard, |started| !*started).unwrap();
        }
        for _ in 0..50 {
            let ran = ran.clone();
            pool.apply_async(move || { ran.fetch_add(1, Ordering::SeqCst); }, ());
        }
        pool.stop();
        std::thread::sleep(Duration::from_millis(400));
        assert!(ran.load(Ordering::SeqCst) < 50);
    }
}

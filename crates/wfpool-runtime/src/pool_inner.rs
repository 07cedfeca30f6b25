//! Shared state behind every handle to a pool.
//!
//! `PoolInner` is held by strong `Arc` from every `Pool`/`SubQueue` handle
//! and by weak reference from every worker thread: once the last strong
//! handle drops, workers notice on their next wakeup and self-terminate
//! rather than keeping the process alive.

use crate::dispatch::DispatchCore;
use crate::worker;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use wfpool_core::{config::PoolConfig, queue_table::{QueueName, Task}, QueueTable};

type CleanupHook = dyn Fn() + Send + Sync;

pub struct PoolInner {
    pub table: QueueTable,
    pub dispatch: DispatchCore,
    pub config: PoolConfig,

    pub(crate) workers: Mutex<Vec<JoinHandle<()>>>,
    pub(crate) target: AtomicUsize,
    pub(crate) spawn_lock: Mutex<()>,

    started: AtomicBool,
    closing: AtomicBool,
    stopped: AtomicBool,

    workset: Mutex<HashSet<usize>>,
    join_lock: Mutex<()>,
    join_cv: Condvar,

    /// Process id at construction time, exposed via `Pool::pid`. wfpool
    /// does not re-spawn workers across `fork()` on its own; this field is
    /// inert beyond recording the value.
    pub pid: u32,

    cleanup_hooks: RwLock<Vec<Arc<CleanupHook>>>,
}

impl PoolInner {
    pub fn new(config: PoolConfig) -> Arc<Self> {
        if config.debug_logging {
            wfpool_core::log::set_log_level(wfpool_core::log::LogLevel::Debug);
        }
        let inner = Arc::new(Self {
            table: QueueTable::new(),
            dispatch: DispatchCore::new(),
            config,
            workers: Mutex::new(Vec::new()),
            target: AtomicUsize::new(0),
            spawn_lock: Mutex::new(()),
            started: AtomicBool::new(false),
            closing: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            workset: Mutex::new(HashSet::new()),
            join_lock: Mutex::new(()),
            join_cv: Condvar::new(),
            pid: std::process::id(),
            cleanup_hooks: RwLock::new(Vec::new()),
        });
        inner
    }

    pub fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        worker::populate_workers(self, self.config.workers);
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// `is_started()` plus a liveness check: every spawned worker thread
    /// must still be running. A worker can only exit via a panic that
    /// escapes its own `catch_unwind` (a pool-internal invariant
    /// violation, see the error taxonomy) or after `stop`/`close`.
    pub fn check_started(&self) -> bool {
        self.is_started() && self.workers.lock().unwrap().iter().all(|h| !h.is_finished())
    }

    /// Hard stop: a worker observing this exits before taking another task,
    /// even if one is immediately available.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }

    /// Cooperative stop: a worker observing this keeps draining whatever it
    /// can dispatch right now, but exits instead of waiting once dispatch
    /// goes idle, rather than parking in the exhausted-state wait.
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Relaxed)
    }

    pub fn close(&self) {
        self.closing.store(true, Ordering::SeqCst);
        // Wake anyone already parked in the exhausted-state wait so they
        // notice the closing flag now instead of at their next liveness
        // timeout.
        self.dispatch.notify_append();
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        // Workers parked in the exhausted-state wait notice `stopped` on
        // their next wakeup, bounded by `config.exhausted_wait`. Waking
        // them early isn't worth a dedicated signal path.
        self.notify_join_waiters();
    }

    pub fn resize(self: &Arc<Self>, workers: usize) {
        worker::populate_workers(self, workers);
    }

    /// Append a task and wake any idle worker to come pick it up.
    pub fn submit(&self, queue: QueueName, task: Task) {
        self.table.append(queue, task);
        self.dispatch.notify_append();
    }

    pub fn run_cleanup_hooks(&self) {
        for hook in self.cleanup_hooks.read().unwrap().iter() {
            hook();
        }
    }

    pub fn add_cleanup_hook(&self, hook: Arc<CleanupHook>) {
        self.cleanup_hooks.write().unwrap().push(hook);
    }

    pub(crate) fn workset_insert(&self, id: usize) {
        self.workset.lock().unwrap().insert(id);
    }

    pub(crate) fn workset_remove(&self, id: usize) {
        self.workset.lock().unwrap().remove(&id);
    }

    fn is_quiescent(&self) -> bool {
        self.table.is_empty() && self.dispatch.is_exhausted() && self.workset.lock().unwrap().is_empty()
    }

    pub(crate) fn notify_join_waiters(&self) {
        let _guard = self.join_lock.lock().unwrap();
        self.join_cv.notify_all();
    }

    /// Block until every submitted task has been dispatched and finished
    /// running, or `timeout` elapses.
    pub fn join(&self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|d| Instant::now() + d);
        let guard = self.join_lock.lock().unwrap();
        let (_guard, timed_out) = match deadline {
            Some(deadline) => {
                let mut guard = guard;
                loop {
                    if self.is_quiescent() {
                        break (guard, false);
                    }
                    let now = Instant::now();
                    if now >= deadline {
                        break (guard, true);
                    }
                    let (g, result) = self
                        .join_cv
                        .wait_timeout(guard, deadline - now)
                        .unwrap();
                    guard = g;
                    if result.timed_out() && !self.is_quiescent() {
                        break (guard, true);
                    }
                }
            }
            None => {
                let mut guard = guard;
                while !self.is_quiescent() {
                    guard = self.join_cv.wait(guard).unwrap();
                }
                (guard, false)
            }
        };
        !timed_out
    }
}

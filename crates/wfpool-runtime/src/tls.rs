//! Thread-local context for worker threads.

use std::cell::Cell;

thread_local! {
    static IN_WORKER: Cell<bool> = const { Cell::new(false) };
}

/// Mark the current thread as inside a task invocation. Called
/// immediately before a worker invokes the task it just dequeued.
pub fn enter_task() {
    IN_WORKER.with(|f| f.set(true));
}

/// Clear the task marker. Called right after a task invocation returns
/// or panics, on every exit path.
pub fn leave_task() {
    IN_WORKER.with(|f| f.set(false));
}

/// True iff the calling thread is a pool worker currently running a task.
///
/// Used to detect re-entrant submission: a task that itself calls
/// `apply` on the same pool would otherwise deadlock if every worker is
/// blocked waiting on it. False while a worker is idle-waiting or
/// between tasks, matching the original's `local.working` flag.
pub fn in_worker() -> bool {
    IN_WORKER.with(|f| f.get())
}

//! Worker thread lifecycle: spawn, the run loop, and population changes.

use crate::pool_inner::PoolInner;
use crate::tls;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread;
use wfpool_core::{wlog_debug, wlog_error};

/// Scale the live worker count to `target`.
///
/// Growing spawns the delta immediately. Shrinking just lowers the target;
/// each worker checks its own id against the target at the top of every
/// loop iteration and exits on its own once told to.
pub(crate) fn populate_workers(pool: &Arc<PoolInner>, target: usize) {
    let _guard = pool.spawn_lock.lock().unwrap();
    pool.target.store(target, std::sync::atomic::Ordering::SeqCst);

    let mut workers = pool.workers.lock().unwrap();
    while workers.len() < target {
        let id = workers.len();
        let weak: Weak<PoolInner> = Arc::downgrade(pool);
        let handle = thread::Builder::new()
            .name(format!("wfpool-worker-{id}"))
            .spawn(move || run_worker(id, weak))
            .expect("failed to spawn wfpool worker thread");
        workers.push(handle);
    }
}

fn run_worker(id: usize, pool: Weak<PoolInner>) {
    wfpool_core::log::set_worker_id(id);
    wlog_debug!("worker {id} starting");

    'outer: loop {
        let Some(strong) = pool.upgrade() else {
            break;
        };
        if strong.is_stopped() || id >= strong.target.load(std::sync::atomic::Ordering::SeqCst) {
            break;
        }

        match strong.dispatch.next_task(&strong.table, &strong.config) {
            Some(task) => {
                strong.workset_insert(id);
                tls::enter_task();
                let result = panic::catch_unwind(AssertUnwindSafe(task));
                tls::leave_task();
                strong.workset_remove(id);
                if let Err(payload) = result {
                    let payload = wfpool_error::TaskPayload::from_panic(payload);
                    wlog_error!("worker {id}: task panicked: {payload}");
                }
                strong.run_cleanup_hooks();
                strong.notify_join_waiters();
            }
            None => {
                strong.notify_join_waiters();
                if strong.is_closing() {
                    break 'outer;
                }
                let exhausted_wait = strong.config.exhausted_wait;
                drop(strong);
                let Some(strong) = pool.upgrade() else {
                    break 'outer;
                };
                let _ = strong.dispatch.wait_not_empty(exhausted_wait);
            }
        }
    }

    wlog_debug!("worker {id} exiting");
    wfpool_core::log::clear_worker_id();
}

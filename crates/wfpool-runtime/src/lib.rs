//! Worker threads, dispatch coordination, and pool lifecycle.
//!
//! This crate owns everything that needs `std::thread`: spawning and
//! resizing the worker pool, the run loop each worker executes, and the
//! shared `PoolInner` state a `wfpool::Pool` handle wraps. The scheduling
//! arithmetic itself (queue table, snapshot builder) lives in
//! `wfpool-core` and is driven from here, not duplicated.

mod dispatch;
mod pool_inner;
pub mod tls;
mod worker;

pub use dispatch::DispatchCore;
pub use pool_inner::PoolInner;
pub(crate) use worker::populate_workers;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use wfpool_core::config::PoolConfig;

    #[test]
    fn pool_runs_submitted_tasks() {
        let config = PoolConfig::new().workers(2).min_batch(1).max_batch(10);
        let inner = PoolInner::new(config);
        inner.start();

        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..100 {
            let counter = counter.clone();
            inner.submit(None, Box::new(move || { counter.fetch_add(1, Ordering::SeqCst); }));
        }

        let quiesced = inner.join(Some(Duration::from_secs(5)));
        assert!(quiesced);
        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }
}

//! Basic wfpool walkthrough
//!
//! Submits a few tasks to a couple of named queues with different
//! weights and waits for them all to finish, to show the shape of the
//! public API end to end.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wfpool::{Pool, PoolConfig};

fn main() {
    println!("=== wfpool Basic Example ===\n");

    let config = PoolConfig::new().workers(4).debug_logging(true);
    let pool = Pool::with_config(config);

    pool.set_queueprio("reports", 3);
    pool.set_queueprio("emails", 1);

    let completed = Arc::new(AtomicUsize::new(0));

    println!("Submitting tasks...\n");

    for i in 0..3 {
        let completed = completed.clone();
        pool.apply_async(
            move || {
                println!("[reports] task {i} started");
                completed.fetch_add(1, Ordering::SeqCst);
                println!("[reports] task {i} finished");
            },
            "reports",
        );
    }

    for i in 0..3 {
        let completed = completed.clone();
        pool.apply_async(
            move || {
                println!("[emails] task {i} started");
                completed.fetch_add(1, Ordering::SeqCst);
                println!("[emails] task {i} finished");
            },
            "emails",
        );
    }

    // A synchronous call that blocks for its result, demonstrating `apply`
    // layered over `apply_async`.
    let total = pool.apply(
        || {
            println!("[default] computing a result synchronously");
            2 + 2
        },
        (),
        Some(Duration::from_secs(5)),
    );
    println!("\nsynchronous apply() returned: {total:?}");

    println!("\nWaiting for all submitted tasks to finish...");
    let quiesced = pool.join(Some(Duration::from_secs(5)));
    if !quiesced {
        println!("WARNING: join() timed out before the pool went idle!");
    }

    println!(
        "\n{}/6 async tasks completed!",
        completed.load(Ordering::SeqCst)
    );
    println!("\n=== Example Complete ===");
}

//! Stress test - many concurrent submitters
//!
//! Spins up a configurable number of producer threads, each hammering
//! `apply_async` on a shared pool, then waits for `join()` to report
//! quiescence and checks every submitted task actually ran exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wfpool::{Pool, PoolConfig};

fn main() {
    println!("=== wfpool Stress Test ===\n");

    let num_producers: usize = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(50);
    let per_producer: usize = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(10_000);
    let total = num_producers * per_producer;

    println!("Submitting {total} tasks from {num_producers} producer threads...");

    let config = PoolConfig::new().workers(8).min_batch(10).max_batch(1000);
    let pool = Pool::with_config(config);
    let completed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    let producers: Vec<_> = (0..num_producers)
        .map(|p| {
            let pool = pool.clone();
            let completed = completed.clone();
            std::thread::spawn(move || {
                for _ in 0..per_producer {
                    let completed = completed.clone();
                    pool.apply_async(
                        move || {
                            completed.fetch_add(1, Ordering::Relaxed);
                        },
                        (),
                    );
                }
                if (p + 1) % 10 == 0 {
                    println!("producer {} of {num_producers} done submitting", p + 1);
                }
            })
        })
        .collect();

    for handle in producers {
        handle.join().expect("producer thread panicked");
    }

    let submit_time = start.elapsed();
    println!("\nSubmit time: {submit_time:?}");
    println!(
        "Submit rate: {:.0} tasks/sec",
        total as f64 / submit_time.as_secs_f64()
    );

    println!("\nWaiting for completion...");
    let run_start = Instant::now();
    let quiesced = pool.join(Some(Duration::from_secs(60)));
    let run_time = run_start.elapsed();
    let total_time = start.elapsed();

    let done = completed.load(Ordering::Relaxed);

    println!("\n=== Results ===");
    println!("Total tasks:     {total}");
    println!("Completed:       {done}");
    println!("Pool quiesced:   {quiesced}");
    println!("Submit time:     {submit_time:?}");
    println!("Run time:        {run_time:?}");
    println!("Total time:      {total_time:?}");
    println!(
        "Throughput:      {:.0} tasks/sec",
        total as f64 / total_time.as_secs_f64()
    );

    if done != total {
        println!("\nWARNING: expected {total} completions, observed {done}");
        std::process::exit(1);
    }

    println!("\n=== Stress Test Complete ===");
}

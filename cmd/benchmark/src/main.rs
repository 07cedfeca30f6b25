//! Benchmark suite for wfpool
//!
//! Measures dispatch latency, fairness under backpressure, and
//! weighted-queue throughput ratios.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wfpool::{Pool, PoolConfig};

fn main() {
    println!("=== wfpool Benchmarks ===\n");

    bench_async_latency();
    bench_sync_latency();
    bench_fairness_under_backpressure();
    bench_weighting();

    println!("\n=== Benchmarks Complete ===");
}

/// Scenario 1 from the testable-properties list: submit-then-wait latency
/// for `apply_async`, observed via a synchronous `apply` round trip.
fn bench_async_latency() {
    println!("Benchmark: Async dispatch latency");
    println!("{}", "-".repeat(40));

    let pool = Pool::with_config(PoolConfig::new().workers(4));
    let iterations = 100;
    let mut max = Duration::ZERO;
    let mut total = Duration::ZERO;

    for _ in 0..iterations {
        let start = Instant::now();
        let _ = pool.apply(|| (), (), Some(Duration::from_secs(1)));
        let elapsed = start.elapsed();
        total += elapsed;
        max = max.max(elapsed);
    }

    println!("  Iterations:  {iterations}");
    println!("  Mean:        {:?}", total / iterations as u32);
    println!("  Max:         {max:?}\n");
}

/// Scenario 2: `apply(Instant::now)` should return promptly and the
/// returned timestamp should be close to the call.
fn bench_sync_latency() {
    println!("Benchmark: Sync apply() latency");
    println!("{}", "-".repeat(40));

    let pool = Pool::with_config(PoolConfig::new().workers(4));
    let iterations = 100;
    let mut max_skew = Duration::ZERO;

    for _ in 0..iterations {
        let before = Instant::now();
        let observed = pool
            .apply(Instant::now, (), Some(Duration::from_secs(1)))
            .expect("apply should not time out");
        let skew = observed.saturating_duration_since(before);
        max_skew = max_skew.max(skew);
    }

    println!("  Iterations:  {iterations}");
    println!("  Max skew:    {max_skew:?}\n");
}

/// Scenario 5: saturate one queue, then confirm a single request on a
/// different queue still completes quickly instead of queueing behind it.
fn bench_fairness_under_backpressure() {
    println!("Benchmark: Fairness under backpressure");
    println!("{}", "-".repeat(40));

    let pool = Pool::with_config(PoolConfig::new().workers(4).min_batch(5).max_batch(50));
    let saturating = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let producers: Vec<_> = (0..50)
        .map(|_| {
            let pool = pool.clone();
            let saturating = saturating.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    let saturating = saturating.clone();
                    pool.apply_async(
                        move || {
                            saturating.fetch_add(1, Ordering::Relaxed);
                        },
                        "A",
                    );
                }
            })
        })
        .collect();

    std::thread::sleep(Duration::from_millis(100));

    let start = Instant::now();
    let result = pool.apply(|| 1 + 1, "B", Some(Duration::from_secs(1)));
    let elapsed = start.elapsed();

    stop.store(true, Ordering::Relaxed);
    for handle in producers {
        let _ = handle.join();
    }

    println!("  Queue A dispatched (approx): {}", saturating.load(Ordering::Relaxed));
    println!("  Queue B apply() result:      {result:?}");
    println!("  Queue B apply() latency:     {elapsed:?}\n");
}

/// Scenario 6: two saturated queues at weights 3:1 should dispatch in
/// roughly that ratio over a fixed window.
fn bench_weighting() {
    println!("Benchmark: Weighted fairness (3:1)");
    println!("{}", "-".repeat(40));

    let pool = Pool::with_config(PoolConfig::new().workers(4).min_batch(5).max_batch(50));
    pool.set_queueprio("mean", 3);
    pool.set_queueprio("simple", 1);

    let mean_count = Arc::new(AtomicUsize::new(0));
    let simple_count = Arc::new(AtomicUsize::new(0));
    let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

    let mut producers = Vec::new();
    for _ in 0..4 {
        let pool = pool.clone();
        let mean_count = mean_count.clone();
        let stop = stop.clone();
        producers.push(std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let mean_count = mean_count.clone();
                pool.apply_async(move || { mean_count.fetch_add(1, Ordering::Relaxed); }, "mean");
            }
        }));
    }
    for _ in 0..4 {
        let pool = pool.clone();
        let simple_count = simple_count.clone();
        let stop = stop.clone();
        producers.push(std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let simple_count = simple_count.clone();
                pool.apply_async(move || { simple_count.fetch_add(1, Ordering::Relaxed); }, "simple");
            }
        }));
    }

    std::thread::sleep(Duration::from_secs(1));
    stop.store(true, Ordering::Relaxed);
    for handle in producers {
        let _ = handle.join();
    }
    pool.join(Some(Duration::from_secs(5)));

    let mean = mean_count.load(Ordering::Relaxed);
    let simple = simple_count.load(Ordering::Relaxed);
    let ratio = mean as f64 / simple.max(1) as f64;

    println!("  mean (weight 3):   {mean}");
    println!("  simple (weight 1): {simple}");
    println!("  observed ratio:    {ratio:.2} (target ~3.0)\n");
}

//! The double-buffered, weight-fair snapshot builder.
//!
//! `build_snapshot` is the one place the scheduling policy lives: it reads
//! the live `QueueTable`, decides for each queue whether to hand over a
//! zero-copy window, a compacted slice, or the whole backlog, interleaves
//! the results by weight, and hands back an immutable `Snapshot` that
//! workers can drain without touching the table's mutex again.

use crate::config::PoolConfig;
use crate::queue_table::{QueueName, QueueTable, Task};
use crossbeam_queue::SegQueue;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// An immutable, pre-interleaved run of work a worker pool dispatches from
/// without re-acquiring the queue table's lock per task.
pub struct Snapshot {
    queue: SegQueue<Task>,
    initial_len: usize,
    remaining: AtomicUsize,
    busy_factor: HashMap<QueueName, f64>,
}

impl Snapshot {
    /// A snapshot with nothing in it. Used as the initial dispatch state
    /// and whenever a swap finds the table drained.
    pub fn empty() -> Self {
        Self {
            queue: SegQueue::new(),
            initial_len: 0,
            remaining: AtomicUsize::new(0),
            busy_factor: HashMap::new(),
        }
    }

    /// Pop the next task, if any remain.
    pub fn take_next(&self) -> Option<Task> {
        let task = self.queue.pop()?;
        self.remaining.fetch_sub(1, Ordering::AcqRel);
        Some(task)
    }

    /// True once every task in this snapshot has been taken.
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    /// Tasks not yet taken from this snapshot.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Total tasks this snapshot started with.
    pub fn initial_len(&self) -> usize {
        self.initial_len
    }

    /// Fraction of this snapshot's tasks that belonged to `queue`, used to
    /// approximate `queuelen` for queues folded into a dispatched run.
    pub fn busy_factor(&self, queue: &QueueName) -> f64 {
        self.busy_factor.get(queue).copied().unwrap_or(0.0)
    }
}

struct QueueWindow {
    name: QueueName,
    weight: u32,
    window: VecDeque<Task>,
}

/// Build the next snapshot from the live table.
///
/// Always returns a `Snapshot`, possibly with `remaining() == 0` if the
/// table had nothing unconsumed at the moment of the swap. Callers own the
/// decision of whether an empty result means the dispatcher should
/// transition to its exhausted state.
pub fn build_snapshot(table: &QueueTable, config: &PoolConfig) -> Snapshot {
    let (mut collected, moved_names) = table.with_inner(|inner| {
        let names: Vec<QueueName> = inner.entries.keys().cloned().collect();

        let slots = {
            let mut min_slots: Option<usize> = None;
            for name in &names {
                let entry = &inner.entries[name];
                let lq = entry.backlog_len();
                if lq == 0 {
                    continue;
                }
                let wq = inner.weight_of(name) as usize;
                let s = lq / wq.max(1);
                min_slots = Some(min_slots.map_or(s, |m| m.min(s)));
            }
            min_slots
                .unwrap_or(config.min_batch)
                .clamp(config.min_batch, config.max_batch)
        };

        let mut collected = Vec::with_capacity(names.len());
        let mut moved_names = Vec::new();

        for name in names {
            let wq = inner.weight_of(&name);
            let entry = inner.entries.get_mut(&name).unwrap();
            let lq = entry.len();
            let pos = entry.cursor;
            if lq <= pos {
                continue;
            }

            let margin = (wq as usize).max(config.min_batch);
            let batch = slots * wq as usize;
            let max_slice = config.max_slice.unwrap_or_else(|| (lq / 2).max(1));

            let window = if pos + batch + margin >= lq {
                // Not enough left behind a zero-copy window to justify
                // keeping the entry around; take everything and let a
                // straggler pass pick up whatever lands afterward.
                let mut backlog = std::mem::take(&mut entry.backlog);
                entry.cursor = 0;
                moved_names.push(name.clone());
                backlog.drain(..).flatten().collect::<VecDeque<_>>()
            } else if pos > max_slice {
                // Enough holes have built up behind the cursor to be worth
                // compacting away.
                let drained: Vec<Option<Task>> = entry.backlog.drain(0..pos + batch).collect();
                entry.cursor = 0;
                drained.into_iter().skip(pos).flatten().collect::<VecDeque<_>>()
            } else {
                // Zero-copy window: take the next `batch` slots in place,
                // leaving holes, and advance the cursor past them.
                let end = (pos + batch).min(entry.backlog.len());
                let window: VecDeque<Task> = entry.backlog[pos..end]
                    .iter_mut()
                    .filter_map(|slot| slot.take())
                    .collect();
                entry.cursor = end;
                window
            };

            collected.push(QueueWindow {
                name,
                weight: wq,
                window,
            });
        }

        (collected, moved_names)
    });

    // Straggler pass: queues that were fully detached above may have
    // received new appends while we were still building other windows, or
    // while whatever thread holds this same lock races us. Fold those in,
    // but only for a bounded number of passes — this runs under the same
    // lock `next_task` holds across the whole swap (`dispatch.rs`), so a
    // producer that keeps appending to a moved queue must not be able to
    // keep this loop (and therefore every other worker) going forever.
    // The original (`chorde.threadpool.__swap_queues`) re-slices an
    // already-detached list producers can no longer reach, making its
    // retry a single bounded pass; capping on `swap_recursion_limit` here
    // gets the same "a couple of retries, then move on" shape.
    if !moved_names.is_empty() {
        for _ in 0..config.swap_recursion_limit.max(1) {
            thread::sleep(config.straggler_sleep);
            let mut added_any = false;
            table.with_inner(|inner| {
                for name in &moved_names {
                    let Some(entry) = inner.entries.get_mut(name) else {
                        continue;
                    };
                    if entry.backlog.is_empty() {
                        continue;
                    }
                    let stragglers = std::mem::take(&mut entry.backlog);
                    entry.cursor = 0;
                    if let Some(window) = collected.iter_mut().find(|w| &w.name == name) {
                        let mut n = 0;
                        for task in stragglers.into_iter().flatten() {
                            window.window.push_back(task);
                            n += 1;
                        }
                        if n > 0 {
                            added_any = true;
                        }
                    }
                }
            });
            if !added_any {
                break;
            }
        }
    }

    if collected.is_empty() {
        return Snapshot::empty();
    }

    let quantities: Vec<usize> = collected.iter().map(|w| w.window.len()).collect();
    let itotal: usize = quantities.iter().sum();

    let work_list = SegQueue::new();
    let mut total = 0usize;
    let mut active: Vec<usize> = (0..collected.len())
        .filter(|&i| !collected[i].window.is_empty())
        .collect();

    while !active.is_empty() {
        active.retain_mut(|&mut i| {
            let w = &mut collected[i];
            for _ in 0..w.weight {
                match w.window.pop_front() {
                    Some(task) => {
                        work_list.push(task);
                        total += 1;
                    }
                    None => break,
                }
            }
            !w.window.is_empty()
        });
    }

    let mut busy_factor = HashMap::with_capacity(collected.len());
    if itotal > 0 {
        for (window, qty) in collected.iter().zip(quantities.iter()) {
            busy_factor.insert(window.name.clone(), *qty as f64 / itotal as f64);
        }
    }

    Snapshot {
        queue: work_list,
        initial_len: total,
        remaining: AtomicUsize::new(total),
        busy_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as Counter;
    use std::sync::Arc;

    fn counting_task(counter: Arc<Counter>) -> Task {
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn empty_table_yields_empty_snapshot() {
        let table = QueueTable::new();
        let config = PoolConfig::new();
        let snap = build_snapshot(&table, &config);
        assert_eq!(snap.remaining(), 0);
        assert!(snap.is_exhausted());
    }

    #[test]
    fn single_queue_all_tasks_dispatched_once() {
        let table = QueueTable::new();
        let counter = Arc::new(Counter::new(0));
        for _ in 0..25 {
            table.append(None, counting_task(counter.clone()));
        }
        let config = PoolConfig::new().min_batch(1).max_batch(100);
        let snap = build_snapshot(&table, &config);
        assert_eq!(snap.initial_len(), 25);
        let mut taken = 0;
        while let Some(task) = snap.take_next() {
            task();
            taken += 1;
        }
        assert_eq!(taken, 25);
        assert_eq!(counter.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn weighted_queues_interleave_proportionally() {
        let table = QueueTable::new();
        let a: QueueName = Some(Arc::from("a"));
        let b: QueueName = Some(Arc::from("b"));
        table.set_weight(a.clone(), 3);
        table.set_weight(b.clone(), 1);
        for _ in 0..30 {
            table.append(a.clone(), Box::new(|| {}));
        }
        for _ in 0..10 {
            table.append(b.clone(), Box::new(|| {}));
        }
        let config = PoolConfig::new().min_batch(1).max_batch(100);
        let snap = build_snapshot(&table, &config);
        assert_eq!(snap.initial_len(), 40);
        let factor_a = snap.busy_factor(&a);
        let factor_b = snap.busy_factor(&b);
        assert!(factor_a > factor_b);
    }

    #[test]
    fn backlog_holes_are_excluded_from_window() {
        let table = QueueTable::new();
        for _ in 0..5 {
            table.append(None, Box::new(|| {}));
        }
        let config = PoolConfig::new().min_batch(1).max_batch(100);
        let first = build_snapshot(&table, &config);
        assert_eq!(first.initial_len(), 5);
        for _ in 0..3 {
            table.append(None, Box::new(|| {}));
        }
        let second = build_snapshot(&table, &config);
        assert_eq!(second.initial_len(), 3);
    }

    /// A producer that keeps appending to a moved queue must not be able to
    /// keep the straggler pass (and therefore the swap mutex) spinning
    /// forever — it must give up after `swap_recursion_limit` passes.
    #[test]
    fn straggler_pass_is_bounded_under_a_saturating_producer() {
        use std::sync::atomic::AtomicBool;
        use std::time::{Duration, Instant};

        let table = Arc::new(QueueTable::new());
        table.append(None, Box::new(|| {}));

        let stop = Arc::new(AtomicBool::new(false));
        let producer = {
            let table = table.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    table.append(None, Box::new(|| {}));
                }
            })
        };

        let config = PoolConfig::new()
            .min_batch(1)
            .max_batch(10)
            .swap_recursion_limit(2)
            .straggler_sleep(Duration::from_micros(50));

        let start = Instant::now();
        let snap = build_snapshot(&table, &config);
        let elapsed = start.elapsed();

        stop.store(true, Ordering::Relaxed);
        producer.join().unwrap();

        assert!(snap.initial_len() >= 1);
        // Two straggler passes at ~50us each, plus scheduling slop — nowhere
        // near "runs for as long as the producer does".
        assert!(elapsed < Duration::from_secs(1), "straggler pass did not bound itself: {elapsed:?}");
    }
}

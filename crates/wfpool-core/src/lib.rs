//! Platform-agnostic core of wfpool: the live queue table and the
//! weight-fair snapshot builder that turns it into dispatchable work.
//!
//! This crate has no thread-spawning or thread-local logic of its own —
//! that lives in `wfpool-runtime`, which drives `QueueTable` and
//! `Snapshot` from worker threads. Keeping the scheduling arithmetic here,
//! free of `std::thread`, makes it straightforward to unit test in
//! isolation (see `snapshot::tests`).

pub mod config;
pub mod env;
pub mod log;
pub mod queue_table;
pub mod snapshot;

pub use config::PoolConfig;
pub use queue_table::{QueueName, QueueTable, Task};
pub use snapshot::{build_snapshot, Snapshot};

//! Ergonomic conversions into a queue name at call sites.

use std::sync::Arc;
use wfpool_core::queue_table::QueueName;

/// Anything that can be used where a queue name is expected.
///
/// Lets callers write `pool.apply_async(task, ())` for the default queue,
/// `pool.apply_async(task, "reports")` for a named one, or pass a
/// `QueueName` they already have on hand.
pub trait IntoQueueName {
    fn into_queue_name(self) -> QueueName;
}

impl IntoQueueName for QueueName {
    fn into_queue_name(self) -> QueueName {
        self
    }
}

impl IntoQueueName for () {
    fn into_queue_name(self) -> QueueName {
        None
    }
}

impl IntoQueueName for &str {
    fn into_queue_name(self) -> QueueName {
        Some(Arc::from(self))
    }
}

impl IntoQueueName for String {
    fn into_queue_name(self) -> QueueName {
        Some(Arc::from(self.as_str()))
    }
}

impl IntoQueueName for Option<&str> {
    fn into_queue_name(self) -> QueueName {
        self.map(Arc::from)
    }
}

use std::any::Any;
use std::fmt;

/// What a failed task left behind.
///
/// Caught panics are converted to a message immediately (the original
/// payload from `catch_unwind` is `Box<dyn Any + Send>`, which is not
/// `Sync` and cannot cross into a `PoolError` that itself needs to be
/// `Send + Sync`). Errors returned via `Result::Err` keep their source
/// chain.
pub struct TaskPayload {
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TaskPayload {
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn from_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Self {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Convert a caught panic payload into a message-only `TaskPayload`.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "task panicked with a non-string payload".to_string()
        };
        Self {
            message,
            source: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl fmt::Display for TaskPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for TaskPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPayload")
            .field("message", &self.message)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_panic_str() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let p = TaskPayload::from_panic(payload);
        assert_eq!(p.message(), "boom");
    }

    #[test]
    fn from_panic_string() {
        let payload: Box<dyn Any + Send> = Box::new(String::from("boom"));
        let p = TaskPayload::from_panic(payload);
        assert_eq!(p.message(), "boom");
    }

    #[test]
    fn from_panic_other() {
        let payload: Box<dyn Any + Send> = Box::new(42u32);
        let p = TaskPayload::from_panic(payload);
        assert!(p.message().contains("non-string"));
    }
}

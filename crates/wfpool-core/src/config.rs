//! Pool configuration
//!
//! Compile-time defaults with environment overrides, builder-style.
//!
//! # Example
//!
//! ```
//! use wfpool_core::config::PoolConfig;
//!
//! let config = PoolConfig::from_env().workers(8);
//! assert!(config.validate().is_ok());
//! ```

use crate::env::{env_get, env_get_bool, env_get_opt};
use std::time::Duration;
use wfpool_error::ConfigError;

mod defaults {
    pub const MIN_BATCH: usize = 10;
    pub const MAX_BATCH: usize = 1000;
    pub const EXHAUSTED_WAIT_MS: u64 = 5000;
    pub const SWAP_RECURSION_LIMIT: u32 = 2;
    pub const STRAGGLER_SLEEP_US: u64 = 100;
}

/// Construction-time configuration for a [`Pool`](../../wfpool/struct.Pool.html).
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Target worker thread count.
    pub workers: usize,
    /// Lower bound on the per-queue slot count used when sizing a snapshot batch.
    pub min_batch: usize,
    /// Upper bound on the per-queue slot count used when sizing a snapshot batch.
    pub max_batch: usize,
    /// Slice-cursor threshold above which a queue is compacted rather than
    /// left as a zero-copy view. `None` means "half the queue's current length".
    pub max_slice: Option<usize>,
    /// Liveness-backstop timeout for the exhausted-state wait.
    pub exhausted_wait: Duration,
    /// Cap on the empty-transition retry recursion during a swap.
    pub swap_recursion_limit: u32,
    /// Sleep between straggler-pass retries while building a snapshot.
    pub straggler_sleep: Duration,
    /// Enable debug-level internal logging.
    pub debug_logging: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Build from compile-time defaults with environment overrides.
    ///
    /// Recognized variables: `WFPOOL_WORKERS`, `WFPOOL_MIN_BATCH`,
    /// `WFPOOL_MAX_BATCH`, `WFPOOL_MAX_SLICE`, `WFPOOL_EXHAUSTED_WAIT_MS`,
    /// `WFPOOL_SWAP_RECURSION_LIMIT`, `WFPOOL_STRAGGLER_SLEEP_US`,
    /// `WFPOOL_DEBUG`.
    pub fn from_env() -> Self {
        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            workers: env_get("WFPOOL_WORKERS", default_workers),
            min_batch: env_get("WFPOOL_MIN_BATCH", defaults::MIN_BATCH),
            max_batch: env_get("WFPOOL_MAX_BATCH", defaults::MAX_BATCH),
            max_slice: env_get_opt("WFPOOL_MAX_SLICE"),
            exhausted_wait: Duration::from_millis(env_get(
                "WFPOOL_EXHAUSTED_WAIT_MS",
                defaults::EXHAUSTED_WAIT_MS,
            )),
            swap_recursion_limit: env_get(
                "WFPOOL_SWAP_RECURSION_LIMIT",
                defaults::SWAP_RECURSION_LIMIT,
            ),
            straggler_sleep: Duration::from_micros(env_get(
                "WFPOOL_STRAGGLER_SLEEP_US",
                defaults::STRAGGLER_SLEEP_US,
            )),
            debug_logging: env_get_bool("WFPOOL_DEBUG", false),
        }
    }

    /// Build with explicit defaults, ignoring the environment. Useful for tests.
    pub fn new() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            min_batch: defaults::MIN_BATCH,
            max_batch: defaults::MAX_BATCH,
            max_slice: None,
            exhausted_wait: Duration::from_millis(defaults::EXHAUSTED_WAIT_MS),
            swap_recursion_limit: defaults::SWAP_RECURSION_LIMIT,
            straggler_sleep: Duration::from_micros(defaults::STRAGGLER_SLEEP_US),
            debug_logging: false,
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    pub fn min_batch(mut self, n: usize) -> Self {
        self.min_batch = n;
        self
    }

    pub fn max_batch(mut self, n: usize) -> Self {
        self.max_batch = n;
        self
    }

    pub fn max_slice(mut self, n: usize) -> Self {
        self.max_slice = Some(n);
        self
    }

    pub fn exhausted_wait(mut self, d: Duration) -> Self {
        self.exhausted_wait = d;
        self
    }

    pub fn swap_recursion_limit(mut self, n: u32) -> Self {
        self.swap_recursion_limit = n;
        self
    }

    pub fn straggler_sleep(mut self, d: Duration) -> Self {
        self.straggler_sleep = d;
        self
    }

    pub fn debug_logging(mut self, enable: bool) -> Self {
        self.debug_logging = enable;
        self
    }

    /// Validate configuration, returning the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue("workers must be > 0"));
        }
        if self.min_batch == 0 {
            return Err(ConfigError::InvalidValue("min_batch must be > 0"));
        }
        if self.max_batch < self.min_batch {
            return Err(ConfigError::InvalidValue("max_batch must be >= min_batch"));
        }
        if self.swap_recursion_limit == 0 {
            return Err(ConfigError::InvalidValue("swap_recursion_limit must be > 0"));
        }
        Ok(())
    }

    /// Print the configuration to stderr (debugging aid).
    pub fn print(&self) {
        eprintln!("wfpool configuration:");
        eprintln!("  workers:              {}", self.workers);
        eprintln!("  min_batch:            {}", self.min_batch);
        eprintln!("  max_batch:            {}", self.max_batch);
        eprintln!("  max_slice:            {:?}", self.max_slice);
        eprintln!("  exhausted_wait:       {:?}", self.exhausted_wait);
        eprintln!("  swap_recursion_limit: {}", self.swap_recursion_limit);
        eprintln!("  straggler_sleep:      {:?}", self.straggler_sleep);
        eprintln!("  debug_logging:        {}", self.debug_logging);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults_are_valid() {
        let config = PoolConfig::from_env();
        assert!(config.workers >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = PoolConfig::new().workers(8).min_batch(5).max_batch(50);
        assert_eq!(config.workers, 8);
        assert_eq!(config.min_batch, 5);
        assert_eq!(config.max_batch, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_catches_bad_values() {
        assert!(PoolConfig::new().workers(0).validate().is_err());
        assert!(PoolConfig::new().min_batch(0).validate().is_err());
        assert!(PoolConfig::new().min_batch(20).max_batch(5).validate().is_err());
    }
}

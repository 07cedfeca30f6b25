//! Kernel-style print macros for wfpool
//!
//! Thread-safe, context-aware debug output for the pool's own
//! diagnostics (task panics, internal invariant violations).
//! Automatically tags output with the current worker id.
//!
//! # Environment Variables
//!
//! - `WFPOOL_FLUSH_EPRINT=1` - Flush stderr after each print
//! - `WFPOOL_LOG_LEVEL=<level>` - off/error/warn/info/debug/trace (or 0-5)
//! - `WFPOOL_KPRINT_TIME=1` - Include a nanosecond timestamp in output

use crate::env::env_get_bool;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Off,
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Off => "",
            LogLevel::Error => "[ERROR]",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Trace => "[TRACE]",
        }
    }
}

static FLUSH_ENABLED: AtomicBool = AtomicBool::new(false);
static TIME_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

pub fn init() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    START_TIME.get_or_init(Instant::now);
    FLUSH_ENABLED.store(env_get_bool("WFPOOL_FLUSH_EPRINT", false), Ordering::Relaxed);
    TIME_ENABLED.store(env_get_bool("WFPOOL_KPRINT_TIME", false), Ordering::Relaxed);
    if let Ok(val) = std::env::var("WFPOOL_LOG_LEVEL") {
        let level = match val.to_lowercase().as_str() {
            "off" | "0" => LogLevel::Off,
            "error" | "1" => LogLevel::Error,
            "warn" | "2" => LogLevel::Warn,
            "info" | "3" => LogLevel::Info,
            "debug" | "4" => LogLevel::Debug,
            "trace" | "5" => LogLevel::Trace,
            _ => LogLevel::Info,
        };
        LOG_LEVEL.store(level as u8, Ordering::Relaxed);
    }
}

#[inline]
fn flush_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    FLUSH_ENABLED.load(Ordering::Relaxed)
}

#[inline]
fn time_enabled() -> bool {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    TIME_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn log_level() -> LogLevel {
    if !INITIALIZED.load(Ordering::Relaxed) {
        init();
    }
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

#[inline]
fn level_enabled(level: LogLevel) -> bool {
    level as u8 <= log_level() as u8
}

#[inline]
fn elapsed_ns() -> u64 {
    let start = START_TIME.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

thread_local! {
    static WORKER_ID: std::cell::Cell<Option<usize>> = const { std::cell::Cell::new(None) };
}

/// Tag the current OS thread as worker `id` for log-line context.
pub fn set_worker_id(id: usize) {
    WORKER_ID.with(|w| w.set(Some(id)));
}

/// Clear the worker tag (called when a worker thread exits).
pub fn clear_worker_id() {
    WORKER_ID.with(|w| w.set(None));
}

#[inline]
pub fn get_worker_id() -> Option<usize> {
    WORKER_ID.with(|w| w.get())
}

fn format_context() -> String {
    match get_worker_id() {
        Some(id) => format!("[w{id}]"),
        None => "[w--]".to_string(),
    }
}

#[doc(hidden)]
pub fn _wlog_impl(level: LogLevel, args: std::fmt::Arguments<'_>) {
    if !level_enabled(level) {
        return;
    }
    let stderr = std::io::stderr();
    let mut handle = stderr.lock();
    let _ = write!(handle, "{} ", level.prefix());
    if time_enabled() {
        let _ = write!(handle, "[{}] ", elapsed_ns());
    }
    let _ = write!(handle, "{} ", format_context());
    let _ = handle.write_fmt(args);
    let _ = handle.write_all(b"\n");
    if flush_enabled() {
        let _ = handle.flush();
    }
}

/// Error level log with worker context.
#[macro_export]
macro_rules! wlog_error {
    ($($arg:tt)*) => {{
        $crate::log::_wlog_impl($crate::log::LogLevel::Error, format_args!($($arg)*));
    }};
}

/// Warning level log with worker context.
#[macro_export]
macro_rules! wlog_warn {
    ($($arg:tt)*) => {{
        $crate::log::_wlog_impl($crate::log::LogLevel::Warn, format_args!($($arg)*));
    }};
}

/// Info level log with worker context.
#[macro_export]
macro_rules! wlog_info {
    ($($arg:tt)*) => {{
        $crate::log::_wlog_impl($crate::log::LogLevel::Info, format_args!($($arg)*));
    }};
}

/// Debug level log with worker context.
#[macro_export]
macro_rules! wlog_debug {
    ($($arg:tt)*) => {{
        $crate::log::_wlog_impl($crate::log::LogLevel::Debug, format_args!($($arg)*));
    }};
}

/// Trace level log with worker context.
#[macro_export]
macro_rules! wlog_trace {
    ($($arg:tt)*) => {{
        $crate::log::_wlog_impl($crate::log::LogLevel::Trace, format_args!($($arg)*));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Debug < LogLevel::Trace);
    }

    #[test]
    fn worker_id_context() {
        assert_eq!(get_worker_id(), None);
        set_worker_id(3);
        assert_eq!(get_worker_id(), Some(3));
        clear_worker_id();
        assert_eq!(get_worker_id(), None);
    }

    #[test]
    fn macros_compile() {
        set_log_level(LogLevel::Off);
        wlog_error!("err {}", 1);
        wlog_warn!("warn");
        wlog_info!("info");
        wlog_debug!("debug {:?}", Some(1));
        wlog_trace!("trace");
    }
}

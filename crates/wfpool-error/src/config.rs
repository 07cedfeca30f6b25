use std::fmt;

/// Returned by `PoolConfig::validate()`.
#[derive(Debug, Clone, Copy)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid pool config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

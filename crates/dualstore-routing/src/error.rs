//! Error types for routing
//!
//! Provides error handling for:
//! - Feature configuration parsing and validation
//! - Shadow writer pool submission

use std::path::PathBuf;

/// Feature configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Value not accepted for key
    #[error("invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Shadow percentage outside 0..=100
    #[error("shadow percentage out of range: {0} (expected 0-100)")]
    PercentageOutOfRange(i64),

    /// Malformed properties line
    #[error("malformed line {line}: '{content}'")]
    MalformedLine { line: usize, content: String },

    /// TOML parse failure
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error while reading a config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create invalid value error
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            expected,
        }
    }
}

/// Shadow writer pool errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShadowPoolError {
    /// Queue at capacity; the job was dropped
    #[error("shadow queue full (capacity: {0})")]
    QueueFull(usize),

    /// Pool shut down; the job was dropped
    #[error("shadow pool closed")]
    Closed,
}

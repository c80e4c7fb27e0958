//! Migration settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Migration run tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Delay before the first catalog query, milliseconds
    pub grace_period_ms: u64,
    /// Documents per bulk insert
    pub chunk_size: usize,
    /// Attempts per keyspace
    pub max_attempts: u32,
    /// Pause between attempts of one keyspace, milliseconds
    pub retry_pause_ms: u64,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            grace_period_ms: 10_000,
            chunk_size: 100,
            max_attempts: 3,
            retry_pause_ms: 0,
        }
    }
}

impl MigrationSettings {
    /// Create with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set grace period
    #[must_use]
    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Skip the grace period
    #[must_use]
    pub fn without_grace_period(mut self) -> Self {
        self.grace_period_ms = 0;
        self
    }

    /// Set chunk size; zero is raised to one
    #[must_use]
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set attempts per keyspace; zero is raised to one
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set pause between attempts
    #[must_use]
    pub fn with_retry_pause(mut self, pause: Duration) -> Self {
        self.retry_pause_ms = u64::try_from(pause.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Grace period
    #[inline]
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Pause between attempts
    #[inline]
    #[must_use]
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    /// Chunk size, at least one
    #[inline]
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }

    /// Attempts per keyspace, at least one
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

//! Error types for migration
//!
//! Provides error handling for:
//! - Legacy and target store collaborator failures
//! - Per-keyspace migration attempts

use std::path::PathBuf;

/// Store collaborator errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Statement rejected or failed
    #[error("query failed: {statement}: {reason}")]
    Query { statement: String, reason: String },

    /// Bulk write or index operation failed
    #[error("write to {collection} failed: {reason}")]
    Write { collection: String, reason: String },

    /// Stored data could not be decoded
    #[error("malformed data in {location}: {reason}")]
    Malformed { location: String, reason: String },

    /// IO error
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create query error
    pub fn query(statement: impl ToString, reason: impl Into<String>) -> Self {
        Self::Query {
            statement: statement.to_string(),
            reason: reason.into(),
        }
    }

    /// Create write error
    pub fn write(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Create malformed data error
    pub fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create IO error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from one keyspace migration attempt
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// Collaborator failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Fetched record without a usable native identifier
    #[error("record {index} in {keyspace} has no string _id")]
    MissingIdentifier { keyspace: String, index: usize },

    /// Run cancelled
    #[error("migration cancelled")]
    Cancelled,
}

impl MigrationError {
    /// Check if the attempt is worth retrying
    ///
    /// Every failure except cancellation is retried up to the attempt bound,
    /// including deterministic data errors.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

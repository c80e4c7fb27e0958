//! Error types for entity services

/// Entity service errors, surfaced unchanged from the primary store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// Entity does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Request rejected by validation
    #[error("invalid request: {0}")]
    Invalid(String),

    /// Store not reachable
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Store-side failure
    #[error("store error: {0}")]
    Store(String),
}

impl ServiceError {
    /// Create invalid request error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }

    /// Create store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }
}

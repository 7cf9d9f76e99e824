//! Error types for embedding generation

use thiserror::Error;

/// Result type alias for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors raised while generating embeddings
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The embedding endpoint was unreachable or answered with a transient
    /// status; callers retry these
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint rejected the request or returned an unusable response
    #[error("API error: {0}")]
    Api(String),

    /// The response payload could not be decoded into vectors
    #[error("decode error: {0}")]
    Decode(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl EmbeddingError {
    /// Whether a retry may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

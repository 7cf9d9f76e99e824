//! Error types for the index backends

use thiserror::Error;

/// Result type alias for index operations
pub type VectorDataResult<T> = Result<T, VectorDataError>;

/// Errors raised by the vector and keyword index backends
#[derive(Error, Debug)]
pub enum VectorDataError {
    /// The backend was unreachable or answered with a transient status;
    /// the BatchWriter retries these
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend rejected an operation
    #[error("storage error: {0}")]
    Storage(String),

    /// A response payload could not be interpreted
    #[error("decode error: {0}")]
    Decode(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl VectorDataError {
    /// Whether a retry may succeed
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

//! Error types for textification

use thiserror::Error;

/// Result type alias for textifier operations
pub type TextifyResult<T> = Result<T, TextifyError>;

/// Errors raised while rendering or chunking an entity
#[derive(Error, Debug)]
pub enum TextifyError {
    /// No locale pack exists for the requested language code
    #[error("no locale pack for language '{0}'")]
    UnknownLocale(String),

    /// Tokenizer loading or encoding failed
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// A time value did not match the dump time format
    #[error("malformed time value: {0}")]
    Time(String),

    /// Label resolution against the store failed
    #[error("label resolution failed: {0}")]
    Resolver(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl TextifyError {
    /// Create a tokenizer error
    pub fn tokenizer(msg: impl Into<String>) -> Self {
        Self::Tokenizer(msg.into())
    }

    /// Create a malformed-time error
    pub fn time(msg: impl Into<String>) -> Self {
        Self::Time(msg.into())
    }

    /// Create a resolver error
    pub fn resolver(msg: impl Into<String>) -> Self {
        Self::Resolver(msg.into())
    }
}

//! Error types for the persistent store layer

use thiserror::Error;
use wikivec_common::{CommonError, impl_common_conversions};

/// Result type alias for store operations
pub type DataResult<T> = Result<T, DataError>;

/// Errors raised by the SQLite-backed stores
#[derive(Error, Debug)]
pub enum DataError {
    /// Opening the database or executing a statement failed
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored JSON column or embedding blob could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Caller-supplied identifier (e.g. cache namespace) is not usable
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// General I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl CommonError for DataError {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    fn storage_error(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl_common_conversions!(DataError, with_serde);

impl From<sqlx::Error> for DataError {
    fn from(e: sqlx::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

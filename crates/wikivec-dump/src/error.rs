//! Error types for the dump reader

use thiserror::Error;
use wikivec_common::{CommonError, impl_common_conversions};

/// Result type alias for dump operations
pub type DumpResult<T> = Result<T, DumpError>;

/// Errors raised while reading a dump file
///
/// Only stage-fatal conditions surface here; malformed lines are logged and
/// skipped inside the consumers.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Opening or reading the dump file failed
    #[error("I/O error: {0}")]
    Io(String),

    /// The file extension maps to no known decompressor
    #[error("unsupported dump extension '{0}' (expected json, gz or bz2)")]
    UnsupportedExtension(String),

    /// A worker task panicked or was aborted
    #[error("worker failure: {0}")]
    Worker(String),

    /// Generic error for other cases
    #[error("Other error: {0}")]
    Other(String),
}

impl CommonError for DumpError {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    fn parse_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    fn storage_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl_common_conversions!(DumpError);

//! Configuration error types

use thiserror::Error;

/// Errors produced while building or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable was set but could not be parsed
    #[error("invalid value for {variable}: {message}")]
    InvalidValue { variable: String, message: String },

    /// A setting failed validation
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },
}

impl ConfigError {
    pub fn invalid_value(variable: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            variable: variable.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Specialized Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

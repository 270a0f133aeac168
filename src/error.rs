//! Error types for the Slidegate service.

use thiserror::Error;

/// Main error type for Slidegate operations.
///
/// A denied request is not an error; only setup and serving can fail.
#[derive(Error, Debug)]
pub enum SlidegateError {
    /// Configuration could not be loaded or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration values are out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for SlidegateError {
    fn from(err: ::config::ConfigError) -> Self {
        SlidegateError::Config(err.to_string())
    }
}

/// Result type alias for Slidegate operations.
pub type Result<T> = std::result::Result<T, SlidegateError>;

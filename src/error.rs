//! Error types for qx.
//!
//! Building a statement never returns an error: malformed construction is a
//! programmer mistake and panics. `QxError` covers the fallible edges around the
//! builder (untrusted templates, configuration, and the database engine).

use thiserror::Error;

/// The main error type for qx operations.
#[derive(Debug, Error)]
pub enum QxError {
    /// A raw template could not be parsed or does not match its parts.
    #[error("Template error at position {position}: {message}")]
    Template { position: usize, message: String },

    /// A value cannot be bound for the target database.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Database connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QxError {
    /// Create a template error at the given byte position.
    pub fn template(position: usize, message: impl Into<String>) -> Self {
        Self::Template {
            position,
            message: message.into(),
        }
    }
}

/// Result type alias for qx operations.
pub type QxResult<T> = Result<T, QxError>;

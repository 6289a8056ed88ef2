//! Error types for the chat relay.

use thiserror::Error;

/// Common error type for the chat relay.
///
/// Only startup and I/O failures surface here. Protocol problems such as
/// malformed payloads or name conflicts are handled by the registry.
#[derive(Error, Debug)]
pub enum RelayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl RelayError {
    /// Create a bind error for the given address.
    pub fn bind(addr: impl std::fmt::Display, source: std::io::Error) -> Self {
        RelayError::Bind {
            addr: addr.to_string(),
            source,
        }
    }
}

/// Result type alias for chat relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

//! Error types for retrophoto-core

use thiserror::Error;

/// Result type alias using retrophoto-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in retrophoto-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The durable queue medium could not be read or written
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue item not found
    #[error("Queue item not found: {0}")]
    NotFound(String),

    /// Queue item is not in a state that allows the requested transition
    #[error("Queue item {id} cannot move from {status} to {target}")]
    InvalidTransition {
        id: String,
        status: String,
        target: &'static str,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<libsql::Error> for Error {
    fn from(error: libsql::Error) -> Self {
        Self::StorageUnavailable(error.to_string())
    }
}

impl Error {
    /// Whether this error means the durable medium itself is inaccessible.
    pub const fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_) | Self::Io(_))
    }
}

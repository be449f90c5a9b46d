//! Error types for pollchat-core

use thiserror::Error;

/// Result type alias using pollchat-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pollchat-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Conversation (or other record) absent when it was looked up
    #[error("Not found: {0}")]
    NotFound(String),

    /// A storage collaborator call failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// `SQLite` error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error means the target record does not exist.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

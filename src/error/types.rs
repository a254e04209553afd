//! Error types
//!
//! Defines the storage error taxonomy and the HTTP-facing API error.

use std::io;

use thiserror::Error;

/// Storage module errors
///
/// Messages only ever carry logical (client-visible) paths, never host paths.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Malformed or traversal-attempting path, or an invalid leaf name.
    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Name collision with an entry of a conflicting kind.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl StorageError {
    pub fn invalid_path() -> Self {
        StorageError::Rejected("invalid path".into())
    }

    /// Message safe to hand back to a client.
    pub fn client_message(&self) -> String {
        match self {
            StorageError::Io(_) => "storage operation failed".into(),
            other => other.to_string(),
        }
    }
}

/// Errors surfaced by the HTTP layer
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Malformed request body or missing required input.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// No route matched the request.
    #[error("not found")]
    NoRoute,
}

//! Common error types for the annotation backend

use thiserror::Error;

/// Common result type for backend operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by the storage layer, asset engine and HTTP surface
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed required field (empty session id, empty image id)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Requested entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem or image-decode failure while handling an asset
    #[error("Asset error: {0}")]
    Asset(String),

    /// Persistence failure (wraps sqlx::Error)
    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a validation failure on a required field
    pub fn required(field: &str) -> Self {
        Error::Validation(format!("{} is required", field))
    }
}

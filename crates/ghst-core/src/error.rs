//! Error types for ghst-core

use thiserror::Error;

/// Result type alias for ghst operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the ghst HTTP framework
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// File extension missing from the MIME table
    #[error("Content type not found for {0}")]
    ContentTypeNotFound(String),

    /// Body exceeded the configured limit
    #[error("Body too large: exceeds limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    /// Body is not valid JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File is not valid UTF-8 text
    #[error("Invalid UTF-8 in {0}")]
    Utf8(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hyper error
    #[error("HTTP error: {0}")]
    Hyper(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

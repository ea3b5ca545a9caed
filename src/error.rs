//! Error types for the alistlib library.

use thiserror::Error;

/// Main error type for alistlib operations.
#[derive(Error, Debug)]
pub enum AlistError {
    /// Network request error.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Login failed or a token is required but not set.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The remote item does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server rejected an operation with a non-200 envelope.
    #[error("Storage error: {code} - {message}")]
    Storage { code: i64, message: String },

    /// The envelope's `data` did not match the shape expected for the
    /// endpoint. Indicates drift between this client and the server API.
    #[error("Schema mismatch for {endpoint}: {detail}")]
    Schema { endpoint: String, detail: String },

    /// The target already exists.
    #[error("File exists: {0}")]
    FileExists(String),

    /// The path is a directory where a file was expected.
    #[error("Is a directory: {0}")]
    IsADirectory(String),

    /// The path is not a directory where one was expected.
    #[error("Not a directory: {0}")]
    NotADirectory(String),

    /// The path's drive refers to a server no client has been created for.
    #[error("No client registered for server: {0}")]
    UnknownServer(String),

    /// The path cannot be used for the requested operation.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Custom error message.
    #[error("{0}")]
    Custom(String),
}

impl AlistError {
    /// True for the error that `exists()` and `missing_ok` flags absorb.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AlistError::NotFound(_))
    }
}

/// Result type alias for alistlib operations.
pub type Result<T> = std::result::Result<T, AlistError>;

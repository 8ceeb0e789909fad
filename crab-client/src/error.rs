//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connectivity or timeout failure before any response
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response other than a refreshable 401
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    /// Credential rejected and could not be renewed; caller must log in again
    #[error("Authentication expired")]
    AuthenticationExpired,

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Credential cache could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// Client was closed
    #[error("Client closed")]
    Closed,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

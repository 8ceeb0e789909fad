//! Error types for the print link

use thiserror::Error;

/// Print link error types
#[derive(Debug, Error)]
pub enum LinkError {
    /// Link is not Connected; routine, callers warn the user and move on
    #[error("Print daemon link unavailable")]
    LinkUnavailable,

    /// Socket could not be opened
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Frame could not be written
    #[error("Send failed: {0}")]
    Send(String),

    /// Inbound frame could not be parsed
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Timeout waiting for the daemon
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Daemon closed the connection
    #[error("Connection closed")]
    Closed,
}

/// Result type for link operations
pub type LinkResult<T> = Result<T, LinkError>;

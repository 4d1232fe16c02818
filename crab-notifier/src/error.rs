//! Client error types

use thiserror::Error;

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid response format
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Config(String),

    /// Preference file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Channel transport failed
    #[error("Transport error: {0}")]
    Transport(#[from] crate::message::TransportError),

    /// The notifier loop is no longer running
    #[error("Notifier stopped")]
    Stopped,
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

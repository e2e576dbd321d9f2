//! Error types for businessmap-mcp.

use thiserror::Error;

/// Main error type for Businessmap operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response arrived
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request did not complete in time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// API key rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// API key lacks access to the resource (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// API returned an error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mutating operation attempted while read-only mode is enabled
    #[error("Cannot perform operation \"{operation}\" in read-only mode")]
    ReadOnly { operation: String },

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map a non-success HTTP status to the matching error variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            _ => Error::Api { status, message },
        }
    }

    /// Stable tag describing the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Http(_) => "http",
            Error::Timeout(_) => "timeout",
            Error::Unauthorized(_) => "unauthorized",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound(_) => "not_found",
            Error::Api { .. } => "api",
            Error::InvalidData(_) => "invalid_data",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::ReadOnly { .. } => "read_only",
            Error::Other(_) => "other",
        }
    }

    /// HTTP status associated with the error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthorized(_) => Some(401),
            Error::Forbidden(_) => Some(403),
            Error::NotFound(_) => Some(404),
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for Businessmap operations.
pub type Result<T> = std::result::Result<T, Error>;

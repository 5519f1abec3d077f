//! Error types for the EdgeSync system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for EdgeSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the EdgeSync system
#[derive(Error, Debug)]
pub enum Error {
    /// A service failed validation (credentials, domain, sources)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A dynamic source could not be resolved this cycle
    #[error("Address resolution error: {0}")]
    Resolution(String),

    /// A provider call returned an HTTP error or an embedded error code
    #[error("Remote API error ({provider}): {message}")]
    RemoteApi {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Configuration store errors
    #[error("Config store error: {0}")]
    Store(String),

    /// HTTP transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an address resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a remote API error
    pub fn remote_api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteApi {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a config store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error is terminal for the service this cycle
    /// (requires a configuration fix, never auto-retried)
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether this error only aborts the current cycle's resolution
    /// (retried automatically next cycle)
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

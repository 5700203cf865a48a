//! Backend error types.

use thiserror::Error;

/// Errors returned by a [`BackendClient`](crate::BackendClient).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The request did not complete within the client timeout.
    #[error("request to {path} timed out")]
    Timeout { path: String },

    /// The backend answered with a non-success status code.
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Backend-provided description, or the raw body.
        message: String,
    },

    /// Transport failure (connection refused, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not valid JSON.
    #[error("failed to decode backend response: {0}")]
    Decode(String),

    /// The client could not be constructed.
    #[error("invalid backend configuration: {0}")]
    Config(String),
}

impl BackendError {
    /// Whether a retry with a different page size may succeed.
    ///
    /// Covers client-side timeouts, gateway/request timeouts and
    /// payload-too-large responses.
    pub fn is_timeout_class(&self) -> bool {
        match self {
            BackendError::Timeout { .. } => true,
            BackendError::Status { status, .. } => matches!(status, 408 | 413 | 504),
            _ => false,
        }
    }

    /// The backend's own message, when it sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Status { message, .. } => Some(message),
            _ => None,
        }
    }
}

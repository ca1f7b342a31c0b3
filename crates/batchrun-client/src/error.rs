//! Error types for the client.

use thiserror::Error;

/// Errors that can occur when talking to the dispatcher.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The dispatcher answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ClientError {
    /// Whether the dispatcher rejected the batch during validation.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { status: 400, .. })
    }
}

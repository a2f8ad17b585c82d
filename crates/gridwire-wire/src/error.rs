//! Errors raised while parsing inbound documents or encoding frames.

use thiserror::Error;

/// Errors surfaced by the document codec.
#[derive(Debug, Error)]
pub enum WireError {
    /// The inbound line is not a valid document.
    #[error("malformed document: {message}")]
    Malformed {
        /// Human-readable description of the parse failure.
        message: String,
        /// Underlying JSON error, when one exists.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// A frame could not be serialised.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

impl WireError {
    /// Creates a malformed document error with a custom message.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a malformed document error from a JSON parse failure.
    #[must_use]
    pub fn from_json_error(source: serde_json::Error) -> Self {
        Self::Malformed {
            message: source.to_string(),
            source: Some(source),
        }
    }
}

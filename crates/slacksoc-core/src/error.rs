//! Error types for the slacksoc core.

use thiserror::Error;

/// Errors returned by the [`Bot`](crate::Bot) send primitive.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The backend connection is gone; nothing can be sent.
    #[error("bot is not connected")]
    NotConnected,

    /// The backend rejected the call.
    #[error("backend rejected '{method}': {reason}")]
    Rejected {
        /// The backend method that was called.
        method: &'static str,
        /// Reason reported by the backend.
        reason: String,
    },
}

impl ApiError {
    /// Creates a rejection error for the given method.
    pub fn rejected(method: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            method,
            reason: reason.into(),
        }
    }
}

/// Result type for send operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced while decoding an inbound event.
#[derive(Debug, Error)]
pub enum EventError {
    /// The payload is not a JSON object.
    #[error("event payload must be a JSON object")]
    NotAnObject,

    /// The payload has no string `type` field.
    #[error("event payload has no 'type' field")]
    MissingType,

    /// The payload has a known `type` but a malformed body.
    #[error("malformed '{kind}' event: {source}")]
    Malformed {
        /// The event kind that failed to decode.
        kind: String,
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

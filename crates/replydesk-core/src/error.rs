//! Error types for the core library.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] replydesk_api::Error),

    /// Input rejected locally; no network call was made.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Another operation on the same message is still in flight.
    #[error("Message {message_id} is busy ({status})")]
    Busy {
        /// Message the operation targeted.
        message_id: String,
        /// Status that blocked the operation.
        status: &'static str,
    },

    /// The operation is not allowed in the draft's current status.
    #[error("Cannot {action} message {message_id} while it is {status}")]
    InvalidState {
        /// Message the operation targeted.
        message_id: String,
        /// Operation that was refused.
        action: &'static str,
        /// Current status.
        status: &'static str,
    },

    /// The message has no live draft.
    #[error("Message {0} has no draft")]
    NoDraft(String),

    /// The reply for this message was already sent.
    #[error("Reply to message {0} was already sent")]
    AlreadySent(String),

    /// The backend handed out a draft id that was already retired.
    #[error("Draft id {0} was already retired")]
    DraftIdReused(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Returns true if the user may simply retry (the session is still usable).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Api(err) if err.is_unauthorized())
    }

    /// Returns true if the session was rejected by the backend.
    #[must_use]
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_unauthorized())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

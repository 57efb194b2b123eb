//! Compose data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{ValidationError, require_body, require_recipient};

/// A new message to send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// Recipient address.
    pub to: String,
    /// Subject line (may be empty).
    pub subject: String,
    /// Body.
    pub body: String,
}

impl OutgoingMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Every problem with the form, in field order.
    #[must_use]
    pub fn errors(&self) -> Vec<ValidationError> {
        [require_recipient(&self.to), require_body(&self.body)]
            .into_iter()
            .filter_map(Result::err)
            .collect()
    }

    /// Checks the form before sending.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_recipient(&self.to)?;
        require_body(&self.body)
    }

    /// Returns true if every field is blank.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.to.trim().is_empty() && self.subject.trim().is_empty() && self.body.trim().is_empty()
    }
}

/// An autosaved compose form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCompose {
    /// Account the form belongs to.
    pub account: String,
    /// Form content.
    pub message: OutgoingMessage,
    /// When it was last saved.
    pub saved_at: DateTime<Utc>,
}

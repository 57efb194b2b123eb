//! Message model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::parse_mailbox;

/// Provider-issued message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Create a new message ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Provider-issued draft identifier. Never reused once retired.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub String);

impl DraftId {
    /// Create a new draft ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DraftId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DraftId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One inbound email as shown to the user.
///
/// Only the read flag and the draft linkage fields are ever changed after
/// the message is listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Provider identifier.
    pub id: MessageId,
    /// Sender display name.
    pub sender: String,
    /// Sender address.
    pub sender_email: String,
    /// Subject line.
    pub subject: String,
    /// Short preview text.
    #[serde(default)]
    pub snippet: String,
    /// Full body, fetched lazily.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// When the message was received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Read flag.
    #[serde(default)]
    pub is_read: bool,
    /// Live reply draft, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<DraftId>,
    /// A reply draft was generated at some point.
    #[serde(default)]
    pub ai_reply_generated: bool,
    /// The reply was sent.
    #[serde(default)]
    pub reply_sent: bool,
}

impl Message {
    /// Creates a message with the given sender address and subject.
    #[must_use]
    pub fn new(id: impl Into<MessageId>, sender_email: &str, subject: &str) -> Self {
        Self::from_headers(id, sender_email, subject, "", None)
    }

    /// Builds a message from raw header values.
    ///
    /// The `From` header is parsed with [`parse_mailbox`]; a blank subject
    /// becomes `(No Subject)` and the date accepts RFC 2822 or RFC 3339.
    #[must_use]
    pub fn from_headers(
        id: impl Into<MessageId>,
        from: &str,
        subject: &str,
        snippet: &str,
        date: Option<&str>,
    ) -> Self {
        let mailbox = parse_mailbox(from).unwrap_or_default();
        let subject = subject.trim();

        Self {
            id: id.into(),
            sender: mailbox.name,
            sender_email: mailbox.address,
            subject: if subject.is_empty() {
                "(No Subject)".to_string()
            } else {
                subject.to_string()
            },
            snippet: snippet.to_string(),
            body: None,
            timestamp: date.and_then(parse_date),
            is_read: false,
            draft_id: None,
            ai_reply_generated: false,
            reply_sent: false,
        }
    }

    /// Returns true if the message has a live draft awaiting review.
    #[must_use]
    pub const fn has_pending_draft(&self) -> bool {
        self.draft_id.is_some() && !self.reply_sent
    }
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

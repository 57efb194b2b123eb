//! Draft state types.

use serde::{Deserialize, Serialize};

use crate::message::{DraftId, MessageId, ReplyTarget};

/// Where a message's reply draft stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// No live draft.
    #[default]
    Absent,
    /// An existing draft is being fetched.
    Loading,
    /// A draft is being generated.
    Generating,
    /// The draft matches what was last persisted.
    Ready,
    /// The draft has unsaved local edits.
    Edited,
    /// The draft is being sent.
    Sending,
    /// The draft is being deleted.
    Deleting,
    /// The reply was sent. Terminal.
    Sent,
}

impl DraftStatus {
    /// Returns true while a network operation owns the message.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Loading | Self::Generating | Self::Sending | Self::Deleting
        )
    }

    /// Returns true if the draft can be edited, sent or deleted.
    #[must_use]
    pub const fn has_live_draft(self) -> bool {
        matches!(self, Self::Ready | Self::Edited)
    }

    /// Lowercase name used in logs and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Loading => "loading",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Edited => "edited",
            Self::Sending => "sending",
            Self::Deleting => "deleting",
            Self::Sent => "sent",
        }
    }
}

impl std::fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `content` differs from `origin` ignoring surrounding whitespace.
#[must_use]
pub fn is_edited(content: &str, origin: &str) -> bool {
    content.trim() != origin.trim()
}

/// Snapshot of one message's draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Draft {
    /// Owning message.
    pub message_id: MessageId,
    /// Live draft id, once the draft exists remotely.
    pub draft_id: Option<DraftId>,
    /// Current status.
    pub status: DraftStatus,
    /// Current body, including local edits.
    pub body: String,
    /// Body as last confirmed persisted.
    pub origin: String,
    /// Recipient and subject, when known.
    #[serde(skip)]
    pub reply_to: Option<ReplyTarget>,
    /// Why the last generation failed, if it did.
    pub last_error: Option<String>,
}

impl Draft {
    /// Returns true if the body differs from what was persisted.
    #[must_use]
    pub fn is_edited(&self) -> bool {
        is_edited(&self.body, &self.origin)
    }
}

/// Per-message state kept by the controller.
#[derive(Debug, Clone, Default)]
pub(crate) struct DraftSlot {
    pub status: DraftStatus,
    pub draft_id: Option<DraftId>,
    pub body: String,
    pub origin: String,
    pub reply_to: Option<ReplyTarget>,
    /// A reply to this message is known to have been sent.
    pub answered: bool,
    /// Bumped whenever an operation starts; completions carry the value
    /// they started with and are dropped if it moved on.
    pub epoch: u64,
    pub last_error: Option<String>,
}

impl DraftSlot {
    pub(crate) fn snapshot(&self, message_id: &MessageId) -> Draft {
        Draft {
            message_id: message_id.clone(),
            draft_id: self.draft_id.clone(),
            status: self.status,
            body: self.body.clone(),
            origin: self.origin.clone(),
            reply_to: self.reply_to.clone(),
            last_error: self.last_error.clone(),
        }
    }

    /// Drops the draft and its content; the message returns to `Absent`.
    pub(crate) fn clear(&mut self) {
        self.status = DraftStatus::Absent;
        self.draft_id = None;
        self.body.clear();
        self.origin.clear();
    }

    /// The status an operation settles in. Answered messages end `Sent`
    /// whatever the operation would otherwise leave behind.
    pub(crate) const fn settled(&self, status: DraftStatus) -> DraftStatus {
        if self.answered {
            DraftStatus::Sent
        } else {
            status
        }
    }

    pub(crate) fn begin(&mut self, status: DraftStatus) -> u64 {
        self.status = status;
        self.epoch += 1;
        self.epoch
    }
}

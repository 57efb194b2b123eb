//! Results of draft operations that are more than pass/fail.

use replydesk_api::DeleteReceipt;

use super::model::Draft;
use crate::message::{DraftId, MessageId};

/// What happened to a draft in one store during a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreRemoval {
    /// The store held the draft and removed it.
    Deleted,
    /// The store did not hold the draft.
    AlreadyAbsent,
    /// Removal failed; the store may still hold it.
    Failed(String),
}

/// Result of deleting a draft from the mailbox and the draft records.
///
/// The message is back to `Absent` whatever the per-store results are;
/// the fields say what actually happened so the caller can report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// The deleted draft.
    pub draft_id: DraftId,
    /// Mailbox draft store.
    pub remote: StoreRemoval,
    /// Backend draft record.
    pub record: StoreRemoval,
}

impl DeleteOutcome {
    pub(crate) fn from_receipt(draft_id: DraftId, receipt: &DeleteReceipt) -> Self {
        let remote = if receipt.remote_deleted {
            StoreRemoval::Deleted
        } else {
            StoreRemoval::AlreadyAbsent
        };
        let record = match (&receipt.record_error, receipt.record_deleted) {
            (Some(reason), _) => StoreRemoval::Failed(reason.clone()),
            (None, true) => StoreRemoval::Deleted,
            (None, false) => StoreRemoval::AlreadyAbsent,
        };
        Self {
            draft_id,
            remote,
            record,
        }
    }

    /// Neither store knew the draft.
    pub(crate) const fn already_gone(draft_id: DraftId) -> Self {
        Self {
            draft_id,
            remote: StoreRemoval::AlreadyAbsent,
            record: StoreRemoval::AlreadyAbsent,
        }
    }

    /// Both stores held the draft and removed it.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.remote == StoreRemoval::Deleted && self.record == StoreRemoval::Deleted
    }

    /// The stores did not end up in agreement, or one was already out of step.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.is_complete()
    }

    /// A store reported a failure.
    #[must_use]
    pub const fn has_failure(&self) -> bool {
        matches!(self.remote, StoreRemoval::Failed(_))
            || matches!(self.record, StoreRemoval::Failed(_))
    }

    /// One-line description of the resulting state.
    #[must_use]
    pub fn summary(&self) -> String {
        use StoreRemoval::{AlreadyAbsent, Deleted, Failed};

        match (&self.remote, &self.record) {
            (Deleted, Deleted) => "Draft deleted".to_string(),
            (AlreadyAbsent, AlreadyAbsent) => "Draft was already deleted".to_string(),
            (Deleted, AlreadyAbsent) => {
                "Draft deleted from the mailbox; no saved record was found".to_string()
            }
            (AlreadyAbsent, Deleted) => {
                "Draft was already gone from the mailbox; saved record removed".to_string()
            }
            (Failed(reason), _) => format!("Mailbox draft could not be deleted: {reason}"),
            (_, Failed(reason)) => {
                format!("Draft deleted from the mailbox, but its saved record remains: {reason}")
            }
        }
    }
}

/// Result of loading a stored draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The draft as currently held; check its status.
    Loaded(Draft),
    /// The reply was already sent; nothing was fetched, or the draft was
    /// consumed by the send.
    AlreadySent,
    /// The draft is gone from the mailbox; the message is `Absent`.
    Missing,
    /// The requested id was replaced by a newer draft and was not fetched.
    Superseded,
    /// Focus moved to another message before the fetch completed.
    Discarded,
    /// The message has no stored draft.
    NoDraft,
}

/// How edited content reached the mailbox before sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStrategy {
    /// No local edits; the stored draft was sent as is.
    Unchanged,
    /// The draft was updated first, then sent.
    UpdateThenSend,
    /// The edited body was passed to the send call.
    SendWithOverrides,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    /// Message that was answered.
    pub message_id: MessageId,
    /// Draft that was consumed.
    pub draft_id: DraftId,
    /// Body as finally sent.
    pub body: String,
    /// How edits were applied.
    pub strategy: SendStrategy,
    /// Provider id of the sent reply, if reported.
    pub sent_message_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(remote: bool, record: bool, error: Option<&str>) -> DeleteReceipt {
        DeleteReceipt {
            remote_deleted: remote,
            record_deleted: record,
            record_error: error.map(ToString::to_string),
        }
    }

    #[test]
    fn test_complete_delete() {
        let outcome = DeleteOutcome::from_receipt("d1".into(), &receipt(true, true, None));
        assert!(outcome.is_complete());
        assert!(!outcome.is_degraded());
        assert_eq!(outcome.summary(), "Draft deleted");
    }

    #[test]
    fn test_record_failure_is_reported() {
        let outcome = DeleteOutcome::from_receipt("d1".into(), &receipt(true, false, Some("timeout")));
        assert_eq!(outcome.remote, StoreRemoval::Deleted);
        assert_eq!(outcome.record, StoreRemoval::Failed("timeout".into()));
        assert!(outcome.is_degraded());
        assert!(outcome.has_failure());
        assert!(outcome.summary().contains("saved record remains"));
    }

    #[test]
    fn test_one_store_out_of_step() {
        let outcome = DeleteOutcome::from_receipt("d1".into(), &receipt(false, true, None));
        assert!(outcome.is_degraded());
        assert!(!outcome.has_failure());
        assert_eq!(
            outcome.summary(),
            "Draft was already gone from the mailbox; saved record removed"
        );
    }

    #[test]
    fn test_already_gone() {
        let outcome = DeleteOutcome::already_gone("d1".into());
        assert_eq!(outcome.summary(), "Draft was already deleted");
    }
}

//! Message-to-draft reconciliation.
//!
//! [`DraftIndex`] mirrors the backend's draft records: which messages have
//! a stored draft and which were answered. It is rebuilt after a reload and
//! used to seed the draft controller, which then annotates listed messages.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use replydesk_api::DraftLink;
use tracing::{debug, warn};

use crate::backend::DraftBackend;
use crate::error::Result;
use crate::message::{DraftId, MessageId};

/// Stored draft links and answered messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DraftIndex {
    drafts: BTreeMap<MessageId, DraftId>,
    sent: BTreeSet<MessageId>,
}

impl DraftIndex {
    /// Builds an index from raw records.
    ///
    /// When a message appears more than once, the last record wins.
    #[must_use]
    pub fn new(links: impl IntoIterator<Item = DraftLink>, sent: HashSet<String>) -> Self {
        let mut drafts = BTreeMap::new();
        for link in links {
            let message_id = MessageId::from(link.message_id);
            let draft_id = DraftId::from(link.draft_id);
            if let Some(previous) = drafts.insert(message_id.clone(), draft_id.clone()) {
                warn!(%message_id, %previous, current = %draft_id, "Duplicate draft record");
            }
        }

        Self {
            drafts,
            sent: sent.into_iter().map(MessageId::from).collect(),
        }
    }

    /// Fetches the draft records and sent ids from the backend.
    ///
    /// A failure to list sent ids is logged and treated as "none sent",
    /// unless the session was rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft records cannot be listed or the
    /// session is no longer valid.
    pub async fn fetch<B: DraftBackend + ?Sized>(backend: &B) -> Result<Self> {
        let links = backend.list_drafts().await?;
        let sent = match backend.sent_message_ids().await {
            Ok(sent) => sent,
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Could not list sent replies");
                HashSet::new()
            }
        };

        let index = Self::new(links, sent);
        debug!(drafts = index.drafts.len(), sent = index.sent.len(), "Fetched draft index");
        Ok(index)
    }

    /// Stored draft for `message_id`, unless the message was answered.
    #[must_use]
    pub fn draft_for(&self, message_id: &MessageId) -> Option<&DraftId> {
        if self.is_sent(message_id) {
            return None;
        }
        self.drafts.get(message_id)
    }

    /// Returns true if the reply to `message_id` was sent.
    #[must_use]
    pub fn is_sent(&self, message_id: &MessageId) -> bool {
        self.sent.contains(message_id)
    }

    /// Pending draft links (answered messages excluded).
    pub fn links(&self) -> impl Iterator<Item = (&MessageId, &DraftId)> {
        self.drafts
            .iter()
            .filter(|(message_id, _)| !self.sent.contains(*message_id))
    }

    /// Answered messages.
    pub fn sent(&self) -> impl Iterator<Item = &MessageId> {
        self.sent.iter()
    }

    /// Number of pending drafts.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.links().count()
    }

    /// Returns true if there are neither drafts nor answered messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty() && self.sent.is_empty()
    }
}

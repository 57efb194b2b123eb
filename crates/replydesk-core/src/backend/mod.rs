//! The seam between the core and the backend.
//!
//! [`DraftBackend`] covers every call the core makes. `ApiClient`
//! implements it over HTTP. With the `test-util` feature, `MemoryBackend`
//! keeps both draft stores in memory for tests.

mod http;
#[cfg(any(test, feature = "test-util"))]
mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use replydesk_api::{
    DeleteReceipt, DraftDetail, DraftLink, DraftUpdate, GeneratedDraft, SendOverride, SendReceipt,
    SentEmail,
};

#[cfg(any(test, feature = "test-util"))]
pub use memory::{Call, CallKind, Fault, MemoryBackend};

use crate::message::{DraftId, MessageId};

/// Result of a backend call.
pub type BackendResult<T> = replydesk_api::Result<T>;

/// Remote operations used by the draft lifecycle, batch and sync logic.
#[async_trait]
pub trait DraftBackend: Send + Sync {
    /// Asks the AI collaborator for a reply draft.
    async fn generate_draft(&self, message_id: &MessageId) -> BackendResult<GeneratedDraft>;

    /// Fetches a draft's current content.
    async fn get_draft(&self, draft_id: &DraftId) -> BackendResult<DraftDetail>;

    /// Replaces a draft's recipient, subject and body.
    async fn update_draft(&self, draft_id: &DraftId, update: &DraftUpdate)
    -> BackendResult<DraftDetail>;

    /// Sends a draft, applying any overrides in the same call.
    async fn send_draft(&self, draft_id: &DraftId, overrides: &SendOverride)
    -> BackendResult<SendReceipt>;

    /// Deletes a draft from the mailbox, then its backend record.
    async fn delete_draft(&self, draft_id: &DraftId) -> BackendResult<DeleteReceipt>;

    /// Lists stored message-to-draft records.
    async fn list_drafts(&self) -> BackendResult<Vec<DraftLink>>;

    /// Lists messages whose reply was sent.
    async fn sent_message_ids(&self) -> BackendResult<HashSet<String>>;

    /// Reads the context sync flag.
    async fn sync_status(&self) -> BackendResult<bool>;

    /// Starts the background context sync job.
    async fn trigger_sync(&self) -> BackendResult<()>;

    /// Sends a new (non-reply) message.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> BackendResult<SentEmail>;
}

//! In-memory backend holding both draft stores.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use replydesk_api::{
    DeleteReceipt, DraftDetail, DraftLink, DraftUpdate, Error as ApiError, GeneratedDraft,
    SendOverride, SendReceipt, SentEmail,
};

use super::{BackendResult, DraftBackend};
use crate::message::{DraftId, Message, MessageId, ReplyTarget};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `POST /ai/generate`.
    Generate(MessageId),
    /// `GET /drafts/{id}`.
    GetDraft(DraftId),
    /// `PUT /drafts/{id}` with the new body.
    UpdateDraft(DraftId, String),
    /// `POST /drafts/{id}/send`.
    SendDraft(DraftId, SendOverride),
    /// `DELETE /drafts/{id}`.
    DeleteDraft(DraftId),
    /// `GET /drafts`.
    ListDrafts,
    /// `GET /drafts/sent-emails`.
    SentMessageIds,
    /// `GET /ai/sync-status`.
    SyncStatus,
    /// `POST /ai/sync`.
    TriggerSync,
    /// `POST /emails/send` to the given recipient.
    SendEmail(String),
}

impl Call {
    const fn kind(&self) -> CallKind {
        match self {
            Self::Generate(_) => CallKind::Generate,
            Self::GetDraft(_) => CallKind::GetDraft,
            Self::UpdateDraft(..) => CallKind::UpdateDraft,
            Self::SendDraft(..) => CallKind::SendDraft,
            Self::DeleteDraft(_) => CallKind::DeleteDraft,
            Self::ListDrafts => CallKind::ListDrafts,
            Self::SentMessageIds => CallKind::SentMessageIds,
            Self::SyncStatus => CallKind::SyncStatus,
            Self::TriggerSync => CallKind::TriggerSync,
            Self::SendEmail(_) => CallKind::SendEmail,
        }
    }
}

/// Operation a [`Fault`] is armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Draft generation.
    Generate,
    /// Draft fetch.
    GetDraft,
    /// Draft update.
    UpdateDraft,
    /// Draft send.
    SendDraft,
    /// Draft delete.
    DeleteDraft,
    /// Record listing.
    ListDrafts,
    /// Sent id listing.
    SentMessageIds,
    /// Sync status check.
    SyncStatus,
    /// Sync trigger.
    TriggerSync,
    /// Plain send.
    SendEmail,
}

/// A failure returned by the next call of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// 503 from the backend.
    Unavailable,
    /// 404 for the addressed resource.
    NotFound,
    /// 401; every later call fails too.
    Unauthorized,
    /// Delete only: the mailbox draft goes, the record delete fails.
    RecordDeleteFails,
}

#[derive(Debug, Clone)]
struct StoredDraft {
    message_id: MessageId,
    to: String,
    subject: String,
    body: String,
}

#[derive(Debug)]
struct State {
    drafts: HashMap<DraftId, StoredDraft>,
    records: HashMap<MessageId, DraftId>,
    sent: HashMap<MessageId, String>,
    reply_targets: HashMap<MessageId, ReplyTarget>,
    next_id: u64,
    sync_after: Option<u32>,
    status_polls: u32,
    triggers: u32,
    calls: Vec<Call>,
    faults: HashMap<CallKind, VecDeque<Fault>>,
    failing_generation: HashSet<MessageId>,
    session_valid: bool,
    outbox: Vec<(String, String, String)>,
}

/// Backend that keeps the mailbox drafts and the draft records in memory.
///
/// Behaves like the HTTP backend: generation writes the record, sending
/// consumes the draft and marks the message sent, deleting reports each
/// store separately. Every call is logged for inspection.
#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<State>,
    latency: Duration,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend whose context is already synced.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                drafts: HashMap::new(),
                records: HashMap::new(),
                sent: HashMap::new(),
                reply_targets: HashMap::new(),
                next_id: 1,
                sync_after: Some(1),
                status_polls: 0,
                triggers: 0,
                calls: Vec::new(),
                faults: HashMap::new(),
                failing_generation: HashSet::new(),
                session_valid: true,
                outbox: Vec::new(),
            }),
            latency: Duration::ZERO,
        }
    }

    /// Delays every call by `latency` (tokio time).
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reports synced from the `polls`-th status check on.
    #[must_use]
    pub fn sync_after(self, polls: u32) -> Self {
        self.state().sync_after = Some(polls);
        self
    }

    /// Never reports synced.
    #[must_use]
    pub fn never_sync(self) -> Self {
        self.state().sync_after = None;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers messages so generated drafts are addressed to their senders.
    pub fn add_messages(&self, messages: &[Message]) {
        let mut state = self.state();
        for message in messages {
            if let Some(target) = ReplyTarget::for_message(message) {
                state.reply_targets.insert(message.id.clone(), target);
            }
        }
    }

    /// Seeds an existing draft and its record.
    pub fn insert_draft(&self, message_id: &MessageId, draft_id: &DraftId, body: &str) {
        let mut state = self.state();
        let target = state.reply_targets.get(message_id).cloned();
        state.drafts.insert(
            draft_id.clone(),
            StoredDraft {
                message_id: message_id.clone(),
                to: target.as_ref().map(|t| t.to.clone()).unwrap_or_default(),
                subject: target.map(|t| t.subject).unwrap_or_default(),
                body: body.to_string(),
            },
        );
        state.records.insert(message_id.clone(), draft_id.clone());
    }

    /// Seeds a message whose reply was already sent.
    pub fn insert_sent(&self, message_id: &MessageId, body: &str) {
        self.state().sent.insert(message_id.clone(), body.to_string());
    }

    /// Deletes a mailbox draft out-of-band, leaving its record behind.
    pub fn remove_remote_draft(&self, draft_id: &DraftId) {
        self.state().drafts.remove(draft_id);
    }

    /// Arms `fault` for the next call of `kind`.
    pub fn fail_next(&self, kind: CallKind, fault: Fault) {
        self.state().faults.entry(kind).or_default().push_back(fault);
    }

    /// Makes every generation for `message_id` fail.
    pub fn fail_generation_for(&self, message_id: &MessageId) {
        self.state().failing_generation.insert(message_id.clone());
    }

    /// Calls received so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Current content of a mailbox draft.
    #[must_use]
    pub fn remote_draft(&self, draft_id: &DraftId) -> Option<DraftDetail> {
        self.state().drafts.get(draft_id).map(|d| detail(draft_id, d))
    }

    /// Number of live mailbox drafts for `message_id`.
    #[must_use]
    pub fn remote_drafts_for(&self, message_id: &MessageId) -> usize {
        self.state()
            .drafts
            .values()
            .filter(|d| &d.message_id == message_id)
            .count()
    }

    /// Draft id recorded for `message_id`.
    #[must_use]
    pub fn record_for(&self, message_id: &MessageId) -> Option<DraftId> {
        self.state().records.get(message_id).cloned()
    }

    /// Body sent as the reply to `message_id`.
    #[must_use]
    pub fn sent_body(&self, message_id: &MessageId) -> Option<String> {
        self.state().sent.get(message_id).cloned()
    }

    /// Number of sync status checks served.
    #[must_use]
    pub fn status_polls(&self) -> u32 {
        self.state().status_polls
    }

    /// Number of sync triggers served.
    #[must_use]
    pub fn trigger_count(&self) -> u32 {
        self.state().triggers
    }

    /// Plain messages sent as `(to, subject, body)`.
    #[must_use]
    pub fn outbox(&self) -> Vec<(String, String, String)> {
        self.state().outbox.clone()
    }

    /// Records the call, waits out the latency, then applies any armed fault.
    async fn begin(&self, call: Call) -> BackendResult<(MutexGuard<'_, State>, Option<Fault>)> {
        let kind = call.kind();
        self.state().calls.push(call);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let mut state = self.state();
        if !state.session_valid {
            return Err(ApiError::Unauthorized);
        }

        let fault = state.faults.get_mut(&kind).and_then(VecDeque::pop_front);
        match fault {
            Some(Fault::Unauthorized) => {
                state.session_valid = false;
                Err(ApiError::Unauthorized)
            }
            Some(Fault::NotFound) => Err(not_found(format!("{kind:?}"))),
            Some(Fault::Unavailable) => Err(unavailable()),
            Some(Fault::RecordDeleteFails) if kind != CallKind::DeleteDraft => Err(unavailable()),
            other => Ok((state, other)),
        }
    }
}

fn detail(draft_id: &DraftId, draft: &StoredDraft) -> DraftDetail {
    DraftDetail {
        draft_id: Some(draft_id.to_string()),
        to: Some(draft.to.clone()),
        subject: Some(draft.subject.clone()),
        body: draft.body.clone(),
    }
}

fn not_found(resource: impl Into<String>) -> ApiError {
    ApiError::NotFound {
        resource: resource.into(),
    }
}

const fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        detail: String::new(),
    }
}

#[async_trait]
impl DraftBackend for MemoryBackend {
    async fn generate_draft(&self, message_id: &MessageId) -> BackendResult<GeneratedDraft> {
        let (mut state, _) = self.begin(Call::Generate(message_id.clone())).await?;
        if state.failing_generation.contains(message_id) {
            return Err(ApiError::Api {
                status: 502,
                detail: "Generation failed".to_string(),
            });
        }

        let n = state.next_id;
        state.next_id += 1;
        let draft_id = DraftId::new(format!("draft-{n}"));
        let body = format!("<p>Thanks for your message. (reply {n})</p>");
        let target = state.reply_targets.get(message_id).cloned();

        state.drafts.insert(
            draft_id.clone(),
            StoredDraft {
                message_id: message_id.clone(),
                to: target.as_ref().map(|t| t.to.clone()).unwrap_or_default(),
                subject: target.map(|t| t.subject).unwrap_or_default(),
                body: body.clone(),
            },
        );
        state.records.insert(message_id.clone(), draft_id.clone());

        Ok(GeneratedDraft {
            draft_id: draft_id.0,
            body,
        })
    }

    async fn get_draft(&self, draft_id: &DraftId) -> BackendResult<DraftDetail> {
        let (state, _) = self.begin(Call::GetDraft(draft_id.clone())).await?;
        state
            .drafts
            .get(draft_id)
            .map(|d| detail(draft_id, d))
            .ok_or_else(|| not_found(format!("draft {draft_id}")))
    }

    async fn update_draft(
        &self,
        draft_id: &DraftId,
        update: &DraftUpdate,
    ) -> BackendResult<DraftDetail> {
        let call = Call::UpdateDraft(draft_id.clone(), update.body.clone());
        let (mut state, _) = self.begin(call).await?;
        let draft = state
            .drafts
            .get_mut(draft_id)
            .ok_or_else(|| not_found(format!("draft {draft_id}")))?;

        draft.to.clone_from(&update.to);
        draft.subject.clone_from(&update.subject);
        draft.body.clone_from(&update.body);
        Ok(detail(draft_id, draft))
    }

    async fn send_draft(
        &self,
        draft_id: &DraftId,
        overrides: &SendOverride,
    ) -> BackendResult<SendReceipt> {
        let call = Call::SendDraft(draft_id.clone(), overrides.clone());
        let (mut state, _) = self.begin(call).await?;
        let mut draft = state
            .drafts
            .remove(draft_id)
            .ok_or_else(|| not_found(format!("draft {draft_id}")))?;

        if let Some(body) = &overrides.body {
            draft.body.clone_from(body);
        }
        if let Some(to) = &overrides.to {
            draft.to.clone_from(to);
        }
        if let Some(subject) = &overrides.subject {
            draft.subject.clone_from(subject);
        }

        state.records.remove(&draft.message_id);
        state.sent.insert(draft.message_id.clone(), draft.body.clone());

        Ok(SendReceipt {
            message_id: Some(format!("sent-{draft_id}")),
            body: Some(draft.body),
        })
    }

    async fn delete_draft(&self, draft_id: &DraftId) -> BackendResult<DeleteReceipt> {
        let (mut state, fault) = self.begin(Call::DeleteDraft(draft_id.clone())).await?;
        let remote_deleted = state.drafts.remove(draft_id).is_some();
        let owner = state
            .records
            .iter()
            .find(|(_, id)| *id == draft_id)
            .map(|(message_id, _)| message_id.clone());

        if !remote_deleted && owner.is_none() {
            return Err(not_found(format!("draft {draft_id}")));
        }

        if fault == Some(Fault::RecordDeleteFails) {
            return Ok(DeleteReceipt {
                remote_deleted,
                record_deleted: false,
                record_error: Some("record store unavailable".to_string()),
            });
        }

        let record_deleted = owner
            .and_then(|message_id| state.records.remove(&message_id))
            .is_some();

        Ok(DeleteReceipt {
            remote_deleted,
            record_deleted,
            record_error: None,
        })
    }

    async fn list_drafts(&self) -> BackendResult<Vec<DraftLink>> {
        let (state, _) = self.begin(Call::ListDrafts).await?;
        let mut links: Vec<DraftLink> = state
            .records
            .iter()
            .map(|(message_id, draft_id)| DraftLink {
                message_id: message_id.to_string(),
                draft_id: draft_id.to_string(),
            })
            .collect();
        links.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        Ok(links)
    }

    async fn sent_message_ids(&self) -> BackendResult<HashSet<String>> {
        let (state, _) = self.begin(Call::SentMessageIds).await?;
        Ok(state.sent.keys().map(ToString::to_string).collect())
    }

    async fn sync_status(&self) -> BackendResult<bool> {
        let (mut state, _) = self.begin(Call::SyncStatus).await?;
        state.status_polls += 1;
        Ok(state.sync_after.is_some_and(|n| state.status_polls >= n))
    }

    async fn trigger_sync(&self) -> BackendResult<()> {
        let (mut state, _) = self.begin(Call::TriggerSync).await?;
        state.triggers += 1;
        Ok(())
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> BackendResult<SentEmail> {
        let (mut state, _) = self.begin(Call::SendEmail(to.to_string())).await?;
        state
            .outbox
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(SentEmail {
            message_id: Some(format!("mail-{}", state.outbox.len())),
            thread_id: None,
        })
    }
}

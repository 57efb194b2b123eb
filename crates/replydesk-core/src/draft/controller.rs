//! Per-message draft state machine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use replydesk_api::{DraftDetail, DraftUpdate, SendOverride};
use tracing::{debug, info, warn};

use super::model::{Draft, DraftSlot, DraftStatus, is_edited};
use super::outcome::{DeleteOutcome, LoadOutcome, SendOutcome, SendStrategy};
use crate::backend::DraftBackend;
use crate::error::{Error, Result};
use crate::message::{DraftId, Message, MessageId, ReplyTarget};
use crate::reconcile::DraftIndex;
use crate::validation::require_body;

#[derive(Debug, Default)]
struct Arena {
    slots: HashMap<MessageId, DraftSlot>,
    /// Draft ids that were superseded, deleted, consumed or found missing.
    retired: HashSet<DraftId>,
    focused: Option<MessageId>,
}

impl Arena {
    fn slot(&mut self, message_id: &MessageId) -> &mut DraftSlot {
        self.slots.entry(message_id.clone()).or_default()
    }

    fn is_focused_elsewhere(&self, message_id: &MessageId) -> bool {
        self.focused.as_ref().is_some_and(|f| f != message_id)
    }

    /// Takes a stored draft id for a message that has none yet.
    fn adopt(&mut self, message_id: &MessageId, draft_id: &DraftId) -> bool {
        if self.retired.contains(draft_id) {
            return false;
        }
        let slot = self.slot(message_id);
        if slot.answered || slot.status != DraftStatus::Absent || slot.draft_id.is_some() {
            return false;
        }
        slot.draft_id = Some(draft_id.clone());
        true
    }

    fn mark_answered(&mut self, message_id: &MessageId) -> bool {
        let slot = self.slot(message_id);
        if slot.answered {
            return false;
        }
        slot.answered = true;
        if !slot.status.is_busy() {
            slot.status = DraftStatus::Sent;
        }
        true
    }
}

fn busy(message_id: &MessageId, status: DraftStatus) -> Error {
    Error::Busy {
        message_id: message_id.to_string(),
        status: status.as_str(),
    }
}

/// Checks that the slot holds a draft that can be edited, sent or deleted.
fn ensure_live(slot: &DraftSlot, message_id: &MessageId, action: &'static str) -> Result<()> {
    match slot.status {
        status if status.has_live_draft() => Ok(()),
        DraftStatus::Sent => Err(Error::AlreadySent(message_id.to_string())),
        status if status.is_busy() => Err(busy(message_id, status)),
        DraftStatus::Absent if slot.draft_id.is_some() => Err(Error::InvalidState {
            message_id: message_id.to_string(),
            action,
            status: "not loaded",
        }),
        _ => Err(Error::NoDraft(message_id.to_string())),
    }
}

fn reply_target(detail: &DraftDetail) -> Option<ReplyTarget> {
    let to = detail.to.as_deref().filter(|to| !to.trim().is_empty())?;
    let subject = detail.subject.as_deref().filter(|s| !s.trim().is_empty())?;
    Some(ReplyTarget {
        to: to.to_string(),
        subject: subject.to_string(),
    })
}

/// Owns the draft state of every message and drives its transitions.
///
/// Operations on one message are serialized by its status: anything that
/// talks to the backend moves the message into a busy status first, and
/// every other operation on that message is refused until it settles.
/// Operations on different messages run independently.
///
/// A draft id is never reused. Once superseded by regeneration, deleted,
/// sent or found missing it is retired, and the controller refuses to
/// reference it again.
pub struct DraftController<B> {
    backend: Arc<B>,
    arena: Mutex<Arena>,
}

impl<B> std::fmt::Debug for DraftController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftController").finish_non_exhaustive()
    }
}

impl<B: DraftBackend> DraftController<B> {
    /// Creates a controller with no known drafts.
    #[must_use]
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            arena: Mutex::new(Arena::default()),
        }
    }

    /// The backend this controller talks to.
    #[must_use]
    pub const fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    fn arena(&self) -> MutexGuard<'_, Arena> {
        self.arena.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of a message's draft, if the controller knows the message.
    #[must_use]
    pub fn draft(&self, message_id: &MessageId) -> Option<Draft> {
        self.arena()
            .slots
            .get(message_id)
            .map(|slot| slot.snapshot(message_id))
    }

    /// Current status of a message's draft.
    #[must_use]
    pub fn status(&self, message_id: &MessageId) -> DraftStatus {
        self.arena()
            .slots
            .get(message_id)
            .map_or(DraftStatus::Absent, |slot| slot.status)
    }

    /// Snapshots of every known draft, ordered by message id.
    #[must_use]
    pub fn drafts(&self) -> Vec<Draft> {
        let arena = self.arena();
        let mut drafts: Vec<Draft> = arena
            .slots
            .iter()
            .map(|(message_id, slot)| slot.snapshot(message_id))
            .collect();
        drafts.sort_by(|a, b| a.message_id.cmp(&b.message_id));
        drafts
    }

    /// Returns true if `draft_id` was retired.
    #[must_use]
    pub fn is_retired(&self, draft_id: &DraftId) -> bool {
        self.arena().retired.contains(draft_id)
    }

    /// Message currently shown to the user.
    #[must_use]
    pub fn focused(&self) -> Option<MessageId> {
        self.arena().focused.clone()
    }

    /// Moves focus to `message_id`.
    ///
    /// In-flight loads for other messages are discarded when they complete.
    pub fn focus(&self, message_id: &MessageId) {
        self.arena().focused = Some(message_id.clone());
    }

    /// Takes reply addressing and draft linkage from listed messages.
    pub fn register_messages(&self, messages: &[Message]) {
        let mut arena = self.arena();
        for message in messages {
            if let Some(target) = ReplyTarget::for_message(message) {
                arena.slot(&message.id).reply_to = Some(target);
            }
            if message.reply_sent {
                arena.mark_answered(&message.id);
            } else if let Some(draft_id) = &message.draft_id {
                arena.adopt(&message.id, draft_id);
            }
        }
    }

    /// Seeds state from the stored draft records.
    ///
    /// Answered messages become `Sent`; messages with a stored draft keep
    /// its id and load it when opened. Messages the controller already
    /// holds a newer draft for are left alone.
    pub fn rehydrate(&self, index: &DraftIndex) {
        let mut arena = self.arena();
        let mut answered = 0_usize;
        for message_id in index.sent() {
            if arena.mark_answered(message_id) {
                answered += 1;
            }
        }
        let mut adopted = 0_usize;
        for (message_id, draft_id) in index.links() {
            if arena.adopt(message_id, draft_id) {
                adopted += 1;
            }
        }
        info!(answered, adopted, "Rehydrated draft state");
    }

    /// Writes the controller's linkage fields back onto `messages`.
    pub fn annotate(&self, messages: &mut [Message]) {
        let arena = self.arena();
        for message in messages {
            let Some(slot) = arena.slots.get(&message.id) else {
                continue;
            };
            message.draft_id.clone_from(&slot.draft_id);
            message.reply_sent = slot.answered;
            if slot.draft_id.is_some() || slot.answered {
                message.ai_reply_generated = true;
            }
        }
    }

    /// Generates a reply draft for `message_id`.
    ///
    /// A prior draft is retired at once and deleted best-effort before the
    /// new one is requested. On failure the message returns to `Absent`
    /// without any draft id.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if another operation on the message is in flight,
    /// `AlreadySent` for an answered message, or the backend error.
    pub async fn generate(&self, message_id: &MessageId) -> Result<Draft> {
        let prior = {
            let mut arena = self.arena();
            let slot = arena.slot(message_id);
            if slot.status == DraftStatus::Sent {
                return Err(Error::AlreadySent(message_id.to_string()));
            }
            if slot.status.is_busy() {
                return Err(busy(message_id, slot.status));
            }

            let prior = slot.draft_id.take();
            slot.body.clear();
            slot.origin.clear();
            slot.last_error = None;
            slot.begin(DraftStatus::Generating);

            if let Some(prior) = &prior {
                arena.retired.insert(prior.clone());
            }
            prior
        };

        info!(%message_id, "Generating reply draft");

        if let Some(prior) = prior {
            match self.backend.delete_draft(&prior).await {
                Ok(_) => debug!(%message_id, draft_id = %prior, "Deleted superseded draft"),
                Err(e) => warn!(
                    %message_id,
                    draft_id = %prior,
                    error = %e,
                    "Could not delete superseded draft"
                ),
            }
        }

        let result = self.backend.generate_draft(message_id).await;

        let orphan = {
            let mut arena = self.arena();
            let generated = match result {
                Ok(generated) => generated,
                Err(e) => {
                    let slot = arena.slot(message_id);
                    slot.clear();
                    slot.status = slot.settled(DraftStatus::Absent);
                    slot.last_error = Some(e.to_string());
                    warn!(%message_id, error = %e, "Draft generation failed");
                    return Err(e.into());
                }
            };

            let draft_id = DraftId::from(generated.draft_id);
            if arena.retired.contains(&draft_id) {
                let slot = arena.slot(message_id);
                slot.clear();
                slot.status = slot.settled(DraftStatus::Absent);
                slot.last_error = Some(format!("draft id {draft_id} was reused"));
                warn!(%message_id, %draft_id, "Backend returned a retired draft id");
                return Err(Error::DraftIdReused(draft_id.0));
            }

            if arena.is_focused_elsewhere(message_id) {
                debug!(%message_id, "Draft generated while another message is focused");
            }

            let slot = arena.slot(message_id);
            if !slot.answered {
                slot.draft_id = Some(draft_id.clone());
                slot.origin.clone_from(&generated.body);
                slot.body = generated.body;
                slot.status = DraftStatus::Ready;
                info!(%message_id, %draft_id, "Reply draft ready");
                return Ok(slot.snapshot(message_id));
            }

            // Answered while generating: the new draft must never be sent.
            slot.status = DraftStatus::Sent;
            arena.retired.insert(draft_id.clone());
            draft_id
        };

        warn!(%message_id, draft_id = %orphan, "Message was answered during generation");
        if let Err(e) = self.backend.delete_draft(&orphan).await {
            warn!(
                %message_id,
                draft_id = %orphan,
                error = %e,
                "Could not delete draft of answered message"
            );
        }
        Err(Error::AlreadySent(message_id.to_string()))
    }

    /// Replaces the draft body locally.
    ///
    /// The draft becomes `Edited` if the body differs from the persisted
    /// one (ignoring surrounding whitespace) and `Ready` otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error unless the draft is `Ready` or `Edited`.
    pub fn edit(&self, message_id: &MessageId, content: impl Into<String>) -> Result<DraftStatus> {
        let mut arena = self.arena();
        let slot = arena
            .slots
            .get_mut(message_id)
            .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;
        ensure_live(slot, message_id, "edit")?;

        slot.body = content.into();
        slot.status = if is_edited(&slot.body, &slot.origin) {
            DraftStatus::Edited
        } else {
            DraftStatus::Ready
        };
        Ok(slot.status)
    }

    /// Drops local edits, restoring the persisted body.
    ///
    /// # Errors
    ///
    /// Returns an error unless the draft is `Ready` or `Edited`.
    pub fn discard_edits(&self, message_id: &MessageId) -> Result<Draft> {
        let mut arena = self.arena();
        let slot = arena
            .slots
            .get_mut(message_id)
            .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;
        ensure_live(slot, message_id, "discard edits of")?;

        slot.body.clone_from(&slot.origin);
        slot.status = DraftStatus::Ready;
        Ok(slot.snapshot(message_id))
    }

    /// Sends the draft as the reply to `message_id`.
    ///
    /// Edited content reaches the mailbox before or with the send: with a
    /// known recipient and subject the draft is updated and then sent,
    /// otherwise the body is passed as a send override.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an empty body (nothing is sent), an
    /// error unless the draft is `Ready` or `Edited`, or the backend error.
    /// A failed send leaves the draft reviewable.
    pub async fn send(&self, message_id: &MessageId) -> Result<SendOutcome> {
        let (draft_id, content, prior_status, target) = {
            let mut arena = self.arena();
            let slot = arena
                .slots
                .get_mut(message_id)
                .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;
            ensure_live(slot, message_id, "send")?;
            let draft_id = slot
                .draft_id
                .clone()
                .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;
            require_body(&slot.body)?;

            let prior_status = slot.status;
            slot.begin(DraftStatus::Sending);
            (draft_id, slot.body.clone(), prior_status, slot.reply_to.clone())
        };

        let edited = prior_status == DraftStatus::Edited;
        info!(%message_id, %draft_id, edited, "Sending reply");

        let mut persisted = false;
        let (strategy, result) = match (edited, target) {
            (false, _) => (
                SendStrategy::Unchanged,
                self.backend
                    .send_draft(&draft_id, &SendOverride::default())
                    .await,
            ),
            (true, Some(target)) => {
                let update = DraftUpdate {
                    to: target.to,
                    subject: target.subject,
                    body: content.clone(),
                };
                let result = match self.backend.update_draft(&draft_id, &update).await {
                    Ok(_) => {
                        persisted = true;
                        self.backend
                            .send_draft(&draft_id, &SendOverride::default())
                            .await
                    }
                    Err(e) => Err(e),
                };
                (SendStrategy::UpdateThenSend, result)
            }
            (true, None) => {
                let overrides = SendOverride {
                    body: Some(content.clone()),
                    ..SendOverride::default()
                };
                (
                    SendStrategy::SendWithOverrides,
                    self.backend.send_draft(&draft_id, &overrides).await,
                )
            }
        };

        let mut arena = self.arena();
        match result {
            Ok(receipt) => {
                arena.retired.insert(draft_id.clone());
                let body = receipt.body.unwrap_or(content);
                let slot = arena.slot(message_id);
                slot.status = DraftStatus::Sent;
                slot.answered = true;
                slot.origin.clone_from(&body);
                slot.body.clone_from(&body);
                info!(%message_id, %draft_id, ?strategy, "Reply sent");
                Ok(SendOutcome {
                    message_id: message_id.clone(),
                    draft_id,
                    body,
                    strategy,
                    sent_message_id: receipt.message_id,
                })
            }
            Err(e) => {
                let slot = arena.slot(message_id);
                if persisted {
                    // The mailbox draft already holds the edited body.
                    slot.origin = content;
                    slot.status = slot.settled(DraftStatus::Ready);
                } else {
                    slot.status = slot.settled(prior_status);
                }
                warn!(
                    %message_id,
                    %draft_id,
                    error = %e,
                    persisted,
                    transient = e.is_transient(),
                    "Send failed"
                );
                Err(e.into())
            }
        }
    }

    /// Deletes the message's draft from the mailbox and the draft records.
    ///
    /// The mailbox is asked first; the record is removed whether or not
    /// the mailbox still had the draft. A draft neither store knows counts
    /// as deleted. The message ends `Absent` and the outcome reports each
    /// store's result.
    ///
    /// # Errors
    ///
    /// Returns `NoDraft` without any network call if there is no draft,
    /// `Busy`/`AlreadySent` if the draft cannot be deleted now, or the
    /// backend error (the draft is then left as it was).
    pub async fn delete_draft(&self, message_id: &MessageId) -> Result<DeleteOutcome> {
        let (draft_id, prior_status) = {
            let mut arena = self.arena();
            let slot = arena
                .slots
                .get_mut(message_id)
                .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;
            match slot.status {
                DraftStatus::Sent => return Err(Error::AlreadySent(message_id.to_string())),
                status if status.is_busy() => return Err(busy(message_id, status)),
                _ => {}
            }
            let draft_id = slot
                .draft_id
                .clone()
                .ok_or_else(|| Error::NoDraft(message_id.to_string()))?;

            let prior_status = slot.status;
            slot.begin(DraftStatus::Deleting);
            (draft_id, prior_status)
        };

        info!(%message_id, %draft_id, "Deleting draft");
        let result = self.backend.delete_draft(&draft_id).await;

        let mut arena = self.arena();
        let outcome = match result {
            Ok(receipt) => DeleteOutcome::from_receipt(draft_id.clone(), &receipt),
            Err(e) if e.is_not_found() => DeleteOutcome::already_gone(draft_id.clone()),
            Err(e) => {
                let slot = arena.slot(message_id);
                slot.status = slot.settled(prior_status);
                warn!(%message_id, %draft_id, error = %e, "Draft delete failed");
                return Err(e.into());
            }
        };

        arena.retired.insert(draft_id.clone());
        let slot = arena.slot(message_id);
        slot.clear();
        slot.status = slot.settled(DraftStatus::Absent);

        if outcome.has_failure() {
            warn!(%message_id, %draft_id, summary = %outcome.summary(), "Draft partially deleted");
        } else {
            info!(%message_id, %draft_id, summary = %outcome.summary(), "Draft deleted");
        }
        Ok(outcome)
    }

    /// Loads a stored draft, typically after a reload.
    ///
    /// Answered messages are never fetched. A draft the mailbox no longer
    /// has resolves to `AlreadySent` when the message is answered and to
    /// `Missing` (message `Absent`) otherwise. If focus moved to another
    /// message meanwhile, the result is discarded and the draft stays
    /// pending for the next open.
    ///
    /// # Errors
    ///
    /// Returns `Busy` if another operation is in flight, or the backend
    /// error for failures other than not-found (the draft stays pending).
    pub async fn load_existing(
        &self,
        message_id: &MessageId,
        draft_id: &DraftId,
    ) -> Result<LoadOutcome> {
        let epoch = {
            let mut arena = self.arena();
            let slot = arena.slot(message_id);
            if slot.answered || slot.status == DraftStatus::Sent {
                slot.answered = true;
                slot.status = DraftStatus::Sent;
                return Ok(LoadOutcome::AlreadySent);
            }
            if arena.retired.contains(draft_id) {
                debug!(%message_id, %draft_id, "Skipping retired draft");
                return Ok(LoadOutcome::Superseded);
            }

            let slot = arena.slot(message_id);
            if slot.status.is_busy() {
                return Err(busy(message_id, slot.status));
            }

            let displaced = match &slot.draft_id {
                Some(current) if current == draft_id && slot.status.has_live_draft() => {
                    return Ok(LoadOutcome::Loaded(slot.snapshot(message_id)));
                }
                Some(current) if current != draft_id && slot.status.has_live_draft() => {
                    debug!(%message_id, %draft_id, live = %current, "Stored draft was replaced");
                    None
                }
                Some(current) if current != draft_id => Some(current.clone()),
                _ => None,
            };
            if slot.status.has_live_draft() {
                arena.retired.insert(draft_id.clone());
                return Ok(LoadOutcome::Superseded);
            }

            slot.draft_id = Some(draft_id.clone());
            let epoch = slot.begin(DraftStatus::Loading);
            if let Some(displaced) = displaced {
                arena.retired.insert(displaced);
            }
            epoch
        };

        debug!(%message_id, %draft_id, "Loading stored draft");
        let result = self.backend.get_draft(draft_id).await;

        let mut arena = self.arena();
        let focused_elsewhere = arena.is_focused_elsewhere(message_id);
        let slot = arena.slot(message_id);
        if slot.epoch != epoch {
            return Ok(LoadOutcome::Discarded);
        }
        if focused_elsewhere {
            slot.status = slot.settled(DraftStatus::Absent);
            debug!(%message_id, %draft_id, "Discarding load for unfocused message");
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(_) if slot.answered => {
                slot.status = DraftStatus::Sent;
                debug!(%message_id, %draft_id, "Message was answered while loading");
                Ok(LoadOutcome::AlreadySent)
            }
            Ok(detail) => {
                if let Some(target) = reply_target(&detail) {
                    slot.reply_to = Some(target);
                }
                slot.origin.clone_from(&detail.body);
                slot.body = detail.body;
                slot.status = DraftStatus::Ready;
                slot.last_error = None;
                Ok(LoadOutcome::Loaded(slot.snapshot(message_id)))
            }
            Err(e) if e.is_not_found() && slot.answered => {
                slot.status = DraftStatus::Sent;
                debug!(%message_id, %draft_id, "Draft was consumed by sending");
                Ok(LoadOutcome::AlreadySent)
            }
            Err(e) if e.is_not_found() => {
                slot.clear();
                arena.retired.insert(draft_id.clone());
                info!(%message_id, %draft_id, "Stored draft no longer exists");
                Ok(LoadOutcome::Missing)
            }
            Err(e) => {
                slot.status = slot.settled(DraftStatus::Absent);
                warn!(%message_id, %draft_id, error = %e, "Could not load draft");
                Err(e.into())
            }
        }
    }

    /// Focuses `message_id` and loads its stored draft if not yet loaded.
    ///
    /// # Errors
    ///
    /// Returns the error of the underlying load.
    pub async fn open(&self, message_id: &MessageId) -> Result<LoadOutcome> {
        let pending = {
            let mut arena = self.arena();
            arena.focused = Some(message_id.clone());
            let slot = arena.slot(message_id);
            match slot.status {
                DraftStatus::Sent => return Ok(LoadOutcome::AlreadySent),
                status if status.has_live_draft() || status.is_busy() => {
                    return Ok(LoadOutcome::Loaded(slot.snapshot(message_id)));
                }
                _ => slot.draft_id.clone(),
            }
        };

        match pending {
            Some(draft_id) => self.load_existing(message_id, &draft_id).await,
            None => Ok(LoadOutcome::NoDraft),
        }
    }
}

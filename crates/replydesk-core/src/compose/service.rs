//! Compose flow: restore, autosave, send.

use std::sync::Arc;

use replydesk_api::SentEmail;
use tracing::{debug, info, warn};

use super::model::{OutgoingMessage, SavedCompose};
use super::repository::ComposeDraftRepository;
use crate::backend::DraftBackend;
use crate::error::Result;

/// Compose screen logic for one account.
#[derive(Debug)]
pub struct Composer<B> {
    backend: Arc<B>,
    drafts: ComposeDraftRepository,
    account: String,
}

impl<B: DraftBackend> Composer<B> {
    /// Creates a composer storing its form under `account`.
    #[must_use]
    pub fn new(backend: Arc<B>, drafts: ComposeDraftRepository, account: impl Into<String>) -> Self {
        Self {
            backend,
            drafts,
            account: account.into(),
        }
    }

    /// The form left unsent last time, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn restore(&self) -> Result<Option<SavedCompose>> {
        self.drafts.load(&self.account).await
    }

    /// Saves the form. A blank form removes the saved one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn autosave(&self, message: &OutgoingMessage) -> Result<()> {
        if message.is_blank() {
            return self.drafts.clear(&self.account).await;
        }
        debug!(account = %self.account, "Autosaving compose form");
        self.drafts.save(&self.account, message).await
    }

    /// Validates and sends the message, then drops the saved form.
    ///
    /// # Errors
    ///
    /// Returns a validation error (nothing is sent) or the backend error
    /// (the saved form is kept).
    pub async fn send(&self, message: &OutgoingMessage) -> Result<SentEmail> {
        message.validate()?;

        let sent = self
            .backend
            .send_email(&message.to, &message.subject, &message.body)
            .await?;
        info!(to = %message.to, "Message sent");

        if let Err(e) = self.drafts.clear(&self.account).await {
            warn!(error = %e, "Could not clear saved compose form");
        }
        Ok(sent)
    }
}

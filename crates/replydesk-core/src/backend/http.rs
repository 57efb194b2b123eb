//! `DraftBackend` over the HTTP client.

use std::collections::HashSet;

use async_trait::async_trait;
use replydesk_api::{
    ApiClient, DeleteReceipt, DraftDetail, DraftLink, DraftUpdate, GeneratedDraft, SendOverride,
    SendReceipt, SentEmail,
};

use super::{BackendResult, DraftBackend};
use crate::message::{DraftId, MessageId};

#[async_trait]
impl DraftBackend for ApiClient {
    async fn generate_draft(&self, message_id: &MessageId) -> BackendResult<GeneratedDraft> {
        Self::generate_draft(self, message_id.as_str()).await
    }

    async fn get_draft(&self, draft_id: &DraftId) -> BackendResult<DraftDetail> {
        Self::get_draft(self, draft_id.as_str()).await
    }

    async fn update_draft(
        &self,
        draft_id: &DraftId,
        update: &DraftUpdate,
    ) -> BackendResult<DraftDetail> {
        Self::update_draft(self, draft_id.as_str(), update).await
    }

    async fn send_draft(
        &self,
        draft_id: &DraftId,
        overrides: &SendOverride,
    ) -> BackendResult<SendReceipt> {
        Self::send_draft(self, draft_id.as_str(), overrides).await
    }

    async fn delete_draft(&self, draft_id: &DraftId) -> BackendResult<DeleteReceipt> {
        Self::delete_draft(self, draft_id.as_str()).await
    }

    async fn list_drafts(&self) -> BackendResult<Vec<DraftLink>> {
        Self::list_drafts(self).await
    }

    async fn sent_message_ids(&self) -> BackendResult<HashSet<String>> {
        Self::sent_message_ids(self).await
    }

    async fn sync_status(&self) -> BackendResult<bool> {
        Ok(Self::sync_status(self).await?.synced)
    }

    async fn trigger_sync(&self) -> BackendResult<()> {
        let response = Self::trigger_sync(self).await?;
        if !response.accepted {
            tracing::warn!(status = ?response.status, "Context sync trigger was not accepted");
        }
        Ok(())
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> BackendResult<SentEmail> {
        Self::send_email(self, to, subject, body).await
    }
}

//! AI reply generation and context sync endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Envelope};
use crate::error::{Error, Result};

/// A reply draft freshly created by the AI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneratedDraft {
    /// Provider-issued identifier of the new draft.
    #[serde(alias = "draftId")]
    pub draft_id: String,
    /// Initial reply body (marked-up text).
    #[serde(default, alias = "reply", alias = "content")]
    pub body: String,
}

/// Context sync status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncStatusResponse {
    /// Whether the sent-mail corpus has been ingested.
    #[serde(alias = "is_synced")]
    pub synced: bool,
}

/// Acknowledgement of a context sync trigger.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncTriggerResponse {
    /// Whether the job was accepted (or already running).
    #[serde(default = "accepted_default")]
    pub accepted: bool,
    /// Backend-provided job status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

const fn accepted_default() -> bool {
    true
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    message_id: &'a str,
}

impl ApiClient {
    /// Asks the AI collaborator to create a reply draft for a message.
    ///
    /// The backend creates the draft in the mailbox and records the
    /// message-to-draft mapping before responding.
    ///
    /// # Errors
    ///
    /// Returns an error if generation fails or the response has no draft id.
    pub async fn generate_draft(&self, message_id: &str) -> Result<GeneratedDraft> {
        let request = self
            .request(Method::POST, "ai/generate")?
            .json(&GenerateRequest { message_id });

        let resource = format!("message {message_id}");
        let draft: Envelope<GeneratedDraft> = self.send_json(request, &resource).await?;
        let draft = draft.into_inner();
        if draft.draft_id.trim().is_empty() {
            return Err(Error::InvalidResponse(format!(
                "generate for {message_id} returned an empty draft id"
            )));
        }
        Ok(draft)
    }

    /// Checks whether the background context sync has completed.
    ///
    /// # Errors
    ///
    /// Returns an error if the status call fails.
    pub async fn sync_status(&self) -> Result<SyncStatusResponse> {
        let request = self.request(Method::GET, "ai/sync-status")?;
        self.send_json(request, "sync status").await
    }

    /// Starts the background context sync job.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger call fails.
    pub async fn trigger_sync(&self) -> Result<SyncTriggerResponse> {
        let request = self.request(Method::POST, "ai/sync")?;
        self.send_json(request, "sync job").await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_draft_aliases() {
        let draft: Envelope<GeneratedDraft> =
            serde_json::from_str(r#"{"data": {"draftId": "r-1", "reply": "<p>Hi</p>"}}"#)
                .unwrap();
        let draft = draft.into_inner();
        assert_eq!(draft.draft_id, "r-1");
        assert_eq!(draft.body, "<p>Hi</p>");
    }

    #[test]
    fn test_sync_status_aliases() {
        let status: SyncStatusResponse = serde_json::from_str(r#"{"is_synced": true}"#).unwrap();
        assert!(status.synced);
        let status: SyncStatusResponse = serde_json::from_str(r#"{"synced": false}"#).unwrap();
        assert!(!status.synced);
    }

    #[test]
    fn test_trigger_defaults_to_accepted() {
        let ack: SyncTriggerResponse =
            serde_json::from_str(r#"{"status": "started"}"#).unwrap();
        assert!(ack.accepted);
        assert_eq!(ack.status.as_deref(), Some("started"));
    }
}

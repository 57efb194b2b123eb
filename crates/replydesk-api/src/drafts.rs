//! Draft endpoints: the mailbox's native drafts plus the backend's
//! message-to-draft records.

use std::collections::HashSet;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, Envelope};
use crate::error::Result;

/// Current content of a draft in the mailbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DraftDetail {
    /// Draft identifier, when echoed by the backend.
    #[serde(default, alias = "draftId", skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<String>,
    /// Reply recipient.
    #[serde(default, alias = "recipient", skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Reply subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Draft body (marked-up text).
    #[serde(default)]
    pub body: String,
}

/// Full replacement content for a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftUpdate {
    /// Reply recipient.
    pub to: String,
    /// Reply subject.
    pub subject: String,
    /// New body.
    pub body: String,
}

/// Optional overrides applied atomically with a send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendOverride {
    /// Replacement recipient.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Replacement subject.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Replacement body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl SendOverride {
    /// Returns true if nothing is overridden.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.to.is_none() && self.subject.is_none() && self.body.is_none()
    }
}

/// Confirmation of a sent draft.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SendReceipt {
    /// Identifier of the sent message, if reported.
    #[serde(default, alias = "messageId", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Body as it was finally sent, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Result of deleting a draft from both stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeleteReceipt {
    /// The mailbox draft was deleted (false: it was already gone).
    #[serde(default, alias = "gmail_deleted")]
    pub remote_deleted: bool,
    /// The backend record was deleted (false: no record existed).
    #[serde(default, alias = "supabase_deleted")]
    pub record_deleted: bool,
    /// Set when deleting the backend record failed.
    #[serde(default, alias = "supabase_error", skip_serializing_if = "Option::is_none")]
    pub record_error: Option<String>,
}

/// One stored message-to-draft mapping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct DraftLink {
    /// Source message identifier.
    #[serde(alias = "email_id", alias = "messageId")]
    pub message_id: String,
    /// Draft identifier.
    #[serde(alias = "draftId")]
    pub draft_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DraftList {
    Keyed { drafts: Vec<DraftLink> },
    Bare(Vec<DraftLink>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SentIds {
    Keyed {
        #[serde(alias = "email_ids", alias = "sent_email_ids")]
        message_ids: Vec<String>,
    },
    Bare(Vec<String>),
}

impl ApiClient {
    /// Fetches a draft's current content.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the draft no longer exists.
    pub async fn get_draft(&self, draft_id: &str) -> Result<DraftDetail> {
        let request = self.request_segments(Method::GET, &["drafts", draft_id])?;
        let detail: Envelope<DraftDetail> =
            self.send_json(request, &format!("draft {draft_id}")).await?;
        Ok(detail.into_inner())
    }

    /// Replaces a draft's recipient, subject and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft does not exist or the update fails.
    pub async fn update_draft(&self, draft_id: &str, update: &DraftUpdate) -> Result<DraftDetail> {
        let request = self
            .request_segments(Method::PUT, &["drafts", draft_id])?
            .json(update);
        let detail: Envelope<DraftDetail> =
            self.send_json(request, &format!("draft {draft_id}")).await?;
        Ok(detail.into_inner())
    }

    /// Sends a draft, optionally overriding its content in the same call.
    ///
    /// # Errors
    ///
    /// Returns an error if the draft does not exist or sending fails.
    pub async fn send_draft(&self, draft_id: &str, overrides: &SendOverride) -> Result<SendReceipt> {
        let mut request = self.request_segments(Method::POST, &["drafts", draft_id, "send"])?;
        if !overrides.is_empty() {
            request = request.json(overrides);
        }
        let receipt: Envelope<SendReceipt> =
            self.send_json(request, &format!("draft {draft_id}")).await?;
        tracing::info!(draft_id, "Draft sent");
        Ok(receipt.into_inner())
    }

    /// Deletes a draft from the mailbox and the backend record.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if neither store knows the draft.
    pub async fn delete_draft(&self, draft_id: &str) -> Result<DeleteReceipt> {
        let request = self.request_segments(Method::DELETE, &["drafts", draft_id])?;
        self.send_json(request, &format!("draft {draft_id}")).await
    }

    /// Lists every stored message-to-draft mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn list_drafts(&self) -> Result<Vec<DraftLink>> {
        let request = self.request(Method::GET, "drafts")?;
        let list: Envelope<DraftList> = self.send_json(request, "drafts").await?;
        Ok(match list.into_inner() {
            DraftList::Keyed { drafts } | DraftList::Bare(drafts) => drafts,
        })
    }

    /// Lists the ids of messages that already have a sent reply.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn sent_message_ids(&self) -> Result<HashSet<String>> {
        let request = self.request(Method::GET, "drafts/sent-emails")?;
        let ids: Envelope<SentIds> = self.send_json(request, "sent emails").await?;
        Ok(match ids.into_inner() {
            SentIds::Keyed { message_ids } | SentIds::Bare(message_ids) => {
                message_ids.into_iter().collect()
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_detail_wrapped() {
        let detail: Envelope<DraftDetail> = serde_json::from_str(
            r#"{"success": true, "data": {"to": "a@b.co", "subject": "Re: Hi", "body": "<p>x</p>"}}"#,
        )
        .unwrap();
        let detail = detail.into_inner();
        assert_eq!(detail.to.as_deref(), Some("a@b.co"));
        assert_eq!(detail.body, "<p>x</p>");
    }

    #[test]
    fn test_delete_receipt_legacy_field_names() {
        let receipt: DeleteReceipt =
            serde_json::from_str(r#"{"gmail_deleted": true, "supabase_deleted": false}"#)
                .unwrap();
        assert!(receipt.remote_deleted);
        assert!(!receipt.record_deleted);
        assert!(receipt.record_error.is_none());
    }

    #[test]
    fn test_draft_list_shapes() {
        let keyed: Envelope<DraftList> = serde_json::from_str(
            r#"{"drafts": [{"email_id": "m1", "draft_id": "d1"}]}"#,
        )
        .unwrap();
        let DraftList::Keyed { drafts } = keyed.into_inner() else {
            panic!("expected keyed list");
        };
        assert_eq!(drafts[0].message_id, "m1");

        let bare: Envelope<DraftList> =
            serde_json::from_str(r#"[{"message_id": "m2", "draftId": "d2"}]"#).unwrap();
        assert!(matches!(bare.into_inner(), DraftList::Bare(v) if v[0].draft_id == "d2"));
    }

    #[test]
    fn test_sent_ids_shapes() {
        let keyed: SentIds = serde_json::from_str(r#"{"email_ids": ["m1", "m2"]}"#).unwrap();
        assert!(matches!(keyed, SentIds::Keyed { message_ids } if message_ids.len() == 2));

        let bare: SentIds = serde_json::from_str(r#"["m3"]"#).unwrap();
        assert!(matches!(bare, SentIds::Bare(ids) if ids == vec!["m3".to_string()]));
    }

    #[test]
    fn test_send_override_serialization() {
        assert!(SendOverride::default().is_empty());
        let overrides = SendOverride {
            body: Some("final".into()),
            ..SendOverride::default()
        };
        assert_eq!(
            serde_json::to_string(&overrides).unwrap(),
            r#"{"body":"final"}"#
        );
    }
}

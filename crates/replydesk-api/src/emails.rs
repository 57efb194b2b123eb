//! Plain outgoing mail (compose screen).

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::Result;

/// Confirmation of a sent message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SentEmail {
    /// Provider identifier of the sent message.
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Thread the message was filed under.
    #[serde(default, alias = "threadId", skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl ApiClient {
    /// Sends a new message.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses or cannot deliver the message.
    pub async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<SentEmail> {
        let request = self
            .request(Method::POST, "emails/send")?
            .query(&[("to", to), ("subject", subject), ("body", body)]);

        let sent: SentEmail = self.send_json(request, "outgoing email").await?;
        tracing::info!(to, "Email sent");
        Ok(sent)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sent_email_aliases() {
        let sent: SentEmail =
            serde_json::from_str(r#"{"id": "18c1", "threadId": "t9", "labelIds": ["SENT"]}"#)
                .unwrap();
        assert_eq!(sent.message_id.as_deref(), Some("18c1"));
        assert_eq!(sent.thread_id.as_deref(), Some("t9"));
    }
}

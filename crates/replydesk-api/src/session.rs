//! Session credential and user profile types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Authenticated user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user identifier.
    pub id: String,
    /// Account email address.
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Bearer credential for one backend session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Access token sent as `Authorization: Bearer <token>`.
    pub access_token: String,
    /// Token type (usually "bearer").
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiration time, if the backend reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// The signed-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl Session {
    /// Creates a session from a bare access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: default_token_type(),
            expires_at: None,
            user: None,
        }
    }

    /// Creates a session from a login response.
    #[must_use]
    pub fn from_response(response: LoginResponse) -> Self {
        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));

        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_at,
            user: response.user,
        }
    }

    /// Sets the expiration time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Checks if the token is expired (with 60 second buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|exp| Utc::now() + Duration::seconds(60) >= exp)
    }
}

/// Response of the code-exchange login endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginResponse {
    /// Backend-issued access token.
    pub access_token: String,
    /// Token type.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expires in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u32>,
    /// The signed-in user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_login_response() {
        let json = r#"{
            "access_token": "jwt-abc",
            "token_type": "bearer",
            "expires_in": 3600,
            "user": {"id": "u1", "email": "me@example.com", "name": "Me"}
        }"#;

        let response: LoginResponse = serde_json::from_str(json).unwrap();
        let session = Session::from_response(response);
        assert_eq!(session.access_token, "jwt-abc");
        assert!(!session.is_expired());
        assert_eq!(session.user.unwrap().email, "me@example.com");
    }

    #[test]
    fn test_login_response_defaults() {
        let response: LoginResponse =
            serde_json::from_str(r#"{"access_token": "jwt"}"#).unwrap();
        assert_eq!(response.token_type, "bearer");
        assert!(response.user.is_none());
        assert!(Session::from_response(response).expires_at.is_none());
    }

    #[test]
    fn test_session_expiration() {
        let expired = Session::new("t").with_expires_at(Utc::now() - Duration::seconds(120));
        assert!(expired.is_expired());

        let valid = Session::new("t").with_expires_at(Utc::now() + Duration::seconds(3600));
        assert!(!valid.is_expired());
    }
}

//! Login and profile endpoints.

use reqwest::Method;
use serde::Serialize;

use crate::client::{ApiClient, Envelope};
use crate::error::Result;
use crate::session::{LoginResponse, Session, UserProfile};

#[derive(Debug, Serialize)]
struct CodeExchange<'a> {
    code: &'a str,
}

impl ApiClient {
    /// Exchanges a provider authorization code for a backend session.
    ///
    /// The returned session must be attached with [`ApiClient::with_session`]
    /// before calling authenticated endpoints.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the code or is unreachable.
    pub async fn login(&self, code: &str) -> Result<Session> {
        let request = self
            .public_request(Method::POST, "auth/google-login")?
            .json(&CodeExchange { code });

        let response: LoginResponse = self.send_json(request, "login").await?;
        tracing::info!(
            user = response.user.as_ref().map_or("", |u| u.email.as_str()),
            "Logged in"
        );
        Ok(Session::from_response(response))
    }

    /// Fetches the profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is invalid or the call fails.
    pub async fn profile(&self) -> Result<UserProfile> {
        let request = self.request(Method::GET, "auth/me")?;
        let profile: Envelope<UserProfile> = self.send_json(request, "profile").await?;
        Ok(profile.into_inner())
    }
}

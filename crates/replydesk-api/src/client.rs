//! HTTP client shared by all endpoint groups.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};
use crate::session::Session;

/// Default backend address used by local development setups.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client for the ReplyDesk backend.
///
/// Cloning is cheap; clones share the underlying connection pool and the
/// session validity flag, so a 401 observed through any clone stops every
/// clone from issuing further calls.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: reqwest::Client,
    bearer: Option<String>,
    session_valid: Arc<AtomicBool>,
}

impl ApiClient {
    /// Creates a new unauthenticated client.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        Self::with_http_client(base_url, reqwest::Client::new())
    }

    /// Creates a client with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn with_timeout(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Self::with_http_client(base_url, http_client)
    }

    /// Creates a client around an existing `reqwest` client.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid absolute URL.
    pub fn with_http_client(
        base_url: impl AsRef<str>,
        http_client: reqwest::Client,
    ) -> Result<Self> {
        let mut base_url = Url::parse(base_url.as_ref())?;
        // Joining relative paths replaces the last segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            http_client,
            bearer: None,
            session_valid: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Attaches a session credential, starting a fresh validity scope.
    #[must_use]
    pub fn with_session(mut self, session: &Session) -> Self {
        self.bearer = Some(session.access_token.clone());
        self.session_valid = Arc::new(AtomicBool::new(true));
        self
    }

    /// Returns the backend base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns true if a credential is attached and no 401 has been observed.
    #[must_use]
    pub fn is_session_valid(&self) -> bool {
        self.bearer.is_some() && self.session_valid.load(Ordering::Acquire)
    }

    /// Marks the session as unusable; every later call fails fast.
    pub fn invalidate_session(&self) {
        if self.session_valid.swap(false, Ordering::AcqRel) {
            tracing::warn!("Backend session invalidated");
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Builds an endpoint from path segments, percent-encoding each one.
    pub(crate) fn endpoint_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::InvalidResponse(format!("base URL {} cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Starts a request that does not need a credential.
    pub(crate) fn public_request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        Ok(self.http_client.request(method, self.endpoint(path)?))
    }

    /// Starts an authenticated request.
    pub(crate) fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        self.authorized(method, self.endpoint(path)?)
    }

    /// Starts an authenticated request addressed by path segments.
    pub(crate) fn request_segments(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder> {
        self.authorized(method, self.endpoint_segments(segments)?)
    }

    fn authorized(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        let bearer = self.bearer.as_deref().ok_or(Error::NotAuthenticated)?;
        if !self.session_valid.load(Ordering::Acquire) {
            return Err(Error::Unauthorized);
        }

        Ok(self.http_client.request(method, url).bearer_auth(bearer))
    }

    /// Sends a request and decodes a JSON success body.
    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T> {
        let response = self.send(request, resource).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(Into::into)
    }

    /// Sends a request and maps non-success statuses to errors.
    pub(crate) async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error = Error::from_status(status, &body, resource);
        if matches!(error, Error::Unauthorized) {
            self.invalidate_session();
        }
        tracing::debug!(%status, resource, "Backend call failed");
        Err(error)
    }
}

/// Response wrapper; some endpoints nest their payload under `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    /// `{"data": ...}`
    Wrapped {
        /// Payload.
        data: T,
    },
    /// Bare payload.
    Bare(T),
}

impl<T> Envelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

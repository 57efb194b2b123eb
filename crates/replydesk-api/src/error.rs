//! Error types for backend API operations.

use reqwest::StatusCode;
use serde::Deserialize;

/// Result type alias for backend API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Backend API error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// No bearer credential has been attached to the client.
    #[error("No authentication token found")]
    NotAuthenticated,

    /// The backend rejected the bearer credential.
    ///
    /// Once this has been observed, the client refuses every further call
    /// for the same session.
    #[error("Authentication expired. Please login again.")]
    Unauthorized,

    /// The addressed resource does not exist.
    #[error("Not found: {resource}")]
    NotFound {
        /// What was being looked up (e.g. `draft r-123`).
        resource: String,
    },

    /// Any other non-success response.
    #[error("Backend error ({status}): {detail}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The backend's `detail` message, or the raw body.
        detail: String,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Returns true if the addressed resource was reported missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the session can no longer be used.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::NotAuthenticated)
    }

    /// Returns true for failures that may succeed when repeated unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Builds an error from a non-success status and its raw body.
    pub(crate) fn from_status(status: StatusCode, body: &str, resource: impl Into<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound {
                resource: resource.into(),
            },
            _ => Self::Api {
                status: status.as_u16(),
                detail: ErrorResponse::detail_from_body(body),
            },
        }
    }
}

/// Error body returned by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// Error detail; a string for most errors, structured for validation errors.
    #[serde(default)]
    pub detail: serde_json::Value,
}

impl ErrorResponse {
    /// Extracts a readable detail message, falling back to the raw body.
    #[must_use]
    pub fn detail_from_body(body: &str) -> String {
        match serde_json::from_str::<Self>(body) {
            Ok(Self {
                detail: serde_json::Value::String(detail),
            }) => detail,
            Ok(Self {
                detail: serde_json::Value::Null,
            })
            | Err(_) => body.trim().to_string(),
            Ok(Self { detail }) => detail.to_string(),
        }
    }
}

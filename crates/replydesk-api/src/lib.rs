//! # replydesk-api
//!
//! Async client for the ReplyDesk backend: AI reply generation, the
//! mailbox's native drafts, the backend's message-to-draft records and
//! the background context sync job.
//!
//! ## Features
//!
//! - **Session handling**: code-exchange login, bearer credentials, and
//!   fail-fast after the first 401 of a session
//! - **Drafts**: get, update, send (with optional overrides), delete, list
//! - **AI**: reply generation, context sync status and trigger
//! - **Compose**: plain outgoing mail
//!
//! ## Quick Start
//!
//! ```ignore
//! use replydesk_api::{ApiClient, SendOverride};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new("http://localhost:8000")?;
//!     let session = client.login("authorization_code_from_redirect").await?;
//!     let client = client.with_session(&session);
//!
//!     let draft = client.generate_draft("18c1f0a2b").await?;
//!     client.send_draft(&draft.draft_id, &SendOverride::default()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod ai;
mod auth;
mod client;
mod drafts;
mod emails;
mod error;
pub mod session;

pub use ai::{GeneratedDraft, SyncStatusResponse, SyncTriggerResponse};
pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use drafts::{DeleteReceipt, DraftDetail, DraftLink, DraftUpdate, SendOverride, SendReceipt};
pub use emails::SentEmail;
pub use error::{Error, ErrorResponse, Result};
pub use session::{Session, UserProfile};

//! # replydesk-core
//!
//! Reply draft lifecycle for ReplyDesk.
//!
//! An AI-generated reply lives in two stores at once: the mailbox's native
//! drafts and the backend's message-to-draft records. This crate keeps a
//! single client-side view of both and drives every change through them
//! in a fixed order.
//!
//! - **Drafts** - [`DraftController`]: generate, edit, send, delete and
//!   reload a reply draft per message, with per-message serialization and
//!   stale-completion discard
//! - **Batch** - [`BatchCoordinator`]: generate over a selection of up to
//!   [`MAX_SELECTION`] messages with per-item results
//! - **Context sync** - [`ContextSync`]: check, trigger and poll the
//!   backend's ingestion job without blocking indefinitely
//! - **Reconciliation** - [`DraftIndex`]: rebuild draft linkage after a reload
//! - **Compose** - validated new mail with a locally autosaved form
//!
//! Backend access goes through the [`DraftBackend`] trait, implemented for
//! `replydesk_api::ApiClient`. The `test-util` feature adds an in-memory
//! `MemoryBackend` for tests.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod batch;
pub mod compose;
mod config;
pub mod context_sync;
pub mod draft;
mod error;
pub mod message;
mod reconcile;
pub mod validation;

pub use backend::DraftBackend;
#[cfg(any(test, feature = "test-util"))]
pub use backend::MemoryBackend;
pub use batch::{BatchCoordinator, BatchItem, BatchReport, MAX_SELECTION, Selection};
pub use compose::{ComposeDraftRepository, Composer, OutgoingMessage, SavedCompose};
pub use config::{API_URL_ENV, Config};
pub use context_sync::{ContextSync, SyncOutcome, SyncPhase, SyncPolicy, SyncStatus};
pub use draft::{
    DeleteOutcome, Draft, DraftController, DraftStatus, LoadOutcome, SendOutcome, SendStrategy,
    StoreRemoval,
};
pub use error::{Error, Result};
pub use message::{DraftId, Mailbox, Message, MessageId, ReplyTarget, parse_mailbox};
pub use reconcile::DraftIndex;
pub use validation::ValidationError;

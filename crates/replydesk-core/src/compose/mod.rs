//! Composing new (non-reply) mail, with a locally autosaved form.

mod model;
mod repository;
mod service;

pub use model::{OutgoingMessage, SavedCompose};
pub use repository::ComposeDraftRepository;
pub use service::Composer;

//! Reply draft lifecycle.
//!
//! The [`DraftController`] owns one state slot per message and is the only
//! place that talks to the mailbox draft store and the draft records.

mod controller;
mod model;
mod outcome;

pub use controller::DraftController;
pub use model::{Draft, DraftStatus, is_edited};
pub use outcome::{DeleteOutcome, LoadOutcome, SendOutcome, SendStrategy, StoreRemoval};

//! Context sync: make sure the AI has ingested the mailbox before drafting.
//!
//! The sync job runs on the backend and is only observable by polling its
//! status. [`Poller`] is the bounded polling state machine; [`ContextSync`]
//! drives it against a backend with tokio timers.

mod poller;
mod sync;

pub use poller::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, Poll, Poller, SyncPolicy, SyncStatus,
};
pub use sync::{ContextSync, SyncOutcome, SyncPhase};

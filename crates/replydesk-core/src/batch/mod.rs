//! Batch draft generation over a bounded selection.

mod coordinator;
mod selection;

pub use coordinator::{BatchCoordinator, BatchItem, BatchReport};
pub use selection::{MAX_SELECTION, Selection};

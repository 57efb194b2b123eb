//! Inbound messages and reply addressing.

mod address;
mod model;

pub use address::{Mailbox, ReplyTarget, parse_mailbox, reply_subject};
pub use model::{DraftId, Message, MessageId};

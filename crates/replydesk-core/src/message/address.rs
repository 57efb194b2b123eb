//! Header parsing and reply addressing.

use super::model::Message;

/// A display name plus address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (falls back to the address's local part).
    pub name: String,
    /// Email address.
    pub address: String,
}

/// Parses the first mailbox of an address header.
///
/// Accepts `Name <addr>` and bare `addr`. Only the first of several
/// comma-separated recipients is used. Returns `None` for a blank header.
#[must_use]
pub fn parse_mailbox(header: &str) -> Option<Mailbox> {
    let first = header.split(',').next()?.trim();
    if first.is_empty() {
        return None;
    }

    let (name, address) = match (first.find('<'), first.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            let address = first[open + 1..close].trim();
            let name = first[..open]
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .trim();
            (name, address)
        }
        _ => ("", first),
    };

    let name = if name.is_empty() {
        address.split('@').next().unwrap_or(address)
    } else {
        name
    };

    Some(Mailbox {
        name: name.to_string(),
        address: address.to_string(),
    })
}

/// Subject for a reply: `Re: <subject>` unless already prefixed.
#[must_use]
pub fn reply_subject(subject: &str) -> String {
    if subject.starts_with("Re: ") {
        subject.to_string()
    } else {
        format!("Re: {subject}")
    }
}

/// Recipient and subject a reply draft is written with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    /// Reply recipient.
    pub to: String,
    /// Reply subject.
    pub subject: String,
}

impl ReplyTarget {
    /// Addresses a reply to the sender of `message`.
    #[must_use]
    pub fn for_message(message: &Message) -> Option<Self> {
        if message.sender_email.trim().is_empty() {
            return None;
        }
        Some(Self {
            to: message.sender_email.clone(),
            subject: reply_subject(&message.subject),
        })
    }
}

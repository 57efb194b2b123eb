//! Command-line argument parsing.

use anyhow::{Result, bail};

/// Environment variable holding the bearer token of the current session.
pub const TOKEN_ENV: &str = "REPLYDESK_TOKEN";

pub const USAGE: &str = "\
Usage: replydesk <command> [args]

Commands:
  login <code>                  Exchange an authorization code for a session token
  whoami                        Show the signed-in account
  sync                          Check and, if needed, run the context sync
  drafts                        List stored draft records and answered messages
  generate <message-id>...      Generate reply drafts (at most 5 per run)
  show <message-id>             Load the stored draft of a message
  send <message-id> [body]      Send the draft, optionally replacing its body
  delete <message-id>           Delete the draft from both stores
  compose <to> <subject> <body> Send a new message
  outbox                        Show the unsent compose form, if any

Every command except login reads the session token from REPLYDESK_TOKEN.";

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { code: String },
    WhoAmI,
    Sync,
    Drafts,
    Generate { message_ids: Vec<String> },
    Show { message_id: String },
    Send { message_id: String, body: Option<String> },
    Delete { message_id: String },
    Compose { to: String, subject: String, body: String },
    Outbox,
    Help,
}

impl Command {
    /// Parses the arguments following the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            return Ok(Self::Help);
        };
        let rest: Vec<String> = args.collect();

        let command = match (name.as_str(), rest.as_slice()) {
            ("login", [code]) => Self::Login { code: code.clone() },
            ("whoami", []) => Self::WhoAmI,
            ("sync", []) => Self::Sync,
            ("drafts", []) => Self::Drafts,
            ("generate", ids) if !ids.is_empty() => Self::Generate {
                message_ids: ids.to_vec(),
            },
            ("show", [id]) => Self::Show {
                message_id: id.clone(),
            },
            ("send", [id]) => Self::Send {
                message_id: id.clone(),
                body: None,
            },
            ("send", [id, body]) => Self::Send {
                message_id: id.clone(),
                body: Some(body.clone()),
            },
            ("delete", [id]) => Self::Delete {
                message_id: id.clone(),
            },
            ("compose", [to, subject, body]) => Self::Compose {
                to: to.clone(),
                subject: subject.clone(),
                body: body.clone(),
            },
            ("outbox", []) => Self::Outbox,
            ("help" | "-h" | "--help", _) => Self::Help,
            (other, _) => bail!("invalid arguments for '{other}'\n\n{USAGE}"),
        };
        Ok(command)
    }

    /// Whether the command needs a session token.
    pub const fn needs_session(&self) -> bool {
        !matches!(self, Self::Login { .. } | Self::Help)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        Command::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn test_no_arguments_shows_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_generate_takes_many_ids() {
        assert_eq!(
            parse(&["generate", "m1", "m2"]).unwrap(),
            Command::Generate {
                message_ids: vec!["m1".into(), "m2".into()]
            }
        );
        assert!(parse(&["generate"]).is_err());
    }

    #[test]
    fn test_send_with_optional_body() {
        assert_eq!(
            parse(&["send", "m1"]).unwrap(),
            Command::Send {
                message_id: "m1".into(),
                body: None
            }
        );
        assert_eq!(
            parse(&["send", "m1", "Thanks"]).unwrap(),
            Command::Send {
                message_id: "m1".into(),
                body: Some("Thanks".into())
            }
        );
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let err = parse(&["frobnicate"]).unwrap_err();
        assert!(err.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_session_requirement() {
        assert!(!parse(&["login", "code"]).unwrap().needs_session());
        assert!(!parse(&["help"]).unwrap().needs_session());
        assert!(parse(&["sync"]).unwrap().needs_session());
    }
}

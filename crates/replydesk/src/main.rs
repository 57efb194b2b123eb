//! `replydesk` - command-line front end for AI-assisted email replies.
//!
//! Drives one backend session: login, context sync, draft generation,
//! review, send and delete.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod app;
mod cli;

use anyhow::Result;
use replydesk_core::Config;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "replydesk=info,replydesk_core=debug,replydesk_api=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = Command::parse(std::env::args().skip(1))?;
    let config = Config::load().await?;
    info!(api = %config.api_base_url, "Starting ReplyDesk");

    App::new(config)?.run(command).await
}

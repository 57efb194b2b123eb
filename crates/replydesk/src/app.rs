//! Command execution against the backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use replydesk_api::{ApiClient, Session};
use replydesk_core::{
    BatchCoordinator, ComposeDraftRepository, Composer, Config, ContextSync, DraftController,
    DraftIndex, LoadOutcome, MessageId, OutgoingMessage, Selection, SyncOutcome,
};
use tracing::{debug, info};

use crate::cli::{Command, TOKEN_ENV, USAGE};

/// One CLI invocation: configuration plus a backend client.
pub struct App {
    config: Config,
    client: ApiClient,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let client = ApiClient::with_timeout(&config.api_base_url, config.request_timeout())
            .with_context(|| format!("invalid backend URL '{}'", config.api_base_url))?;
        Ok(Self { config, client })
    }

    /// Attaches the session token from the environment.
    fn authenticate(&mut self) -> Result<()> {
        let token = std::env::var(TOKEN_ENV)
            .with_context(|| format!("{TOKEN_ENV} is not set; run `replydesk login <code>`"))?;
        self.client = self.client.clone().with_session(&Session::new(token));
        Ok(())
    }

    pub async fn run(mut self, command: Command) -> Result<()> {
        if command.needs_session() {
            self.authenticate()?;
        }
        debug!(?command, "Running command");

        match command {
            Command::Login { code } => self.login(&code).await,
            Command::WhoAmI => self.whoami().await,
            Command::Sync => self.sync().await,
            Command::Drafts => self.drafts().await,
            Command::Generate { message_ids } => self.generate(message_ids).await,
            Command::Show { message_id } => self.show(message_id.into()).await,
            Command::Send { message_id, body } => self.send(message_id.into(), body).await,
            Command::Delete { message_id } => self.delete(message_id.into()).await,
            Command::Compose { to, subject, body } => {
                self.compose(OutgoingMessage::new(to, subject, body)).await
            }
            Command::Outbox => self.outbox().await,
            Command::Help => {
                println!("{USAGE}");
                Ok(())
            }
        }
    }

    async fn login(&self, code: &str) -> Result<()> {
        let session = self.client.login(code).await.context("login failed")?;
        if let Some(user) = &session.user {
            info!(email = %user.email, "Signed in");
        }
        println!("export {TOKEN_ENV}={}", session.access_token);
        Ok(())
    }

    async fn whoami(&self) -> Result<()> {
        let profile = self.client.profile().await?;
        println!("{} <{}>", profile.name, profile.email);
        Ok(())
    }

    async fn sync(&self) -> Result<()> {
        let sync = ContextSync::new(Arc::new(self.client.clone()), self.config.sync_policy());
        match sync.start().await? {
            SyncOutcome::AlreadySynced => println!("Context already synced"),
            SyncOutcome::Synced { attempts } => {
                println!("Context synced after {attempts} check(s)");
            }
            SyncOutcome::TimedOut { attempts } => println!(
                "Context sync still running after {attempts} checks; AI replies may lack context"
            ),
            SyncOutcome::InProgress | SyncOutcome::Cancelled => {}
        }
        Ok(())
    }

    async fn drafts(&self) -> Result<()> {
        let index = DraftIndex::fetch(&self.client).await?;
        for (message_id, draft_id) in index.links() {
            println!("{message_id}\tdraft {draft_id}");
        }
        for message_id in index.sent() {
            println!("{message_id}\tsent");
        }
        println!("{} pending draft(s)", index.pending_count());
        Ok(())
    }

    /// A controller seeded from the stored draft records.
    async fn controller(&self) -> Result<DraftController<ApiClient>> {
        let controller = DraftController::new(Arc::new(self.client.clone()));
        let index = DraftIndex::fetch(&self.client).await?;
        controller.rehydrate(&index);
        Ok(controller)
    }

    async fn generate(&self, message_ids: Vec<String>) -> Result<()> {
        let mut selection = Selection::new();
        for message_id in message_ids {
            selection.select(MessageId::new(message_id))?;
        }

        let controller = self.controller().await?;
        let report = BatchCoordinator::new(&controller).run(&mut selection).await?;

        for item in &report.items {
            match &item.result {
                Ok(draft_id) => println!("{}\tdraft {draft_id}", item.message_id),
                Err(reason) => println!("{}\tfailed: {reason}", item.message_id),
            }
        }
        println!("{}", report.summary());
        Ok(())
    }

    async fn show(&self, message_id: MessageId) -> Result<()> {
        let controller = self.controller().await?;
        match controller.open(&message_id).await? {
            LoadOutcome::Loaded(draft) => println!("{}", serde_json::to_string_pretty(&draft)?),
            LoadOutcome::AlreadySent => println!("{message_id} has already been answered"),
            LoadOutcome::Missing => println!("The draft for {message_id} no longer exists"),
            LoadOutcome::NoDraft => println!("{message_id} has no draft"),
            LoadOutcome::Superseded | LoadOutcome::Discarded => {}
        }
        Ok(())
    }

    async fn send(&self, message_id: MessageId, body: Option<String>) -> Result<()> {
        let controller = self.controller().await?;
        if !matches!(controller.open(&message_id).await?, LoadOutcome::Loaded(_)) {
            anyhow::bail!("{message_id} has no pending draft to send");
        }
        if let Some(body) = body {
            controller.edit(&message_id, body)?;
        }

        let outcome = controller.send(&message_id).await?;
        println!(
            "Sent draft {} for {} ({:?})",
            outcome.draft_id, outcome.message_id, outcome.strategy
        );
        Ok(())
    }

    async fn delete(&self, message_id: MessageId) -> Result<()> {
        let controller = self.controller().await?;
        let outcome = controller.delete_draft(&message_id).await?;
        println!("{}", outcome.summary());
        Ok(())
    }

    /// Compose state is stored per signed-in account.
    async fn composer(&self) -> Result<Composer<ApiClient>> {
        let profile = self.client.profile().await?;
        let path = self.config.database_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let drafts = ComposeDraftRepository::new(&path.to_string_lossy()).await?;
        Ok(Composer::new(Arc::new(self.client.clone()), drafts, profile.email))
    }

    async fn compose(&self, message: OutgoingMessage) -> Result<()> {
        let composer = self.composer().await?;
        composer.autosave(&message).await?;
        let sent = composer.send(&message).await?;
        match sent.message_id {
            Some(id) => println!("Sent message {id}"),
            None => println!("Message sent"),
        }
        Ok(())
    }

    async fn outbox(&self) -> Result<()> {
        let composer = self.composer().await?;
        match composer.restore().await? {
            Some(saved) => println!(
                "To: {}\nSubject: {}\nSaved: {}\n\n{}",
                saved.message.to, saved.message.subject, saved.saved_at, saved.message.body
            ),
            None => println!("No unsent message"),
        }
        Ok(())
    }
}

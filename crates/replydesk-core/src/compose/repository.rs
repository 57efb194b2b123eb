//! Compose form storage repository.

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{OutgoingMessage, SavedCompose};
use crate::Result;

/// Repository for the unsent compose form, one per account.
#[derive(Debug, Clone)]
pub struct ComposeDraftRepository {
    pool: SqlitePool,
}

impl ComposeDraftRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS compose_drafts (
                account TEXT PRIMARY KEY,
                to_addr TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                body TEXT NOT NULL DEFAULT '',
                saved_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Saves the form for `account`, replacing any earlier one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn save(&self, account: &str, message: &OutgoingMessage) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO compose_drafts (account, to_addr, subject, body, saved_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(account) DO UPDATE SET
                to_addr = excluded.to_addr,
                subject = excluded.subject,
                body = excluded.body,
                saved_at = excluded.saved_at
            ",
        )
        .bind(account)
        .bind(&message.to)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loads the saved form for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn load(&self, account: &str) -> Result<Option<SavedCompose>> {
        let row = sqlx::query(
            r"
            SELECT account, to_addr, subject, body, saved_at
            FROM compose_drafts
            WHERE account = ?
            ",
        )
        .bind(account)
        .fetch_optional(&self.pool)
        .await?;

        let saved = row.and_then(|row| {
            let saved_at: String = row.get("saved_at");
            let saved_at = DateTime::parse_from_rfc3339(&saved_at)
                .ok()?
                .with_timezone(&Utc);

            Some(SavedCompose {
                account: row.get("account"),
                message: OutgoingMessage {
                    to: row.get("to_addr"),
                    subject: row.get("subject"),
                    body: row.get("body"),
                },
                saved_at,
            })
        });

        Ok(saved)
    }

    /// Removes the saved form for `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn clear(&self, account: &str) -> Result<()> {
        sqlx::query("DELETE FROM compose_drafts WHERE account = ?")
            .bind(account)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load() {
        let repo = ComposeDraftRepository::in_memory().await.unwrap();
        let message = OutgoingMessage::new("ana@example.com", "Plans", "Draft text");

        repo.save("me@example.com", &message).await.unwrap();

        let saved = repo.load("me@example.com").await.unwrap().unwrap();
        assert_eq!(saved.message, message);
        assert_eq!(saved.account, "me@example.com");
        assert!(repo.load("other@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces() {
        let repo = ComposeDraftRepository::in_memory().await.unwrap();
        repo.save("me@example.com", &OutgoingMessage::new("a@b.co", "", "one"))
            .await
            .unwrap();
        repo.save("me@example.com", &OutgoingMessage::new("a@b.co", "", "two"))
            .await
            .unwrap();

        let saved = repo.load("me@example.com").await.unwrap().unwrap();
        assert_eq!(saved.message.body, "two");
    }

    #[tokio::test]
    async fn test_clear() {
        let repo = ComposeDraftRepository::in_memory().await.unwrap();
        repo.save("me@example.com", &OutgoingMessage::new("a@b.co", "", "x"))
            .await
            .unwrap();

        repo.clear("me@example.com").await.unwrap();
        assert!(repo.load("me@example.com").await.unwrap().is_none());
    }
}

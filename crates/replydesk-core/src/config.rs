//! Application configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::context_sync::SyncPolicy;
use crate::error::{Error, Result};

/// Environment variable overriding [`Config::api_base_url`].
pub const API_URL_ENV: &str = "REPLYDESK_API_URL";

const APP_DIR: &str = "replydesk";

/// Settings loaded from `config.json` in the user config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL.
    pub api_base_url: String,
    /// Seconds between context sync polls.
    pub sync_poll_interval_secs: u64,
    /// Context sync polls before giving up.
    pub sync_max_attempts: u32,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// `SQLite` database for local state. Defaults to the user data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: replydesk_api::DEFAULT_BASE_URL.to_string(),
            sync_poll_interval_secs: 2,
            sync_max_attempts: 30,
            request_timeout_secs: 30,
            database_path: None,
        }
    }
}

impl Config {
    /// Default location of the config file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.json")
    }

    /// Loads the config from the default location.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()).await
    }

    /// Loads the config from `path`, falling back to defaults if the file
    /// does not exist, then applies the environment override.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds
    /// invalid values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let mut config = if tokio::fs::try_exists(path).await? {
            let contents = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };

        if let Some(url) = std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
        {
            config.api_base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    /// Saves the config to `path` as pretty JSON, creating the directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        tracing::info!("Config saved to {:?}", path);
        Ok(())
    }

    /// Saves the config to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()).await
    }

    fn validate(&self) -> Result<()> {
        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("api_base_url is empty".to_string()));
        }
        if self.sync_poll_interval_secs == 0 {
            return Err(Error::Config(
                "sync_poll_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Context sync polling policy.
    #[must_use]
    pub const fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            interval: Duration::from_secs(self.sync_poll_interval_secs),
            max_attempts: self.sync_max_attempts,
        }
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Database path, defaulting to the user data directory.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR)
                .join("replydesk.db")
        })
    }
}

//! Configuration types for the review bot.
//!
//! `AppConfig` represents the top-level `config.toml`. Every field has a
//! default, so an empty file (or no file) yields a runnable configuration.

use serde::{Deserialize, Serialize};

use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite URL for the session and review tables. When absent, the
    /// database lives in the data directory.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub telegram: TelegramSettings,

    #[serde(default)]
    pub server: ServerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            session: SessionSettings::default(),
            telegram: TelegramSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

/// Session registry tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Bounded inbox size per session actor.
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Sessions idle for longer than this are evicted.
    #[serde(default = "default_inactivity_secs")]
    pub inactivity_secs: u64,

    /// How often the reaper looks for idle sessions.
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

fn default_inbox_capacity() -> usize {
    10
}

fn default_inactivity_secs() -> u64 {
    300
}

fn default_purge_interval_secs() -> u64 {
    5
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            inbox_capacity: default_inbox_capacity(),
            inactivity_secs: default_inactivity_secs(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

impl SessionSettings {
    pub fn inactivity(&self) -> Duration {
        Duration::from_secs(self.inactivity_secs)
    }

    /// Purge interval, never zero (a zero-period interval panics in tokio).
    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs.max(1))
    }

    /// Inbox capacity, never zero (a zero-capacity mpsc channel panics).
    pub fn inbox_capacity(&self) -> usize {
        self.inbox_capacity.max(1)
    }
}

/// Telegram Bot API settings. The bot token is deliberately not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Long-poll timeout passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout_secs() -> u64 {
    60
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

/// Webhook receiver bind address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

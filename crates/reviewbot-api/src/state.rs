//! Application state wiring the session machinery to its infrastructure.
//!
//! The core is generic over its ports; `AppState` pins it to SQLite stores
//! and the Telegram transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use reviewbot_core::dispatch::Dispatcher;
use reviewbot_core::session::{SessionDeps, SessionRegistry};
use reviewbot_infra::config::{load_config, load_config_or_default, resolve_data_dir};
use reviewbot_infra::sqlite::{DatabasePool, SqliteReviewStore, SqliteSessionStore, default_database_url};
use reviewbot_infra::telegram::TelegramTransport;
use reviewbot_types::config::AppConfig;

pub type ConcreteRegistry = SessionRegistry<TelegramTransport, SqliteSessionStore, SqliteReviewStore>;

pub type ConcreteDispatcher = Dispatcher<TelegramTransport, SqliteSessionStore, SqliteReviewStore>;

/// Shared application state.
///
/// Used by the poll runner and the webhook handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub transport: TelegramTransport,
    pub dispatcher: Arc<ConcreteDispatcher>,
    pub db_pool: DatabasePool,
}

/// Load configuration: an explicit path must exist and be valid, the
/// implicit one falls back to defaults.
pub async fn load_app_config(explicit: Option<PathBuf>) -> anyhow::Result<(AppConfig, PathBuf)> {
    let data_dir = resolve_data_dir();
    let config = match explicit {
        Some(path) => load_explicit_config(&path).await?,
        None => load_config_or_default(&data_dir).await,
    };
    Ok((config, data_dir))
}

async fn load_explicit_config(path: &Path) -> anyhow::Result<AppConfig> {
    let exists = tokio::fs::try_exists(path)
        .await
        .with_context(|| format!("failed to access config {}", path.display()))?;
    if !exists {
        anyhow::bail!("config file {} does not exist", path.display());
    }
    Ok(load_config(path).await?)
}

/// Wrap the raw token, rejecting a missing or blank one.
pub fn bot_token(raw: Option<String>) -> anyhow::Result<SecretString> {
    match raw {
        Some(token) if !token.trim().is_empty() => Ok(SecretString::from(token)),
        _ => anyhow::bail!("no bot token: pass --token or set REVIEWBOT_TELEGRAM_TOKEN"),
    }
}

impl AppState {
    /// Connect to the database and wire the registry and dispatcher.
    pub async fn init(config: AppConfig, data_dir: PathBuf, transport: TelegramTransport) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database_url = config
            .database_url
            .clone()
            .unwrap_or_else(|| default_database_url(&data_dir));
        let db_pool = DatabasePool::new(&database_url)
            .await
            .context("failed to open database")?;

        Ok(Self::from_parts(config, db_pool, transport))
    }

    pub fn from_parts(config: AppConfig, db_pool: DatabasePool, transport: TelegramTransport) -> Self {
        let deps = SessionDeps::new(
            Arc::new(transport.clone()),
            Arc::new(SqliteSessionStore::new(db_pool.clone())),
            Arc::new(SqliteReviewStore::new(db_pool.clone())),
        );
        let registry = SessionRegistry::new(deps, config.session.clone());

        Self {
            config: Arc::new(config),
            transport,
            dispatcher: Arc::new(Dispatcher::new(registry)),
            db_pool,
        }
    }

    pub fn registry(&self) -> &ConcreteRegistry {
        self.dispatcher.registry()
    }
}

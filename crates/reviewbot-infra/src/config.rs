//! Configuration loader for the review bot.
//!
//! Reads `config.toml` into [`AppConfig`]. A config file named explicitly on
//! the command line must be valid; the implicit one in the data directory
//! falls back to defaults when it is missing or malformed.

use std::path::{Path, PathBuf};

use reviewbot_types::config::AppConfig;
use reviewbot_types::error::ConfigError;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "REVIEWBOT_DATA_DIR";

/// Resolve the data directory: `REVIEWBOT_DATA_DIR`, else `~/.reviewbot`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok())
}

fn data_dir_from(env_value: Option<String>) -> PathBuf {
    match env_value.filter(|v| !v.trim().is_empty()) {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".reviewbot"),
    }
}

/// Load configuration from an explicit path.
///
/// - Missing file: [`AppConfig::default()`].
/// - Unreadable or malformed file: [`ConfigError`].
pub async fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", path.display());
            return Ok(AppConfig::default());
        }
        Err(err) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                message: err.to_string(),
            });
        }
    };

    toml::from_str::<AppConfig>(&content).map_err(|err| ConfigError::Parse {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Load `{data_dir}/config.toml`, logging a warning and using defaults on
/// any failure.
pub async fn load_config_or_default(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");
    match load_config(&config_path).await {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("{err}, using defaults");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).await.unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.session.inbox_capacity, 10);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(
            &config_path,
            r#"
database_url = "sqlite:///tmp/reviews.db"

[session]
inactivity_secs = 600

[server]
port = 9000
"#,
        )
        .await
        .unwrap();

        let config = load_config(&config_path).await.unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/reviews.db"));
        assert_eq!(config.session.inactivity_secs, 600);
        assert_eq!(config.session.purge_interval_secs, 5);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[tokio::test]
    async fn load_config_invalid_toml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        tokio::fs::write(&config_path, "this is not { valid toml !!!")
            .await
            .unwrap();

        let err = load_config(&config_path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn load_config_or_default_swallows_parse_errors() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "[session]\ninbox_capacity = \"ten\"")
            .await
            .unwrap();

        let config = load_config_or_default(tmp.path()).await;
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn data_dir_prefers_env_value() {
        assert_eq!(
            data_dir_from(Some("/srv/reviewbot".to_string())),
            PathBuf::from("/srv/reviewbot")
        );
    }

    #[test]
    fn data_dir_falls_back_to_home() {
        let dir = data_dir_from(None);
        assert!(dir.ends_with(".reviewbot"));
        assert_eq!(data_dir_from(Some("  ".to_string())), dir);
    }
}

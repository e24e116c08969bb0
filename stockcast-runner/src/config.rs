//! Runtime configuration: TOML file plus environment overrides.
//!
//! Every field has a default, so an empty or missing file is valid. The API
//! key is the only value without a usable default; [`StockcastConfig::api_key`]
//! fails before any provider work starts when it is absent.
//!
//! Environment variables:
//! - `MASSIVE_API_KEY` or `POLYGON_API_KEY`: provider API key
//! - `STOCKCAST_DB`: database path

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "stockcast.toml";

const API_KEY_VARS: [&str; 2] = ["MASSIVE_API_KEY", "POLYGON_API_KEY"];
const DB_PATH_VAR: &str = "STOCKCAST_DB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no provider API key; set MASSIVE_API_KEY or [provider].api_key")]
    MissingApiKey,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StockcastConfig {
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub leaderboard: LeaderboardConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("stockcast.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
    /// Minimum spacing between provider calls (12s = 5 calls per minute).
    pub min_request_interval_secs: u64,
    /// Years of history fetched by the populate modes.
    pub history_years: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: stockcast_core::data::polygon::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            request_timeout_secs: 30,
            min_request_interval_secs: 12,
            history_years: 2,
        }
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs(self.min_request_interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub default_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { default_limit: 50 }
    }
}

impl StockcastConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Load from `path` if given, else `stockcast.toml` when it exists, else
    /// defaults; then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = API_KEY_VARS.into_iter().find_map(|var| non_empty(var)) {
            self.provider.api_key = Some(key);
        }
        if let Some(path) = non_empty(DB_PATH_VAR) {
            self.database.path = PathBuf::from(path);
        }
    }

    /// The provider API key, or [`ConfigError::MissingApiKey`].
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.provider
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = StockcastConfig::from_toml("").unwrap();
        assert_eq!(config, StockcastConfig::default());
        assert_eq!(config.provider.min_request_interval(), Duration::from_secs(12));
        assert_eq!(config.provider.history_years, 2);
        assert_eq!(config.leaderboard.default_limit, 50);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = StockcastConfig::from_toml(
            r#"
            [database]
            path = "/tmp/prices.db"

            [provider]
            api_key = "file-key"
            history_years = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/prices.db"));
        assert_eq!(config.api_key().unwrap(), "file-key");
        assert_eq!(config.provider.history_years, 5);
        assert_eq!(config.provider.request_timeout_secs, 30);
    }

    #[test]
    fn env_overrides_file() {
        let mut config =
            StockcastConfig::from_toml("[provider]\napi_key = \"file-key\"\n").unwrap();
        config.apply_env_with(env(&[
            ("MASSIVE_API_KEY", "env-key"),
            ("STOCKCAST_DB", "/data/stockcast.db"),
        ]));
        assert_eq!(config.api_key().unwrap(), "env-key");
        assert_eq!(config.database.path, PathBuf::from("/data/stockcast.db"));
    }

    #[test]
    fn polygon_key_used_when_massive_absent() {
        let mut config = StockcastConfig::default();
        config.apply_env_with(env(&[("MASSIVE_API_KEY", " "), ("POLYGON_API_KEY", "pg")]));
        assert_eq!(config.api_key().unwrap(), "pg");
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let mut config = StockcastConfig::default();
        config.apply_env_with(env(&[]));
        assert!(matches!(config.api_key(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn unknown_types_rejected() {
        let err = StockcastConfig::from_toml("[provider]\nhistory_years = \"two\"\n");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockcast.toml");
        let mut config = StockcastConfig::default();
        config.provider.min_request_interval_secs = 15;
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(StockcastConfig::from_file(&path).unwrap(), config);
        assert!(matches!(
            StockcastConfig::from_file(&dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

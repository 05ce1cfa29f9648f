//! Configuration management for lotwatch using the prefer crate.
//!
//! A config file is discovered by prefer (or named with `--config`) and
//! parsed by extension. Environment variables override the file, and CLI
//! flags override both.

mod browser;
mod sink;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Layout;

pub use browser::BrowserConfig;
pub use sink::{ClickHouseConfig, SinkConfig, SinkKind, SqliteConfig};

/// Default listing page: Honda motors, priced 15000-317300, years 2015-2025.
pub const DEFAULT_TARGET_URL: &str = "https://www.emiratesauction.com/motors?makes=&withoutmileages=true&pricesfrom=15000&pricesto=317300&yearsfrom=2015&yearsto=2025&withoutyears=true&k=honda";

/// Placeholder shown instead of a secret.
pub const REDACTED: &str = "********";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {format} config: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },
    #[error("collector.interval_secs must be greater than zero")]
    InvalidInterval,
    #[error("Invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid table name '{0}': expected letters, digits and underscores")]
    InvalidTable(String),
}

/// The page being watched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub url: String,
    /// CSS selector matching one listing card.
    pub container_selector: String,
    pub layout: Layout,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_TARGET_URL.to_string(),
            container_selector: ".list-card-container".to_string(),
            layout: Layout::default(),
        }
    }
}

/// Polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub interval_secs: u64,
    pub ready_timeout_secs: u64,
    pub settle_secs: u64,
    /// Upper bound for backoff after failed ticks; fixed interval when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_cap_secs: Option<u64>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            ready_timeout_secs: 20,
            settle_secs: 10,
            backoff_cap_secs: None,
        }
    }
}

impl CollectorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn backoff_cap(&self) -> Option<Duration> {
        self.backoff_cap_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub collector: CollectorConfig,
    pub browser: BrowserConfig,
    pub sink: SinkConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, using prefer for discovery unless `path` is given.
    ///
    /// An explicitly named file must load; a discovered file that fails to
    /// parse is logged and defaults are used instead.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path).await;
        }

        match prefer::load("lotwatch").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        tracing::warn!("Ignoring config file {}: {}", path.display(), e);
                        Ok(Self::default_with_env())
                    }
                },
                None => Ok(Self::default_with_env()),
            },
            // No config file found, use defaults with env overrides
            Err(_) => Ok(Self::default_with_env()),
        }
    }

    /// Create a default config with environment variable overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        match ext {
            "json" => serde_json::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
            "yaml" | "yml" => serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            _ => toml::from_str(contents).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("LOTWATCH_URL") {
            if !url.is_empty() {
                self.target.url = url;
            }
        }
        if let Some(secs) = env::var("LOTWATCH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            self.collector.interval_secs = secs;
        }
        self.browser = std::mem::take(&mut self.browser).with_env_overrides();
        self.sink = std::mem::take(&mut self.sink).with_env_overrides();
        self
    }

    /// Check the values the collector cannot run without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.collector.interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        url::Url::parse(&self.target.url).map_err(|source| ConfigError::InvalidUrl {
            url: self.target.url.clone(),
            source,
        })?;
        if !crate::sink::is_valid_table_name(&self.sink.table) {
            return Err(ConfigError::InvalidTable(self.sink.table.clone()));
        }
        Ok(())
    }

    /// Copy with secrets replaced, for display.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(ref mut password) = config.sink.clickhouse.password {
            *password = REDACTED.to_string();
        }
        config
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.target.url, DEFAULT_TARGET_URL);
        assert_eq!(config.target.layout, Layout::Attribute);
        assert_eq!(config.collector.interval(), Duration::from_secs(30));
        assert_eq!(config.sink.table, "EA1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.collector.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidInterval)));

        let mut config = Config::default();
        config.target.url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));

        let mut config = Config::default();
        config.sink.table = "EA1; DROP TABLE x".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTable(_))));
    }

    #[test]
    fn test_parse_formats() {
        let toml = "[target]\nlayout = \"positional\"\n[collector]\ninterval_secs = 5\n";
        let config = Config::parse(toml, "toml").unwrap();
        assert_eq!(config.target.layout, Layout::Positional);
        assert_eq!(config.collector.interval_secs, 5);
        assert_eq!(config.collector.settle_secs, 10);

        let json = r#"{"sink": {"kind": "sqlite", "table": "EA2"}}"#;
        let config = Config::parse(json, "json").unwrap();
        assert_eq!(config.sink.kind, SinkKind::Sqlite);
        assert_eq!(config.sink.table, "EA2");

        let yaml = "browser:\n  headless: false\n  chrome_args: [\"--lang=en\"]\n";
        let config = Config::parse(yaml, "yml").unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.chrome_args, vec!["--lang=en".to_string()]);

        assert!(matches!(
            Config::parse("[target", "toml"),
            Err(ConfigError::Parse { format: "TOML", .. })
        ));
    }

    #[test]
    fn test_toml_output_parses_back() {
        let mut config = Config::default();
        config.collector.backoff_cap_secs = Some(300);
        let text = config.to_toml().unwrap();
        let parsed = Config::parse(&text, "toml").unwrap();
        assert_eq!(parsed.collector.backoff_cap_secs, Some(300));
        assert_eq!(parsed.target.container_selector, ".list-card-container");
    }

    #[test]
    fn test_redacted_hides_password() {
        let mut config = Config::default();
        config.sink.clickhouse.password = Some("hunter2".to_string());
        let text = config.redacted().to_toml().unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains(REDACTED));
        assert_eq!(config.sink.clickhouse.password.as_deref(), Some("hunter2"));

        let text = Config::default().redacted().to_toml().unwrap();
        assert!(!text.contains("password"));
    }

    #[test]
    fn test_example_config() {
        let config = Config::parse(include_str!("../../lotwatch.example.toml"), "toml").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.sink.sqlite.path, "~/lotwatch.db");
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lotwatch.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[target]\ncontainer_selector = \".card\"").unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.target.container_selector, ".card");
        assert_eq!(config.source_path.as_deref(), Some(path.as_path()));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            Config::load(Some(&missing)).await,
            Err(ConfigError::Read { .. })
        ));
    }
}

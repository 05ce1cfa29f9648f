//! Sink configuration.

use std::env;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which backend receives observations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Clickhouse,
    Sqlite,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clickhouse => "clickhouse",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "clickhouse" | "ch" => Some(Self::Clickhouse),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str(s)
            .ok_or_else(|| format!("Invalid sink '{}'. Valid options: clickhouse, sqlite", s))
    }
}

/// ClickHouse HTTP interface settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    pub url: String,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub database: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: None,
            database: "default".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ClickHouseConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = env::var("CLICKHOUSE_URL") {
            if !url.is_empty() {
                self.url = url;
            }
        }
        if let Ok(user) = env::var("CLICKHOUSE_USER") {
            if !user.is_empty() {
                self.user = user;
            }
        }
        if let Ok(password) = env::var("CLICKHOUSE_PASSWORD") {
            self.password = Some(password);
        }
        if let Ok(database) = env::var("CLICKHOUSE_DATABASE") {
            if !database.is_empty() {
                self.database = database;
            }
        }
        self
    }
}

/// Local SQLite sink settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file; `~` is expanded.
    pub path: String,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "lotwatch.db".to_string(),
        }
    }
}

impl SqliteConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = env::var("LOTWATCH_SQLITE_PATH") {
            if !path.is_empty() {
                self.path = path;
            }
        }
        self
    }

    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
    /// Destination table for every observation.
    pub table: String,
    pub clickhouse: ClickHouseConfig,
    pub sqlite: SqliteConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            table: "EA1".to_string(),
            clickhouse: ClickHouseConfig::default(),
            sqlite: SqliteConfig::default(),
        }
    }
}

impl SinkConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(table) = env::var("LOTWATCH_TABLE") {
            if !table.is_empty() {
                self.table = table;
            }
        }
        if let Some(kind) = env::var("LOTWATCH_SINK")
            .ok()
            .and_then(|v| SinkKind::from_str(&v))
        {
            self.kind = kind;
        }
        self.clickhouse = std::mem::take(&mut self.clickhouse).with_env_overrides();
        self.sqlite = std::mem::take(&mut self.sqlite).with_env_overrides();
        self
    }
}

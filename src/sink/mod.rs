//! Persistence sinks for observations.
//!
//! Each observation is appended as one row to a named table. The collector
//! only sees [`ListingSink`]; [`Sink`] picks the configured backend.

pub mod clickhouse;
mod pool;
pub mod sqlite;

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::config::{SinkConfig, SinkKind};
use crate::models::{Layout, Observation};

pub use clickhouse::ClickHouseSink;
pub use pool::AsyncSqlitePool;
pub use sqlite::SqliteSink;

static TABLE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Sink errors.
///
/// `Unavailable` means no further row can be written right now; `Rejected`
/// concerns only the row that was offered.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    #[error("row rejected: {0}")]
    Rejected(String),
    #[error("invalid table name: {0:?}")]
    InvalidTable(String),
}

/// Destination for observations.
#[async_trait]
pub trait ListingSink: Send {
    /// Create `table` for rows of `layout` if it does not exist.
    async fn ensure_table(&mut self, table: &str, layout: Layout) -> Result<(), SinkError>;

    /// Append one observation as a row of `table`.
    async fn append(&mut self, table: &str, observation: &Observation) -> Result<(), SinkError>;
}

/// Whether `name` can be interpolated into SQL as a table identifier.
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME.is_match(name)
}

pub(crate) fn check_table(name: &str) -> Result<(), SinkError> {
    if is_valid_table_name(name) {
        Ok(())
    } else {
        Err(SinkError::InvalidTable(name.to_string()))
    }
}

/// The configured sink backend.
pub enum Sink {
    ClickHouse(ClickHouseSink),
    Sqlite(SqliteSink),
}

impl Sink {
    pub fn from_config(config: &SinkConfig) -> Result<Self, SinkError> {
        check_table(&config.table)?;
        Ok(match config.kind {
            SinkKind::Clickhouse => Sink::ClickHouse(ClickHouseSink::new(&config.clickhouse)?),
            SinkKind::Sqlite => {
                Sink::Sqlite(SqliteSink::new(&config.sqlite.resolved_path()))
            }
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Sink::ClickHouse(sink) => format!("clickhouse ({})", sink.url()),
            Sink::Sqlite(sink) => format!("sqlite ({})", sink.database_url()),
        }
    }
}

#[async_trait]
impl ListingSink for Sink {
    async fn ensure_table(&mut self, table: &str, layout: Layout) -> Result<(), SinkError> {
        match self {
            Sink::ClickHouse(sink) => sink.ensure_table(table, layout).await,
            Sink::Sqlite(sink) => sink.ensure_table(table, layout).await,
        }
    }

    async fn append(&mut self, table: &str, observation: &Observation) -> Result<(), SinkError> {
        match self {
            Sink::ClickHouse(sink) => sink.append(table, observation).await,
            Sink::Sqlite(sink) => sink.append(table, observation).await,
        }
    }
}

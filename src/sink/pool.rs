//! Async SQLite connection factory.
//!
//! SQLite connections are cheap and file-based, so a fresh
//! `SyncConnectionWrapper` is established per request instead of pooling.

use std::path::Path;

use diesel::sqlite::SqliteConnection;
use diesel::ConnectionError;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::AsyncConnection;

/// Async SQLite connection using SyncConnectionWrapper.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

#[derive(Debug, Clone)]
pub struct AsyncSqlitePool {
    database_url: String,
}

impl AsyncSqlitePool {
    pub fn new(database_url: &str) -> Self {
        // Strip sqlite: prefix if present for diesel
        let url = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
        Self {
            database_url: url.to_string(),
        }
    }

    pub fn from_path(db_path: &Path) -> Self {
        Self::new(&db_path.display().to_string())
    }

    /// Get a new connection.
    pub async fn get(&self) -> Result<AsyncSqliteConnection, ConnectionError> {
        AsyncSqliteConnection::establish(&self.database_url).await
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

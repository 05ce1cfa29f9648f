//! ClickHouse sink over the HTTP interface.
//!
//! Rows are sent as `JSONEachRow`, one request per observation, so a
//! rejected row never takes its neighbours down with it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::{check_table, ListingSink, SinkError};
use crate::config::ClickHouseConfig;
use crate::models::{Layout, Observation};

pub struct ClickHouseSink {
    client: reqwest::Client,
    config: ClickHouseConfig,
}

impl ClickHouseSink {
    pub fn new(config: &ClickHouseConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SinkError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// POST `body` with an optional `query` parameter (used for INSERT).
    async fn execute(&self, query: Option<&str>, body: String) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("database", self.config.database.as_str())])
            .basic_auth(&self.config.user, self.config.password.as_ref());
        if let Some(query) = query {
            request = request.query(&[("query", query)]);
        }

        let response = request.body(body).send().await.map_err(|e| {
            if e.is_timeout() {
                SinkError::Unavailable(format!("request timed out: {}", e))
            } else {
                SinkError::Unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        let message = format!("HTTP {}: {}", status, message.trim());
        match status {
            // Nothing else will get through either
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::SERVICE_UNAVAILABLE => {
                Err(SinkError::Unavailable(message))
            }
            _ => Err(SinkError::Rejected(message)),
        }
    }
}

/// DDL for a layout's table.
///
/// `time` is stamped in UTC; `end_date` is the site's wall-clock time.
pub fn create_table_sql(table: &str, layout: Layout) -> String {
    let columns = match layout {
        Layout::Attribute => {
            "lot String, title String, price Decimal(12, 2), distance UInt16, unit String, time DateTime('UTC')"
        }
        Layout::Positional => {
            "lot String, title String, price Decimal(12, 2), distance String, end_date DateTime, time_left UInt64, bids UInt32, time DateTime('UTC')"
        }
    };
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = MergeTree ORDER BY (lot, time)",
        table, columns
    )
}

/// INSERT statement whose rows follow in the request body.
pub fn insert_sql(table: &str, layout: Layout) -> String {
    format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        table,
        layout.columns().join(", ")
    )
}

#[async_trait]
impl ListingSink for ClickHouseSink {
    async fn ensure_table(&mut self, table: &str, layout: Layout) -> Result<(), SinkError> {
        check_table(table)?;
        let ddl = create_table_sql(table, layout);
        debug!("{}", ddl);
        self.execute(None, ddl).await
    }

    async fn append(&mut self, table: &str, observation: &Observation) -> Result<(), SinkError> {
        check_table(table)?;
        let query = insert_sql(table, observation.record.layout());
        let row = observation.to_json_row().to_string();
        self.execute(Some(&query), row).await
    }
}

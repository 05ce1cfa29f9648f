//! SQLite sink for local runs without a ClickHouse server.
//!
//! Prices are stored as TEXT to keep their exact two-digit rendering.

use std::path::Path;

use async_trait::async_trait;
use diesel::sql_types::{BigInt, Integer, Text};
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::pool::AsyncSqlitePool;
use super::{check_table, ListingSink, SinkError};
use crate::models::{Layout, ListingDetails, Observation, ROW_TIME_FORMAT};

#[derive(Clone)]
pub struct SqliteSink {
    pool: AsyncSqlitePool,
}

impl SqliteSink {
    pub fn new(path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(path),
        }
    }

    pub fn from_pool(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    pub fn database_url(&self) -> &str {
        self.pool.database_url()
    }
}

pub fn create_table_sql(table: &str, layout: Layout) -> String {
    let columns = match layout {
        Layout::Attribute => {
            "lot TEXT NOT NULL,
                title TEXT NOT NULL,
                price TEXT NOT NULL,
                distance INTEGER NOT NULL,
                unit TEXT NOT NULL,
                time TEXT NOT NULL"
        }
        Layout::Positional => {
            "lot TEXT NOT NULL,
                title TEXT NOT NULL,
                price TEXT NOT NULL,
                distance TEXT NOT NULL,
                end_date TEXT NOT NULL,
                time_left INTEGER NOT NULL,
                bids INTEGER NOT NULL,
                time TEXT NOT NULL"
        }
    };
    format!("CREATE TABLE IF NOT EXISTS {} (\n                {}\n            )", table, columns)
}

fn to_sink_error(e: diesel::result::Error) -> SinkError {
    match e {
        diesel::result::Error::DatabaseError(_, info) => {
            SinkError::Rejected(info.message().to_string())
        }
        other => SinkError::Unavailable(other.to_string()),
    }
}

#[async_trait]
impl ListingSink for SqliteSink {
    async fn ensure_table(&mut self, table: &str, layout: Layout) -> Result<(), SinkError> {
        check_table(table)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let statements = [
            create_table_sql(table, layout),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_lot_time ON {}(lot, time)",
                table, table
            ),
        ];
        for stmt in statements {
            debug!("{}", stmt);
            diesel::sql_query(stmt)
                .execute(&mut conn)
                .await
                .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn append(&mut self, table: &str, observation: &Observation) -> Result<(), SinkError> {
        check_table(table)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let record = &observation.record;
        let time = observation.observed_at.format(ROW_TIME_FORMAT).to_string();
        let placeholders = vec!["?"; observation.columns().len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            observation.columns().join(", "),
            placeholders
        );

        match &record.details {
            ListingDetails::Attribute { distance, unit } => {
                diesel::sql_query(sql)
                    .bind::<Text, _>(&record.lot)
                    .bind::<Text, _>(&record.title)
                    .bind::<Text, _>(record.price.to_string())
                    .bind::<Integer, _>(i32::from(*distance))
                    .bind::<Text, _>(unit)
                    .bind::<Text, _>(&time)
                    .execute(&mut conn)
                    .await
                    .map_err(to_sink_error)?;
            }
            ListingDetails::Positional {
                mileage_text,
                end_date,
                time_left_seconds,
                bid_count,
            } => {
                let time_left = i64::try_from(*time_left_seconds).map_err(|_| {
                    SinkError::Rejected(format!("time_left {} too large", time_left_seconds))
                })?;
                diesel::sql_query(sql)
                    .bind::<Text, _>(&record.lot)
                    .bind::<Text, _>(&record.title)
                    .bind::<Text, _>(record.price.to_string())
                    .bind::<Text, _>(mileage_text)
                    .bind::<Text, _>(end_date.format(ROW_TIME_FORMAT).to_string())
                    .bind::<BigInt, _>(time_left)
                    .bind::<BigInt, _>(i64::from(*bid_count))
                    .bind::<Text, _>(&time)
                    .execute(&mut conn)
                    .await
                    .map_err(to_sink_error)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ListingRecord, Price};
    use chrono::{NaiveDate, TimeZone, Utc};

    #[derive(diesel::QueryableByName)]
    struct AttributeRow {
        #[diesel(sql_type = Text)]
        lot: String,
        #[diesel(sql_type = Text)]
        price: String,
        #[diesel(sql_type = Integer)]
        distance: i32,
        #[diesel(sql_type = Text)]
        time: String,
    }

    #[derive(diesel::QueryableByName)]
    struct PositionalRow {
        #[diesel(sql_type = Text)]
        distance: String,
        #[diesel(sql_type = Text)]
        end_date: String,
        #[diesel(sql_type = BigInt)]
        time_left: i64,
        #[diesel(sql_type = BigInt)]
        bids: i64,
    }

    fn record(lot: &str, details: ListingDetails) -> ListingRecord {
        ListingRecord {
            lot: lot.to_string(),
            title: "2019 Honda Accord".to_string(),
            price: Price::from_cents(4_500_000),
            details,
        }
    }

    #[tokio::test]
    async fn test_attribute_rows_append() {
        let dir = tempfile::tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        let mut sink = SqliteSink::from_pool(pool.clone());

        sink.ensure_table("EA1", Layout::Attribute).await.unwrap();
        // Idempotent
        sink.ensure_table("EA1", Layout::Attribute).await.unwrap();

        let details = ListingDetails::Attribute {
            distance: 1200,
            unit: "km".to_string(),
        };
        let first = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 1, 2, 10, 0, 30).unwrap();
        let rec = record("12345", details);
        sink.append("EA1", &Observation::new(rec.clone(), first))
            .await
            .unwrap();
        sink.append("EA1", &Observation::new(rec, second))
            .await
            .unwrap();

        let mut conn = pool.get().await.unwrap();
        let rows: Vec<AttributeRow> =
            diesel::sql_query("SELECT lot, price, distance, time FROM EA1 ORDER BY time")
                .load(&mut conn)
                .await
                .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lot, "12345");
        assert_eq!(rows[0].price, "45000.00");
        assert_eq!(rows[0].distance, 1200);
        assert_eq!(rows[0].time, "2026-01-02 10:00:00");
        assert_eq!(rows[1].time, "2026-01-02 10:00:30");
    }

    #[tokio::test]
    async fn test_positional_row_append() {
        let dir = tempfile::tempdir().unwrap();
        let pool = AsyncSqlitePool::from_path(&dir.path().join("test.db"));
        let mut sink = SqliteSink::from_pool(pool.clone());
        sink.ensure_table("EA2", Layout::Positional).await.unwrap();

        let details = ListingDetails::Positional {
            mileage_text: "1,200 km".to_string(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(15, 45, 0)
                .unwrap(),
            time_left_seconds: 183_600,
            bid_count: 14,
        };
        sink.append("EA2", &Observation::new(record("1", details), Utc::now()))
            .await
            .unwrap();

        let mut conn = pool.get().await.unwrap();
        let rows: Vec<PositionalRow> =
            diesel::sql_query("SELECT distance, end_date, time_left, bids FROM EA2")
                .load(&mut conn)
                .await
                .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].distance, "1,200 km");
        assert_eq!(rows[0].end_date, "2026-01-05 15:45:00");
        assert_eq!(rows[0].time_left, 183_600);
        assert_eq!(rows[0].bids, 14);
    }

    #[tokio::test]
    async fn test_missing_table_rejects_row() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SqliteSink::new(&dir.path().join("test.db"));
        let details = ListingDetails::Attribute {
            distance: 1,
            unit: "km".to_string(),
        };
        let err = sink
            .append("EA1", &Observation::new(record("1", details), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Rejected(_)));
    }
}

//! Embedded SQLite history store.
//!
//! Samples land in a single `usage_history` table with an auto-incrementing
//! surrogate key. Timestamps are stored as Unix milliseconds (UTC). The
//! connection pool is capped at one connection so all store access is
//! serialized; the scheduler is the only owner anyway.

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use super::error::{StoreError, StoreResult};
use crate::Sample;

pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Open (creating if missing) the history database at `db_path` and
    /// ensure the schema exists.
    ///
    /// Safe to call on an existing database: schema initialization is
    /// idempotent and never drops rows.
    #[instrument(skip_all)]
    pub async fn open(db_path: impl AsRef<Path>) -> StoreResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        if db_path.as_ref().exists() {
            info!("existing database '{}' detected, reusing it", db_path_str);
        } else {
            info!("no database at '{}', creating a new one", db_path_str);
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        // A single connection keeps every write serialized.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let store = Self {
            pool,
            db_path: db_path_str,
        };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp INTEGER NOT NULL,
                cpu_usage REAL NOT NULL,
                ram_usage REAL NOT NULL,
                disk_usage REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_usage_history_timestamp \
             ON usage_history (timestamp)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::SchemaFailed(e.to_string()))?;

        debug!("history schema ready at '{}'", self.db_path);
        Ok(())
    }

    /// Durably append one sample and return the assigned row id.
    ///
    /// A single INSERT statement is atomic in SQLite: the row is either
    /// fully committed before this returns or not visible at all.
    #[instrument(skip(self, sample), fields(timestamp = %sample.timestamp))]
    pub async fn insert(&self, sample: &Sample) -> StoreResult<i64> {
        let result = sqlx::query(
            "INSERT INTO usage_history (timestamp, cpu_usage, ram_usage, disk_usage) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp_to_millis(&sample.timestamp))
        .bind(sample.cpu_percent)
        .bind(sample.ram_percent)
        .bind(sample.disk_percent)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("inserted sample as row {}", id);
        Ok(id)
    }

    /// Remove all rows strictly older than the cutoff, returning how many
    /// were deleted. Zero matches is success, not an error.
    #[instrument(skip(self), fields(cutoff = %cutoff))]
    pub async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM usage_history WHERE timestamp < ?")
            .bind(timestamp_to_millis(&cutoff))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of stored samples.
    pub async fn count(&self) -> StoreResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM usage_history")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    pub async fn close(&self) {
        debug!("closing history store");
        self.pool.close().await;
    }
}

fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_at(timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            cpu_percent: 42.0,
            ram_percent: 58.5,
            disk_percent: 73.2,
        }
    }

    #[tokio::test]
    async fn test_open_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("history.db");

        let store = SqliteStore::open(&db_path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_each_insert_adds_exactly_one_row() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("history.db"))
            .await
            .unwrap();

        for expected in 1..=5 {
            store.insert(&sample_at(Utc::now())).await.unwrap();
            assert_eq!(store.count().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_insert_returns_increasing_ids() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("history.db"))
            .await
            .unwrap();

        let first = store.insert(&sample_at(Utc::now())).await.unwrap();
        let second = store.insert(&sample_at(Utc::now())).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_delete_older_than_respects_cutoff() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("history.db"))
            .await
            .unwrap();

        let cutoff = Utc::now();

        // 5 rows on each side of the cutoff.
        for days in 1..=5 {
            store
                .insert(&sample_at(cutoff - Duration::days(days)))
                .await
                .unwrap();
            store
                .insert(&sample_at(cutoff + Duration::days(days)))
                .await
                .unwrap();
        }

        let deleted = store.delete_older_than(cutoff).await.unwrap();
        assert_eq!(deleted, 5);
        assert_eq!(store.count().await.unwrap(), 5);

        // Everything left is at or after the cutoff.
        let oldest: (i64,) = sqlx::query_as("SELECT MIN(timestamp) FROM usage_history")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert!(oldest.0 >= timestamp_to_millis(&cutoff));
    }

    #[tokio::test]
    async fn test_delete_keeps_row_exactly_at_cutoff() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("history.db"))
            .await
            .unwrap();

        let cutoff = Utc::now();
        store.insert(&sample_at(cutoff)).await.unwrap();

        assert_eq!(store.delete_older_than(cutoff).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_no_matches_is_ok() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(temp_dir.path().join("history.db"))
            .await
            .unwrap();

        let deleted = store.delete_older_than(Utc::now()).await.unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent_and_preserves_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("history.db");

        let store = SqliteStore::open(&db_path).await.unwrap();
        for _ in 0..3 {
            store.insert(&sample_at(Utc::now())).await.unwrap();
        }
        store.close().await;

        // Second open runs schema initialization again on the same file.
        let reopened = SqliteStore::open(&db_path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
    }
}

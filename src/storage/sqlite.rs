//! SQLite target store implementation
//!
//! This module provides a SQLite-based implementation of the `TargetStore` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Fetch cycles append history in parallel
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Timestamps are stored as Unix milliseconds. `last_check` is computed by
//! joining targets against their newest history row.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, TargetStore};
use super::error::{StorageError, StorageResult};
use super::schema::{HistoryRecord, NewTarget, Target, TargetId};

/// SQLite target store
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteStore {
    /// Create a new SQLite store
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Enable WAL mode and foreign keys (history rows cascade on delete)
    ///
    /// ## Example
    ///
    /// ```no_run
    /// # use uptime_fetcher::storage::sqlite::SqliteStore;
    /// # async fn example() -> anyhow::Result<()> {
    /// let store = SqliteStore::new("./fetcher.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite store at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn target_from_row(row: &SqliteRow) -> StorageResult<Target> {
        let interval: i64 = row.get("interval_secs");
        let interval_secs = u32::try_from(interval).map_err(|_| {
            StorageError::QueryFailed(format!("stored interval {} is out of range", interval))
        })?;

        Ok(Target {
            id: row.get("id"),
            url: row.get("url"),
            interval_secs,
            last_check: row
                .get::<Option<i64>, _>("last_check")
                .map(Self::millis_to_timestamp),
        })
    }

    async fn target_exists(&self, id: TargetId) -> StorageResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM targets WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }
}

#[async_trait]
impl TargetStore for SqliteStore {
    #[instrument(skip(self))]
    async fn list_targets(&self) -> StorageResult<Vec<Target>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.url, t.interval_secs, MAX(h.created_at) AS last_check
            FROM targets t
            LEFT JOIN history h ON h.target_id = t.id
            GROUP BY t.id, t.url, t.interval_secs
            ORDER BY t.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let targets = rows
            .iter()
            .map(Self::target_from_row)
            .collect::<StorageResult<Vec<_>>>()?;

        debug!("listed {} targets", targets.len());
        Ok(targets)
    }

    #[instrument(skip(self, response), fields(bytes = response.len()))]
    async fn append_history(
        &self,
        target_id: TargetId,
        response: String,
        duration_secs: f64,
    ) -> StorageResult<()> {
        let created_at = Self::timestamp_to_millis(&Utc::now());

        sqlx::query(
            r#"
            INSERT INTO history (target_id, response, duration_secs, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(target_id)
        .bind(response)
        .bind(duration_secs)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_last_check(&self, target_id: TargetId) -> StorageResult<Option<DateTime<Utc>>> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(created_at) FROM history WHERE target_id = ?")
                .bind(target_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0.map(Self::millis_to_timestamp))
    }

    #[instrument(skip(self), fields(url = %target.url))]
    async fn create_target(&self, target: NewTarget) -> StorageResult<Target> {
        target.validate()?;

        let result = sqlx::query(
            "INSERT INTO targets (url, interval_secs, created_at) VALUES (?, ?, ?)",
        )
        .bind(&target.url)
        .bind(i64::from(target.interval_secs))
        .bind(Self::timestamp_to_millis(&Utc::now()))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!("created target {id}");

        Ok(Target {
            id,
            url: target.url,
            interval_secs: target.interval_secs,
            last_check: None,
        })
    }

    #[instrument(skip(self))]
    async fn find_target(&self, id: TargetId) -> StorageResult<Target> {
        let row = sqlx::query(
            r#"
            SELECT t.id, t.url, t.interval_secs,
                   (SELECT MAX(h.created_at) FROM history h WHERE h.target_id = t.id) AS last_check
            FROM targets t
            WHERE t.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::target_from_row(&row),
            None => Err(StorageError::NotFound(id)),
        }
    }

    #[instrument(skip(self))]
    async fn delete_target(&self, id: TargetId) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM targets WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }

        info!("deleted target {id}");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_history(&self, id: TargetId) -> StorageResult<Vec<HistoryRecord>> {
        if !self.target_exists(id).await? {
            return Err(StorageError::NotFound(id));
        }

        let rows = sqlx::query(
            r#"
            SELECT target_id, response, duration_secs, created_at
            FROM history
            WHERE target_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| HistoryRecord {
                target_id: row.get("target_id"),
                response: row.get("response"),
                duration_secs: row.get("duration_secs"),
                created_at: Self::millis_to_timestamp(row.get("created_at")),
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => Ok(HealthStatus {
                healthy: true,
                message: "SQLite store operational".to_string(),
                metadata: HashMap::from([
                    ("backend".to_string(), "sqlite".to_string()),
                    ("db_path".to_string(), self.db_path.clone()),
                ]),
            }),
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite store");
        self.pool.close().await;
        Ok(())
    }
}

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
    SqliteSynchronous,
};
use sqlx::{Column, Row, Sqlite, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, info};

use crate::dialect::Dialect;
use crate::error::{PropDbError, Result};
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Embedded-engine driver backed by a single SQLite connection.
///
/// The pool is capped at one connection so the file has exactly one
/// handle; concurrent callers queue on it.
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Open (or create) the database file at `path` with foreign keys enforced.
    pub async fn open(path: &Path) -> Result<Self> {
        let unavailable = |message: String| PropDbError::StorageUnavailable {
            path: path.display().to_string(),
            message,
        };

        let base = if path.as_os_str() == IN_MEMORY {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| unavailable(e.to_string()))?
        } else {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
        };
        let options = base.foreign_keys(true);

        // A closed idle connection would discard an in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        info!(path = %path.display(), "Opened SQLite database");
        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, params = params.len(), "sqlite query");
        let rows = bind_params(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await
            .map_err(query_failed)?;

        let columns: Vec<String> = rows
            .first()
            .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let values = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
        Ok(RawQueryResult::new(columns, values))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql, params = params.len(), "sqlite execute");
        let done = bind_params(sqlx::query(sql), params)
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        Ok(RawQueryResult::mutation(
            done.rows_affected(),
            Some(done.last_insert_rowid()),
        ))
    }

    async fn execute_batch(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed SQLite database");
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Int64(v) => query.bind(*v),
            SqlValue::Float64(v) => query.bind(*v),
            SqlValue::Bool(b) => query.bind(*b),
        };
    }
    query
}

/// Decode by each value's storage class, since SQLite columns are loosely typed.
fn decode_row(row: &SqliteRow) -> Result<Vec<SqlValue>> {
    (0..row.len())
        .map(|i| {
            let raw = row.try_get_raw(i).map_err(query_failed)?;
            if raw.is_null() {
                return Ok(SqlValue::Null);
            }
            let storage = raw.type_info().name().to_string();
            let value = match storage.as_str() {
                "INTEGER" => row.try_get_unchecked::<i64, _>(i).map(SqlValue::Int64),
                "REAL" => row.try_get_unchecked::<f64, _>(i).map(SqlValue::Float64),
                "BLOB" => row
                    .try_get_unchecked::<Vec<u8>, _>(i)
                    .map(|bytes| SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())),
                _ => row.try_get_unchecked::<String, _>(i).map(SqlValue::Text),
            };
            value.map_err(query_failed)
        })
        .collect()
}

fn query_failed(e: sqlx::Error) -> PropDbError {
    PropDbError::QueryFailed(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let driver = SqliteDriver::open(Path::new(IN_MEMORY)).await.unwrap();
        let result = driver.query("SELECT 1 AS one", &[]).await.unwrap();
        assert_eq!(result.columns, vec!["one".to_string()]);
        assert_eq!(result.rows, vec![vec![SqlValue::Int64(1)]]);
    }

    #[tokio::test]
    async fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");
        let driver = SqliteDriver::open(&db_path).await.unwrap();
        driver.query("SELECT 1", &[]).await.unwrap();
        assert!(db_path.exists());
        driver.close().await;
    }

    #[tokio::test]
    async fn test_open_unwritable_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let err = SqliteDriver::open(&blocker.join("db.sqlite"))
            .await
            .err()
            .expect("open should fail");
        assert!(matches!(err, PropDbError::StorageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_decodes_storage_classes() {
        let driver = SqliteDriver::open(Path::new(IN_MEMORY)).await.unwrap();
        let result = driver
            .query(
                "SELECT ? AS i, ? AS r, ? AS t, ? AS n",
                &[
                    SqlValue::Int64(42),
                    SqlValue::Float64(1.5),
                    SqlValue::Text("x".to_string()),
                    SqlValue::Null,
                ],
            )
            .await
            .unwrap();
        assert_eq!(
            result.rows[0],
            vec![
                SqlValue::Int64(42),
                SqlValue::Float64(1.5),
                SqlValue::Text("x".to_string()),
                SqlValue::Null
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_reports_rowid_and_changes() {
        let driver = SqliteDriver::open(Path::new(IN_MEMORY)).await.unwrap();
        driver
            .execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);")
            .await
            .unwrap();

        let first = driver
            .execute("INSERT INTO t (v) VALUES (?)", &["a".into()])
            .await
            .unwrap();
        assert_eq!(first.rows_affected, Some(1));
        assert_eq!(first.last_insert_id, Some(1));

        driver
            .execute("INSERT INTO t (v) VALUES (?)", &["b".into()])
            .await
            .unwrap();
        let updated = driver
            .execute("UPDATE t SET v = ?", &["c".into()])
            .await
            .unwrap();
        assert_eq!(updated.rows_affected, Some(2));
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let driver = SqliteDriver::open(Path::new(IN_MEMORY)).await.unwrap();
        driver
            .execute_batch(
                "CREATE TABLE parent (id INTEGER PRIMARY KEY);
                 CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id));",
            )
            .await
            .unwrap();
        let err = driver
            .execute("INSERT INTO child (parent_id) VALUES (?)", &[SqlValue::Int64(99)])
            .await
            .unwrap_err();
        assert!(matches!(err, PropDbError::QueryFailed(_)));
    }
}

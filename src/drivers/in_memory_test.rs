use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

/// Which driver entry point a recorded call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Query,
    Execute,
    Batch,
}

/// A recorded query execution for verification.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub kind: CallKind,
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// An in-memory database driver for testing.
///
/// Allows configuring expected responses and verifying executed queries.
/// It reports the server dialect unless told otherwise, so statements
/// reach it exactly as the caller wrote them.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use propdb::drivers::{InMemoryTestDriver, InMemoryTestResponseBuilder};
/// use propdb::SqlValue;
///
/// let driver = Arc::new(
///     InMemoryTestDriver::new().with_response(
///         InMemoryTestResponseBuilder::new()
///             .columns(&["id", "email"])
///             .row(vec![SqlValue::Int64(1), "a@example.com".into()])
///             .build(),
///     ),
/// );
/// ```
pub struct InMemoryTestDriver {
    dialect: Dialect,
    responses: Mutex<VecDeque<RawQueryResult>>,
    recorded_queries: Mutex<Vec<RecordedQuery>>,
    default_response: RawQueryResult,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryTestDriver {
    /// Create a new in-memory test driver with no pre-configured responses.
    pub fn new() -> Self {
        Self {
            dialect: Dialect::Postgres,
            responses: Mutex::new(VecDeque::new()),
            recorded_queries: Mutex::new(Vec::new()),
            default_response: RawQueryResult::empty(),
        }
    }

    /// Report a different dialect to callers.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Add a response to be returned by the next call.
    /// Responses are returned in FIFO order.
    pub fn with_response(self, response: RawQueryResult) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    /// Add multiple responses to be returned by subsequent calls.
    pub fn with_responses(self, responses: impl IntoIterator<Item = RawQueryResult>) -> Self {
        lock(&self.responses).extend(responses);
        self
    }

    /// Set a default response to use when no queued responses remain.
    pub fn with_default_response(mut self, response: RawQueryResult) -> Self {
        self.default_response = response;
        self
    }

    /// Get all recorded queries that have been executed.
    pub fn recorded_queries(&self) -> Vec<RecordedQuery> {
        lock(&self.recorded_queries).clone()
    }

    /// Get the last recorded query, if any.
    pub fn last_query(&self) -> Option<RecordedQuery> {
        lock(&self.recorded_queries).last().cloned()
    }

    /// Clear all recorded queries.
    pub fn clear_recorded_queries(&self) {
        lock(&self.recorded_queries).clear();
    }

    /// Assert that the last query matches the expected SQL and parameters.
    pub fn assert_last_query(&self, expected_sql: &str, expected_params: &[SqlValue]) {
        let Some(last) = self.last_query() else {
            panic!("No queries were recorded");
        };
        assert_eq!(
            last.sql, expected_sql,
            "SQL mismatch.\nExpected: {}\nActual: {}",
            expected_sql, last.sql
        );
        assert_eq!(
            last.params, expected_params,
            "Parameters mismatch.\nExpected: {:?}\nActual: {:?}",
            expected_params, last.params
        );
    }

    /// Assert that exactly n queries were executed.
    pub fn assert_query_count(&self, expected: usize) {
        let actual = lock(&self.recorded_queries).len();
        assert_eq!(
            actual, expected,
            "Query count mismatch. Expected: {}, Actual: {}",
            expected, actual
        );
    }

    fn record(&self, kind: CallKind, sql: &str, params: &[SqlValue]) -> RawQueryResult {
        lock(&self.recorded_queries).push(RecordedQuery {
            kind,
            sql: sql.to_string(),
            params: params.to_vec(),
        });

        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| self.default_response.clone())
    }
}

impl Default for InMemoryTestDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseDriver for InMemoryTestDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        Ok(self.record(CallKind::Query, sql, params))
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        Ok(self.record(CallKind::Execute, sql, params))
    }

    async fn execute_batch(&self, sql: &str) -> Result<()> {
        self.record(CallKind::Batch, sql, &[]);
        Ok(())
    }

    async fn close(&self) {}
}

/// Builder for creating test responses easily.
pub struct InMemoryTestResponseBuilder {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    rows_affected: Option<u64>,
    last_insert_id: Option<i64>,
}

impl InMemoryTestResponseBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            rows_affected: None,
            last_insert_id: None,
        }
    }

    /// Set the column names for the response.
    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.columns = cols.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a row of values in column order.
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    pub fn rows_affected(mut self, n: u64) -> Self {
        self.rows_affected = Some(n);
        self
    }

    pub fn last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    /// Build the RawQueryResult.
    pub fn build(self) -> RawQueryResult {
        let mut result = RawQueryResult::new(self.columns, self.rows);
        result.rows_affected = self.rows_affected;
        result.last_insert_id = self.last_insert_id;
        result
    }
}

impl Default for InMemoryTestResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_queued_responses_in_order() {
        let driver = InMemoryTestDriver::new().with_responses([
            InMemoryTestResponseBuilder::new().rows_affected(1).build(),
            InMemoryTestResponseBuilder::new().rows_affected(2).build(),
        ]);

        let first = driver.execute("DELETE FROM a", &[]).await.unwrap();
        let second = driver.query("DELETE FROM b", &[]).await.unwrap();
        let third = driver.query("SELECT 1", &[]).await.unwrap();

        assert_eq!(first.rows_affected, Some(1));
        assert_eq!(second.rows_affected, Some(2));
        assert_eq!(third.rows_affected, None);
        driver.assert_query_count(3);
    }

    #[tokio::test]
    async fn test_records_call_kind() {
        let driver = InMemoryTestDriver::new().with_dialect(Dialect::Sqlite);
        assert_eq!(driver.dialect(), Dialect::Sqlite);

        driver.execute_batch("CREATE TABLE t (x INT)").await.unwrap();
        driver
            .execute("INSERT INTO t VALUES (?)", &[SqlValue::Int64(1)])
            .await
            .unwrap();

        let recorded = driver.recorded_queries();
        assert_eq!(recorded[0].kind, CallKind::Batch);
        assert_eq!(recorded[1].kind, CallKind::Execute);
        driver.assert_last_query("INSERT INTO t VALUES (?)", &[SqlValue::Int64(1)]);

        driver.clear_recorded_queries();
        assert!(driver.last_query().is_none());
    }
}

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::Result;
use crate::types::{RawQueryResult, SqlValue};

/// Trait for database driver implementations.
/// Drivers are responsible for:
/// - Owning the connection (or pool) to one backend
/// - Converting SqlValue parameters to native types
/// - Executing statements and converting results to RawQueryResult
///
/// Statements reach a driver already written in its own dialect.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// The SQL dialect this backend accepts.
    fn dialect(&self) -> Dialect;

    /// Run a statement that yields rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Run a statement for its side effects; reports affected rows and,
    /// where the backend tracks it, the last generated identifier.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult>;

    /// Run several unparameterized statements (DDL) in one call.
    async fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Release the underlying connection or handle.
    async fn close(&self);
}

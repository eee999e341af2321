use std::sync::Arc;

use tracing::info;

use crate::builders::Insert;
use crate::config::DatabaseConfig;
use crate::dialect::Dialect;
use crate::drivers::{SqliteDriver, TokioPostgresDriver};
use crate::error::Result;
use crate::executor::StatementExecutor;
use crate::schema;
use crate::traits::DatabaseDriver;
use crate::types::{ExecutionResult, QuerySpec, SqlValue};

/// Single entry point for persistence.
///
/// The backend is picked once from [`DatabaseConfig`] and stays fixed for
/// the life of the gateway. Pass the gateway (or a reference to it) to
/// whatever needs the database.
pub struct Gateway {
    executor: StatementExecutor,
}

impl Gateway {
    /// Open the backend named by `config`.
    ///
    /// Fails with `ConnectionFailed` when the server is unreachable and with
    /// `StorageUnavailable` when the database file cannot be opened.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let driver: Arc<dyn DatabaseDriver> = match config {
            DatabaseConfig::Server(server) => Arc::new(TokioPostgresDriver::connect(server).await?),
            DatabaseConfig::Embedded(embedded) => {
                Arc::new(SqliteDriver::open(&embedded.path).await?)
            }
        };
        Ok(Self::with_driver(driver))
    }

    /// Create a gateway over a custom driver.
    /// Useful for testing or using alternative database drivers.
    pub fn with_driver(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self {
            executor: StatementExecutor::new(driver),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.executor.driver().dialect()
    }

    pub async fn execute(&self, spec: &QuerySpec) -> Result<ExecutionResult> {
        self.executor.run(spec).await
    }

    /// Shorthand for [`Gateway::execute`] with an inline statement.
    pub async fn query(&self, text: &str, params: Vec<SqlValue>) -> Result<ExecutionResult> {
        self.execute(&QuerySpec::with_params(text, params)).await
    }

    /// Start an INSERT into `table`.
    pub fn insert_into(&self, table: &str) -> Insert {
        Insert::new(self.executor.clone(), table)
    }

    /// Create any missing tables for the active backend.
    pub async fn apply_schema(&self) -> Result<()> {
        let dialect = self.dialect();
        self.executor
            .driver()
            .execute_batch(schema::ddl(dialect))
            .await?;
        info!(%dialect, tables = schema::TABLES.len(), "Schema applied");
        Ok(())
    }

    /// Release the connection pool or file handle.
    pub async fn close(self) {
        self.executor.driver().close().await;
    }
}

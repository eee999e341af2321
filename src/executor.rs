use std::sync::Arc;

use tracing::{debug, warn};

use crate::dialect::{self, ReturningClause};
use crate::error::Result;
use crate::traits::DatabaseDriver;
use crate::types::{Command, ExecutionResult, QuerySpec, RawQueryResult, SqlValue};

/// Runs statements against one driver and normalizes what comes back into
/// an [`ExecutionResult`], so callers never branch on the backend.
///
/// Statements are written in the server dialect. They reach a native
/// driver untouched; anything else goes through [`dialect::translate`]
/// first.
#[derive(Clone)]
pub struct StatementExecutor {
    driver: Arc<dyn DatabaseDriver>,
}

impl StatementExecutor {
    pub fn new(driver: Arc<dyn DatabaseDriver>) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &Arc<dyn DatabaseDriver> {
        &self.driver
    }

    pub async fn run(&self, spec: &QuerySpec) -> Result<ExecutionResult> {
        let command = Command::classify(&spec.text)?;
        let dialect = self.driver.dialect();
        debug!(%command, %dialect, sql = %spec.text, "executing statement");

        if dialect.is_native() {
            return self.run_native(command, spec).await;
        }

        let translated = dialect::translate(spec, dialect)?;
        debug!(sql = %translated.text, "translated statement");

        match (command, translated.returning) {
            (Command::Select, _) => {
                let raw = self
                    .driver
                    .query(&translated.text, &translated.parameters)
                    .await?;
                Ok(select_result(raw))
            }
            (_, None) => {
                let raw = self
                    .driver
                    .execute(&translated.text, &translated.parameters)
                    .await?;
                Ok(mutation_result(command, raw))
            }
            (Command::Insert, Some(returning)) => {
                self.insert_returning(&translated.text, &translated.parameters, &returning)
                    .await
            }
            (_, Some(_)) => {
                let raw = self
                    .driver
                    .execute(&translated.text, &translated.parameters)
                    .await?;
                warn!(
                    %command,
                    %dialect,
                    "RETURNING is not supported here; returning no rows"
                );
                Ok(mutation_result(command, raw))
            }
        }
    }

    async fn run_native(&self, command: Command, spec: &QuerySpec) -> Result<ExecutionResult> {
        let raw = self.driver.query(&spec.text, &spec.parameters).await?;
        if command == Command::Select {
            return Ok(select_result(raw));
        }

        let affected = raw.rows_affected;
        let rows = raw.into_rows();
        let inserted_id = match command {
            Command::Insert => rows
                .first()
                .and_then(|row| row.get("id").ok())
                .and_then(SqlValue::as_i64),
            _ => None,
        };
        Ok(ExecutionResult {
            row_count: affected.unwrap_or(rows.len() as u64),
            rows,
            command,
            inserted_id,
        })
    }

    /// Runs the INSERT alone, then reads the new row back by its rowid.
    async fn insert_returning(
        &self,
        sql: &str,
        params: &[SqlValue],
        returning: &ReturningClause,
    ) -> Result<ExecutionResult> {
        let done = self.driver.execute(sql, params).await?;
        let inserted_id = new_row_id(&done);

        let rows = match (&returning.table, inserted_id) {
            (Some(table), Some(id)) => {
                let lookup = format!(
                    "SELECT {} FROM {} WHERE rowid = ?",
                    returning.columns, table
                );
                self.driver
                    .query(&lookup, &[SqlValue::Int64(id)])
                    .await?
                    .into_rows()
            }
            _ => Vec::new(),
        };

        Ok(ExecutionResult {
            row_count: rows.len() as u64,
            rows,
            command: Command::Insert,
            inserted_id,
        })
    }
}

fn select_result(raw: RawQueryResult) -> ExecutionResult {
    let rows = raw.into_rows();
    ExecutionResult {
        row_count: rows.len() as u64,
        rows,
        command: Command::Select,
        inserted_id: None,
    }
}

fn mutation_result(command: Command, raw: RawQueryResult) -> ExecutionResult {
    let inserted_id = match command {
        Command::Insert => new_row_id(&raw),
        _ => None,
    };
    ExecutionResult {
        row_count: raw.rows_affected.unwrap_or(0),
        rows: Vec::new(),
        command,
        inserted_id,
    }
}

/// The connection's last rowid belongs to this statement only if it wrote
/// something; `ON CONFLICT DO NOTHING` or an empty `INSERT ... SELECT` leaves
/// it pointing at an older row.
fn new_row_id(raw: &RawQueryResult) -> Option<i64> {
    match raw.rows_affected {
        Some(0) => None,
        _ => raw.last_insert_id,
    }
}

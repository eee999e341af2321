use crate::error::Result;
use crate::executor::StatementExecutor;
use crate::types::{ExecutionResult, QuerySpec, SqlValue};

/// Entry point for building an INSERT statement.
/// Must call `.value()` at least once to proceed.
pub struct Insert {
    executor: StatementExecutor,
    table: String,
}

impl Insert {
    pub(crate) fn new(executor: StatementExecutor, table: impl Into<String>) -> Self {
        Self {
            executor,
            table: table.into(),
        }
    }

    /// Set the first column value.
    pub fn value(self, column: &str, value: impl Into<SqlValue>) -> InsertWithValues {
        InsertWithValues {
            executor: self.executor,
            table: self.table,
            columns: vec![column.to_string()],
            values: vec![value.into()],
            returning: None,
        }
    }
}

/// INSERT builder after at least one column has been set.
/// Can add more columns, a RETURNING list, or execute directly.
pub struct InsertWithValues {
    executor: StatementExecutor,
    table: String,
    columns: Vec<String>,
    values: Vec<SqlValue>,
    returning: Option<String>,
}

impl InsertWithValues {
    pub fn value(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    /// Ask for columns of the new row back, e.g. `"id, email"`.
    pub fn returning(mut self, columns: &str) -> Self {
        self.returning = Some(columns.to_string());
        self
    }

    /// Build the statement in the server dialect.
    pub fn build(&self) -> QuerySpec {
        let mut sql = String::with_capacity(128);

        sql.push_str("INSERT INTO ");
        sql.push_str(&self.table);

        sql.push_str(" (");
        sql.push_str(&self.columns.join(", "));
        sql.push_str(") VALUES (");
        for i in 1..=self.values.len() {
            if i > 1 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&i.to_string());
        }
        sql.push(')');

        if let Some(ref returning) = self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(returning);
        }

        QuerySpec::with_params(sql, self.values.clone())
    }

    /// Execute the insert and return the result.
    pub async fn execute(self) -> Result<ExecutionResult> {
        let spec = self.build();
        self.executor.run(&spec).await
    }
}

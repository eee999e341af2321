use std::sync::Arc;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::{PropDbError, Result};
use crate::types::{Command, SqlValue};

/// Driver-agnostic raw result from a database call.
#[derive(Debug, Clone, Default)]
pub struct RawQueryResult {
    /// Column names in order
    pub columns: Vec<String>,
    /// Rows, where each row is a vector of values in column order
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows touched by a mutation, when the backend reports it
    pub rows_affected: Option<u64>,
    /// Identifier generated by the last insert, when the backend reports it
    pub last_insert_id: Option<i64>,
}

impl RawQueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<SqlValue>>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: None,
            last_insert_id: None,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn mutation(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected: Some(rows_affected),
            last_insert_id,
            ..Self::default()
        }
    }

    /// Split into rows that share one column list.
    pub fn into_rows(self) -> Vec<Row> {
        let columns: Arc<[String]> = self.columns.into();
        self.rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect()
    }
}

/// A single record from a result set.
/// Values are accessed by column name.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Gets a value by column name.
    pub fn get(&self, column: &str) -> Result<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| PropDbError::ColumnNotFound(column.to_string()))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        self.get(column)?
            .as_i64()
            .ok_or_else(|| type_mismatch(column, "an integer"))
    }

    pub fn get_f64(&self, column: &str) -> Result<f64> {
        self.get(column)?
            .as_f64()
            .ok_or_else(|| type_mismatch(column, "a number"))
    }

    pub fn get_str(&self, column: &str) -> Result<&str> {
        self.get(column)?
            .as_str()
            .ok_or_else(|| type_mismatch(column, "text"))
    }

    /// Returns all column names in this row, in result order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn type_mismatch(column: &str, expected: &'static str) -> PropDbError {
    PropDbError::TypeMismatch {
        column: column.to_string(),
        expected,
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Engine-agnostic outcome of one statement.
/// Every backend produces this same shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub rows: Vec<Row>,
    pub row_count: u64,
    pub command: Command,
    pub inserted_id: Option<i64>,
}

impl ExecutionResult {
    /// Extracts a single row from the result.
    /// Returns an error if the result contains zero or more than one row.
    pub fn single_row(self) -> Result<Row> {
        if self.rows.len() != 1 {
            return Err(PropDbError::UnexpectedRowCount {
                expected: 1,
                actual: self.rows.len(),
            });
        }
        self.rows
            .into_iter()
            .next()
            .ok_or(PropDbError::UnexpectedRowCount {
                expected: 1,
                actual: 0,
            })
    }

    /// Returns the first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Returns all rows from the result.
    pub fn rows(self) -> Vec<Row> {
        self.rows
    }

    /// Returns the number of rows in this result set.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this result set contains no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

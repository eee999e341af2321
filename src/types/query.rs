use std::fmt;

use serde::Serialize;

use crate::error::{PropDbError, Result};
use crate::types::SqlValue;

/// A statement written in the server dialect (`$1, $2, …` placeholders)
/// together with its ordered parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub text: String,
    pub parameters: Vec<SqlValue>,
}

impl QuerySpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_params(text: impl Into<String>, parameters: Vec<SqlValue>) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }

    /// Append the value for the next placeholder.
    pub fn bind<V: Into<SqlValue>>(mut self, value: V) -> Self {
        self.parameters.push(value.into());
        self
    }
}

/// Statement kind, decided by the leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Command {
    Select,
    Insert,
    Update,
    Delete,
}

impl Command {
    /// Classify a statement by its leading keyword (case-insensitive, whitespace-trimmed).
    /// `WITH` queries are treated as reads.
    pub fn classify(sql: &str) -> Result<Command> {
        let keyword: String = sql
            .trim_start()
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();

        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => Ok(Command::Select),
            "INSERT" => Ok(Command::Insert),
            "UPDATE" => Ok(Command::Update),
            "DELETE" => Ok(Command::Delete),
            _ => Err(PropDbError::UnsupportedStatement(format!(
                "leading keyword '{}' is not SELECT, INSERT, UPDATE or DELETE",
                keyword
            ))),
        }
    }

    pub fn is_mutation(self) -> bool {
        !matches!(self, Command::Select)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Select => "SELECT",
            Command::Insert => "INSERT",
            Command::Update => "UPDATE",
            Command::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_leading_keyword() {
        assert_eq!(Command::classify("SELECT 1").unwrap(), Command::Select);
        assert_eq!(
            Command::classify("\n   select * from t").unwrap(),
            Command::Select
        );
        assert_eq!(
            Command::classify("WITH x AS (SELECT 1) SELECT * FROM x").unwrap(),
            Command::Select
        );
        assert_eq!(
            Command::classify("insert into t (a) values ($1)").unwrap(),
            Command::Insert
        );
        assert_eq!(Command::classify("Update t SET a = 1").unwrap(), Command::Update);
        assert_eq!(Command::classify("  DELETE FROM t").unwrap(), Command::Delete);
    }

    #[test]
    fn test_classify_rejects_other_statements() {
        let err = Command::classify("CREATE TABLE t (id INTEGER)").unwrap_err();
        assert!(matches!(err, PropDbError::UnsupportedStatement(_)));
        assert!(Command::classify("").is_err());
    }

    #[test]
    fn test_query_spec_bind_order() {
        let spec = QuerySpec::new("SELECT * FROM t WHERE a = $1 AND b = $2")
            .bind("x")
            .bind(7);
        assert_eq!(
            spec.parameters,
            vec![SqlValue::Text("x".to_string()), SqlValue::Int64(7)]
        );
    }
}

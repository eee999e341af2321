mod query;
mod row;
mod sql_value;

pub use query::{Command, QuerySpec};
pub use row::{ExecutionResult, RawQueryResult, Row};
pub use sql_value::SqlValue;

//! Table definitions for the property-management data model.
//!
//! Both scripts are idempotent (`IF NOT EXISTS` throughout) and declare the
//! same tables, foreign keys and CHECK constraints.

use crate::dialect::Dialect;

const SQLITE: &str = include_str!("sqlite.sql");
const POSTGRES: &str = include_str!("postgres.sql");

/// Tables created by [`ddl`], parents before children.
pub const TABLES: [&str; 6] = [
    "properties",
    "units",
    "tenants",
    "leases",
    "invoices",
    "payments",
];

/// The DDL script written for `dialect`.
pub fn ddl(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => POSTGRES,
        Dialect::Sqlite => SQLITE,
    }
}

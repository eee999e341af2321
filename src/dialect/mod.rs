//! Dialect translation between the server engine (PostgreSQL) and the
//! embedded engine (SQLite).
//!
//! Application code writes every statement in the PostgreSQL dialect:
//! `$n` placeholders, `ILIKE`, `COUNT(…) FILTER (WHERE …)`,
//! `DATE_TRUNC('month', …)`, `NOW()`, `::type` casts and `RETURNING`.
//! [`translate`] parses such a statement into a small AST and renders it
//! for the target dialect:
//!
//! | PostgreSQL | SQLite |
//! |------------|--------|
//! | `$2 … $1 … $2` | `? … ? … ?` with parameters reordered to match |
//! | `ILIKE` | `LIKE` |
//! | `COUNT(*) FILTER (WHERE c)` | `SUM(CASE WHEN c THEN 1 ELSE 0 END)` |
//! | `COUNT(e) FILTER (WHERE c)` | `SUM(CASE WHEN (c) AND (e) IS NOT NULL THEN 1 ELSE 0 END)` |
//! | `DATE_TRUNC('month', e)` | `strftime('%Y-%m', e)` |
//! | `NOW()` | `CURRENT_TIMESTAMP` |
//! | `e::numeric` | `CAST(e AS REAL)` |
//! | `… RETURNING cols` | split off into [`ReturningClause`] |
//!
//! Constructs outside this subset fail with a [`TranslationError`] instead
//! of producing SQL the target would misread.

mod lexer;
mod parser;
mod render;

use std::fmt;

use thiserror::Error;

use crate::types::{QuerySpec, SqlValue};

/// SQL dialect spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Server engine; the dialect statements are written in.
    Postgres,
    /// Embedded engine.
    Sqlite,
}

impl Dialect {
    /// True when statements run as written, without translation.
    pub fn is_native(self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Whether `INSERT/UPDATE/DELETE … RETURNING` is accepted as-is.
    pub fn supports_returning(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => f.write_str("postgres"),
            Dialect::Sqlite => f.write_str("sqlite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    #[error("unbalanced parentheses at byte {offset}")]
    UnbalancedParentheses { offset: usize },

    #[error("unterminated quoted text or comment starting at byte {offset}")]
    UnterminatedLiteral { offset: usize },

    #[error("invalid placeholder {placeholder} at byte {offset}")]
    InvalidPlaceholder { placeholder: String, offset: usize },

    #[error("placeholder ${index} has no bound parameter ({supplied} supplied)")]
    MissingParameter { index: usize, supplied: usize },

    #[error("malformed FILTER clause at byte {offset}: {reason}")]
    MalformedFilter { offset: usize, reason: &'static str },

    #[error("unsupported construct at byte {offset}: {construct}")]
    Unsupported { construct: String, offset: usize },

    #[error("RETURNING requires INSERT INTO <table> to locate the inserted row")]
    ReturningTargetUnknown,

    #[error("placeholder inside RETURNING at byte {offset}")]
    PlaceholderInReturning { offset: usize },
}

/// A `RETURNING` clause lifted off a statement for a dialect that cannot run it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturningClause {
    /// Column list as written for the target dialect, e.g. `id, email` or `*`.
    pub columns: String,
    /// Table named by `INSERT INTO`; `None` for UPDATE and DELETE.
    pub table: Option<String>,
}

/// A statement rewritten for a target dialect.
///
/// `parameters` lines up one-to-one with the `?` markers in `text`.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    pub text: String,
    pub parameters: Vec<SqlValue>,
    pub returning: Option<ReturningClause>,
}

/// Rewrite a PostgreSQL-dialect statement for `target`.
pub fn translate(spec: &QuerySpec, target: Dialect) -> Result<TranslationResult, TranslationError> {
    let statement = parser::parse(&spec.text)?;
    render::render(&statement, target, &spec.parameters)
}

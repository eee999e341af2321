//! Code generation from the statement AST, one output form per dialect.

use super::lexer::Token;
use super::parser::{CountTarget, Node, Statement};
use super::{Dialect, ReturningClause, TranslationError, TranslationResult};
use crate::types::SqlValue;

pub fn render(
    stmt: &Statement,
    dialect: Dialect,
    params: &[SqlValue],
) -> Result<TranslationResult, TranslationError> {
    let mut body = Generator::new(dialect, params);
    body.nodes(&stmt.body)?;

    let returning = match &stmt.returning {
        None => None,
        Some(returning) => {
            let mut columns = Generator::new(dialect, params);
            columns.nodes(&returning.columns)?;
            match dialect {
                Dialect::Postgres => {
                    body.push(" RETURNING ");
                    body.push(&columns.sql);
                    None
                }
                Dialect::Sqlite => Some(ReturningClause {
                    columns: columns.sql,
                    table: returning.table.clone(),
                }),
            }
        }
    };

    let parameters = match dialect {
        Dialect::Postgres => params.to_vec(),
        Dialect::Sqlite => body.params,
    };

    Ok(TranslationResult {
        text: body.sql,
        parameters,
        returning,
    })
}

struct Generator<'a> {
    dialect: Dialect,
    source: &'a [SqlValue],
    sql: String,
    /// Parameters in the order their `?` markers were written.
    params: Vec<SqlValue>,
}

impl<'a> Generator<'a> {
    fn new(dialect: Dialect, source: &'a [SqlValue]) -> Self {
        Self {
            dialect,
            source,
            sql: String::with_capacity(256),
            params: Vec::with_capacity(source.len()),
        }
    }

    fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    fn nodes(&mut self, nodes: &[Node]) -> Result<(), TranslationError> {
        for node in nodes {
            self.node(node)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &Node) -> Result<(), TranslationError> {
        match node {
            Node::Token(_, Token::Placeholder(index)) => self.placeholder(*index)?,
            Node::Token(_, token) => self.push(&token.text()),
            Node::Group(_, children) => {
                self.push("(");
                self.nodes(children)?;
                self.push(")");
            }
            Node::ILike => match self.dialect {
                Dialect::Postgres => self.push("ILIKE"),
                Dialect::Sqlite => self.push("LIKE"),
            },
            Node::Now => match self.dialect {
                Dialect::Postgres => self.push("NOW()"),
                Dialect::Sqlite => self.push("CURRENT_TIMESTAMP"),
            },
            Node::DateTruncMonth(expr) => {
                match self.dialect {
                    Dialect::Postgres => self.push("DATE_TRUNC('month', "),
                    Dialect::Sqlite => self.push("strftime('%Y-%m', "),
                }
                self.nodes(expr)?;
                self.push(")");
            }
            Node::FilteredCount { target, condition } => self.filtered_count(target, condition)?,
            Node::Cast { expr, ty, offset } => match self.dialect {
                Dialect::Postgres => {
                    self.nodes(expr)?;
                    self.push("::");
                    self.push(ty);
                }
                Dialect::Sqlite => {
                    let affinity = sqlite_affinity(ty).ok_or_else(|| TranslationError::Unsupported {
                        construct: format!("cast to {}", ty),
                        offset: *offset,
                    })?;
                    self.push("CAST(");
                    self.nodes(expr)?;
                    self.push(" AS ");
                    self.push(affinity);
                    self.push(")");
                }
            },
        }
        Ok(())
    }

    fn placeholder(&mut self, index: usize) -> Result<(), TranslationError> {
        match self.dialect {
            Dialect::Postgres => self.push(&format!("${}", index)),
            Dialect::Sqlite => {
                let value = self
                    .source
                    .get(index - 1)
                    .ok_or(TranslationError::MissingParameter {
                        index,
                        supplied: self.source.len(),
                    })?;
                self.params.push(value.clone());
                self.push("?");
            }
        }
        Ok(())
    }

    fn filtered_count(
        &mut self,
        target: &CountTarget,
        condition: &[Node],
    ) -> Result<(), TranslationError> {
        match (self.dialect, target) {
            (Dialect::Postgres, CountTarget::Star) => {
                self.push("COUNT(*) FILTER (WHERE ");
                self.nodes(condition)?;
                self.push(")");
            }
            (Dialect::Postgres, CountTarget::Expr(expr)) => {
                self.push("COUNT(");
                self.nodes(expr)?;
                self.push(") FILTER (WHERE ");
                self.nodes(condition)?;
                self.push(")");
            }
            (Dialect::Sqlite, CountTarget::Star) => {
                self.push("SUM(CASE WHEN ");
                self.nodes(condition)?;
                self.push(" THEN 1 ELSE 0 END)");
            }
            // Only rows where expr is non-null count, as COUNT(expr) would.
            (Dialect::Sqlite, CountTarget::Expr(expr)) => {
                self.push("SUM(CASE WHEN (");
                self.nodes(condition)?;
                self.push(") AND (");
                self.nodes(expr)?;
                self.push(") IS NOT NULL THEN 1 ELSE 0 END)");
            }
        }
        Ok(())
    }
}

fn sqlite_affinity(ty: &str) -> Option<&'static str> {
    match ty.to_ascii_lowercase().as_str() {
        "numeric" | "decimal" | "real" | "float" | "float4" | "float8" | "double precision" => {
            Some("REAL")
        }
        "int" | "integer" | "int2" | "int4" | "int8" | "smallint" | "bigint" | "bool"
        | "boolean" => Some("INTEGER"),
        "text" | "varchar" | "char" | "character" | "bpchar" => Some("TEXT"),
        _ => None,
    }
}

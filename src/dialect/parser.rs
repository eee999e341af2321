//! Statement AST for the supported server-dialect subset.
//!
//! Parsing happens in two passes: tokens are first nested into
//! parenthesised groups (which is where unbalanced input is caught), then
//! each group is scanned for the constructs that differ between dialects.
//! Everything else stays as verbatim tokens.

use super::lexer::{tokenize, Token};
use super::TranslationError;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A verbatim token and its byte offset.
    Token(usize, Token),
    /// `( … )`, offset of the opening parenthesis.
    Group(usize, Vec<Node>),
    /// `COUNT(target) FILTER (WHERE condition)`
    FilteredCount {
        target: CountTarget,
        condition: Vec<Node>,
    },
    /// `DATE_TRUNC('month', expr)`
    DateTruncMonth(Vec<Node>),
    /// `NOW()`
    Now,
    /// `ILIKE`
    ILike,
    /// `expr::ty`
    Cast {
        expr: Vec<Node>,
        ty: String,
        offset: usize,
    },
}

impl Node {
    fn is_trivia(&self) -> bool {
        matches!(self, Node::Token(_, t) if t.is_trivia())
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Node::Token(_, t) if t.is_keyword(keyword))
    }

    fn offset(&self) -> Option<usize> {
        match self {
            Node::Token(offset, _) | Node::Group(offset, _) => Some(*offset),
            Node::Cast { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CountTarget {
    Star,
    Expr(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Returning {
    pub columns: Vec<Node>,
    /// Target table; only inferred for INSERT.
    pub table: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub body: Vec<Node>,
    pub returning: Option<Returning>,
}

pub fn parse(sql: &str) -> Result<Statement, TranslationError> {
    let mut nodes = nest(tokenize(sql)?)?;

    let returning = match nodes.iter().position(|n| n.is_keyword("RETURNING")) {
        Some(at) => {
            let offset = nodes[at].offset().unwrap_or_default();
            let tail = nodes.split_off(at + 1);
            nodes.truncate(at);
            Some((offset, tail))
        }
        None => None,
    };

    let body = recognize(trim(nodes))?;

    let returning = match returning {
        Some((offset, tail)) => {
            let columns = returning_columns(tail, offset)?;
            let table = if first_keyword_is(&body, "INSERT") {
                Some(insert_target(&body).ok_or(TranslationError::ReturningTargetUnknown)?)
            } else {
                None
            };
            Some(Returning { columns, table })
        }
        None => None,
    };

    Ok(Statement { body, returning })
}

/// Fold the flat token list into nested groups.
fn nest(tokens: Vec<(usize, Token)>) -> Result<Vec<Node>, TranslationError> {
    let mut stack: Vec<(usize, Vec<Node>)> = Vec::new();
    let mut current = Vec::new();

    for (offset, token) in tokens {
        match token {
            Token::LParen => stack.push((offset, std::mem::take(&mut current))),
            Token::RParen => {
                let (open, mut parent) = stack
                    .pop()
                    .ok_or(TranslationError::UnbalancedParentheses { offset })?;
                parent.push(Node::Group(open, std::mem::take(&mut current)));
                current = parent;
            }
            other => current.push(Node::Token(offset, other)),
        }
    }

    if let Some((offset, _)) = stack.pop() {
        return Err(TranslationError::UnbalancedParentheses { offset });
    }
    Ok(current)
}

fn recognize(nodes: Vec<Node>) -> Result<Vec<Node>, TranslationError> {
    let mut nodes: Vec<Option<Node>> = nodes.into_iter().map(Some).collect();
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut i = 0;

    while i < nodes.len() {
        let Some(node) = nodes[i].take() else {
            i += 1;
            continue;
        };

        match node {
            Node::Group(offset, children) => out.push(Node::Group(offset, recognize(children)?)),
            Node::Token(offset, token) => {
                if token.is_keyword("COUNT") {
                    if let Some((target, condition, next)) = filtered_count(&mut nodes, i + 1)? {
                        out.push(Node::FilteredCount { target, condition });
                        i = next;
                        continue;
                    }
                } else if token.is_keyword("FILTER") && group_follows(&nodes, i + 1) {
                    return Err(TranslationError::Unsupported {
                        construct: "FILTER on an aggregate other than COUNT".to_string(),
                        offset,
                    });
                } else if token.is_keyword("DATE_TRUNC") {
                    if let Some(at) = next_significant(&nodes, i + 1).filter(|&at| group_at(&nodes, at))
                    {
                        if let Some(Node::Group(group_offset, args)) = nodes[at].take() {
                            out.push(date_trunc(args, group_offset)?);
                            i = at + 1;
                            continue;
                        }
                    }
                } else if token.is_keyword("NOW") {
                    if let Some(at) = next_significant(&nodes, i + 1) {
                        if matches!(&nodes[at], Some(Node::Group(_, args)) if args.iter().all(Node::is_trivia)) {
                            out.push(Node::Now);
                            i = at + 1;
                            continue;
                        }
                    }
                } else if token.is_keyword("ILIKE") {
                    out.push(Node::ILike);
                    i += 1;
                    continue;
                } else if token.is_keyword("RETURNING") {
                    return Err(TranslationError::Unsupported {
                        construct: "RETURNING inside a subquery".to_string(),
                        offset,
                    });
                } else if matches!(&token, Token::Symbol(s) if s == "::") {
                    let expr = take_operand(&mut out).ok_or_else(|| TranslationError::Unsupported {
                        construct: "cast without an operand".to_string(),
                        offset,
                    })?;
                    let (ty, next) = cast_type(&mut nodes, i + 1, offset)?;
                    out.push(Node::Cast { expr, ty, offset });
                    i = next;
                    continue;
                }
                out.push(Node::Token(offset, token));
            }
            other => out.push(other),
        }
        i += 1;
    }

    Ok(out)
}

/// Matches `(args) FILTER (WHERE cond)` after a COUNT keyword. Returns
/// `None` for a plain COUNT so it is emitted verbatim.
fn filtered_count(
    nodes: &mut [Option<Node>],
    from: usize,
) -> Result<Option<(CountTarget, Vec<Node>, usize)>, TranslationError> {
    let Some(args_at) = next_significant(nodes, from).filter(|&at| group_at(nodes, at)) else {
        return Ok(None);
    };
    let Some(filter_at) = next_significant(nodes, args_at + 1)
        .filter(|&at| matches!(&nodes[at], Some(n) if n.is_keyword("FILTER")))
    else {
        return Ok(None);
    };
    let filter_offset = nodes[filter_at]
        .as_ref()
        .and_then(Node::offset)
        .unwrap_or_default();

    let cond_at = next_significant(nodes, filter_at + 1)
        .filter(|&at| group_at(nodes, at))
        .ok_or(TranslationError::MalformedFilter {
            offset: filter_offset,
            reason: "FILTER must be followed by (WHERE …)",
        })?;

    let Some(Node::Group(_, args)) = nodes[args_at].take() else {
        return Ok(None);
    };
    let Some(Node::Group(_, cond)) = nodes[cond_at].take() else {
        return Ok(None);
    };

    let mut cond = trim(cond);
    if !cond.first().is_some_and(|n| n.is_keyword("WHERE")) {
        return Err(TranslationError::MalformedFilter {
            offset: filter_offset,
            reason: "FILTER clause must start with WHERE",
        });
    }
    let condition = trim(cond.split_off(1));
    if condition.is_empty() {
        return Err(TranslationError::MalformedFilter {
            offset: filter_offset,
            reason: "FILTER (WHERE …) has an empty condition",
        });
    }

    let args = trim(args);
    let target = match args.as_slice() {
        [] => {
            return Err(TranslationError::MalformedFilter {
                offset: filter_offset,
                reason: "COUNT() has no argument",
            })
        }
        [Node::Token(_, Token::Symbol(s))] if s == "*" => CountTarget::Star,
        [first, ..] if first.is_keyword("DISTINCT") => {
            return Err(TranslationError::Unsupported {
                construct: "COUNT(DISTINCT …) FILTER".to_string(),
                offset: filter_offset,
            })
        }
        _ => CountTarget::Expr(recognize(args)?),
    };

    Ok(Some((target, recognize(condition)?, cond_at + 1)))
}

fn date_trunc(args: Vec<Node>, offset: usize) -> Result<Node, TranslationError> {
    let mut parts = split_commas(args);
    if parts.len() != 2 {
        return Err(TranslationError::Unsupported {
            construct: "DATE_TRUNC with other than two arguments".to_string(),
            offset,
        });
    }
    let expr = trim(parts.pop().unwrap_or_default());
    let unit = trim(parts.pop().unwrap_or_default());

    match unit.as_slice() {
        [Node::Token(_, Token::Literal(lit))] if lit.eq_ignore_ascii_case("'month'") => {
            Ok(Node::DateTruncMonth(recognize(expr)?))
        }
        _ => Err(TranslationError::Unsupported {
            construct: format!("DATE_TRUNC unit {}", render_verbatim(&unit)),
            offset,
        }),
    }
}

/// Reads the type name after `::`, including `double precision` and an
/// optional `(precision, scale)` group, which is dropped.
fn cast_type(
    nodes: &mut [Option<Node>],
    from: usize,
    offset: usize,
) -> Result<(String, usize), TranslationError> {
    let missing = || TranslationError::Unsupported {
        construct: "cast without a type name".to_string(),
        offset,
    };
    let at = next_significant(nodes, from).ok_or_else(missing)?;
    let Some(Node::Token(_, Token::Word(mut ty))) = nodes[at].take() else {
        return Err(missing());
    };
    let mut next = at + 1;

    if ty.eq_ignore_ascii_case("double") {
        if let Some(p) = next_significant(nodes, next) {
            if matches!(&nodes[p], Some(n) if n.is_keyword("PRECISION")) {
                nodes[p] = None;
                ty.push_str(" precision");
                next = p + 1;
            }
        }
    }
    if next < nodes.len() && group_at(nodes, next) {
        nodes[next] = None;
        next += 1;
    }
    Ok((ty, next))
}

/// Pops the operand a postfix `::` applies to: a literal, a (qualified)
/// identifier, a group, or a function call.
fn take_operand(out: &mut Vec<Node>) -> Option<Vec<Node>> {
    while out.last().is_some_and(Node::is_trivia) {
        out.pop();
    }
    let last = out.pop()?;
    let mut operand = vec![last];

    match &operand[0] {
        Node::Group(..) => {
            let is_call = matches!(
                out.last(),
                Some(Node::Token(_, Token::Word(w))) if !is_reserved(w)
            );
            if is_call {
                operand.insert(0, out.pop()?);
            }
        }
        Node::Token(_, Token::Word(_)) | Node::Token(_, Token::QuotedIdent(_)) => {
            while out.len() >= 2
                && matches!(out.last(), Some(Node::Token(_, Token::Symbol(s))) if s == ".")
                && matches!(
                    &out[out.len() - 2],
                    Node::Token(_, Token::Word(_)) | Node::Token(_, Token::QuotedIdent(_))
                )
            {
                let dot = out.pop()?;
                let ident = out.pop()?;
                operand.insert(0, dot);
                operand.insert(0, ident);
            }
        }
        _ => {}
    }
    Some(operand)
}

fn is_reserved(word: &str) -> bool {
    const RESERVED: [&str; 12] = [
        "IN", "AND", "OR", "NOT", "WHERE", "SELECT", "ON", "VALUES", "EXISTS", "ANY", "ALL",
        "AS",
    ];
    RESERVED.iter().any(|k| word.eq_ignore_ascii_case(k))
}

fn returning_columns(tail: Vec<Node>, offset: usize) -> Result<Vec<Node>, TranslationError> {
    let mut columns = trim(tail);
    while columns
        .last()
        .is_some_and(|n| matches!(n, Node::Token(_, Token::Symbol(s)) if s == ";") || n.is_trivia())
    {
        columns.pop();
    }
    if columns.is_empty() {
        return Err(TranslationError::Unsupported {
            construct: "RETURNING without columns".to_string(),
            offset,
        });
    }
    if let Some(at) = find_placeholder(&columns) {
        return Err(TranslationError::PlaceholderInReturning { offset: at });
    }
    recognize(columns)
}

fn find_placeholder(nodes: &[Node]) -> Option<usize> {
    nodes.iter().find_map(|n| match n {
        Node::Token(offset, Token::Placeholder(_)) => Some(*offset),
        Node::Group(_, children) => find_placeholder(children),
        _ => None,
    })
}

fn first_keyword_is(body: &[Node], keyword: &str) -> bool {
    body.iter()
        .find(|n| !n.is_trivia())
        .is_some_and(|n| n.is_keyword(keyword))
}

/// `INSERT INTO <table>` → table name, schema-qualified if written so.
fn insert_target(body: &[Node]) -> Option<String> {
    let mut significant = body.iter().filter(|n| !n.is_trivia());
    significant.next().filter(|n| n.is_keyword("INSERT"))?;
    significant.next().filter(|n| n.is_keyword("INTO"))?;

    let mut table = String::new();
    let mut expect_name = true;
    for node in significant {
        match node {
            Node::Token(_, Token::Word(w)) | Node::Token(_, Token::QuotedIdent(w))
                if expect_name =>
            {
                table.push_str(w);
                expect_name = false;
            }
            Node::Token(_, Token::Symbol(s)) if s == "." && !expect_name => {
                table.push('.');
                expect_name = true;
            }
            _ => break,
        }
    }
    (!table.is_empty() && !expect_name).then_some(table)
}

fn group_follows(nodes: &[Option<Node>], from: usize) -> bool {
    next_significant(nodes, from).is_some_and(|at| group_at(nodes, at))
}

fn group_at(nodes: &[Option<Node>], at: usize) -> bool {
    matches!(nodes.get(at), Some(Some(Node::Group(..))))
}

fn next_significant(nodes: &[Option<Node>], from: usize) -> Option<usize> {
    (from..nodes.len()).find(|&i| matches!(&nodes[i], Some(n) if !n.is_trivia()))
}

fn trim(mut nodes: Vec<Node>) -> Vec<Node> {
    while nodes.last().is_some_and(Node::is_trivia) {
        nodes.pop();
    }
    let lead = nodes.iter().take_while(|n| n.is_trivia()).count();
    nodes.split_off(lead)
}

fn split_commas(nodes: Vec<Node>) -> Vec<Vec<Node>> {
    let mut parts = vec![Vec::new()];
    for node in nodes {
        match node {
            Node::Token(_, Token::Comma) => parts.push(Vec::new()),
            other => {
                if let Some(part) = parts.last_mut() {
                    part.push(other);
                }
            }
        }
    }
    parts
}

fn render_verbatim(nodes: &[Node]) -> String {
    nodes
        .iter()
        .map(|n| match n {
            Node::Token(_, t) => t.text(),
            Node::Group(_, children) => format!("({})", render_verbatim(children)),
            _ => String::new(),
        })
        .collect()
}

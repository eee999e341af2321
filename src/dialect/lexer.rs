//! Tokenizer for the server-dialect SQL subset.
//!
//! Literals, quoted identifiers and comments come out as single opaque
//! tokens, so nothing inside them is ever rewritten.

use super::TranslationError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or bare identifier.
    Word(String),
    /// `"identifier"`, kept verbatim with its quotes.
    QuotedIdent(String),
    /// `'text'`, kept verbatim with its quotes.
    Literal(String),
    Number(String),
    /// `$n`, 1-based.
    Placeholder(usize),
    Whitespace(String),
    Comment(String),
    LParen,
    RParen,
    Comma,
    /// Operators and remaining punctuation (`=`, `::`, `*`, `.`, `;`, …).
    Symbol(String),
}

impl Token {
    pub fn is_trivia(&self) -> bool {
        matches!(self, Token::Whitespace(_) | Token::Comment(_))
    }

    /// True for a bare word matching `keyword` case-insensitively.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// Source text of the token.
    pub fn text(&self) -> String {
        match self {
            Token::Word(s)
            | Token::QuotedIdent(s)
            | Token::Literal(s)
            | Token::Number(s)
            | Token::Whitespace(s)
            | Token::Comment(s)
            | Token::Symbol(s) => s.clone(),
            Token::Placeholder(n) => format!("${}", n),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
        }
    }
}

/// A token plus the byte offset where it starts.
pub type Spanned = (usize, Token);

const TWO_CHAR_OPERATORS: [&str; 6] = ["::", "<=", ">=", "<>", "!=", "||"];

pub fn tokenize(sql: &str) -> Result<Vec<Spanned>, TranslationError> {
    Lexer { src: sql, pos: 0 }.run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Spanned>, TranslationError> {
        let mut tokens = Vec::new();
        while let Some(b) = self.peek() {
            let start = self.pos;
            let token = match b {
                b if b.is_ascii_whitespace() => {
                    self.take_while(|b| b.is_ascii_whitespace());
                    Token::Whitespace(self.slice(start))
                }
                b'-' if self.peek_at(1) == Some(b'-') => {
                    self.take_while(|b| b != b'\n');
                    Token::Comment(self.slice(start))
                }
                b'/' if self.peek_at(1) == Some(b'*') => self.block_comment(start)?,
                b'\'' => Token::Literal(self.quoted(b'\'', start)?),
                b'"' => Token::QuotedIdent(self.quoted(b'"', start)?),
                b'$' => self.placeholder(start)?,
                b'(' => self.single(Token::LParen),
                b')' => self.single(Token::RParen),
                b',' => self.single(Token::Comma),
                b if b.is_ascii_digit() => {
                    self.take_while(|b| b.is_ascii_digit() || b == b'.');
                    Token::Number(self.slice(start))
                }
                b if is_word_byte(b) => {
                    self.take_while(is_word_byte);
                    Token::Word(self.slice(start))
                }
                b'?' => {
                    return Err(TranslationError::Unsupported {
                        construct: "'?' operator".to_string(),
                        offset: start,
                    })
                }
                _ => self.symbol(),
            };
            tokens.push((start, token));
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + ahead).copied()
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize) -> String {
        self.src[start..self.pos].to_string()
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn symbol(&mut self) -> Token {
        let rest = &self.src[self.pos..];
        if let Some(op) = TWO_CHAR_OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            self.pos += op.len();
            return Token::Symbol(op.to_string());
        }
        // Remaining punctuation is ASCII; anything else still advances one char.
        let len = rest.chars().next().map(char::len_utf8).unwrap_or(1);
        self.pos += len;
        Token::Symbol(rest[..len].to_string())
    }

    /// Consume a quoted run where a doubled quote escapes itself.
    fn quoted(&mut self, quote: u8, start: usize) -> Result<String, TranslationError> {
        self.pos += 1;
        loop {
            match self.peek() {
                None => return Err(TranslationError::UnterminatedLiteral { offset: start }),
                Some(b) if b == quote => {
                    self.pos += 1;
                    if self.peek() == Some(quote) {
                        self.pos += 1;
                    } else {
                        return Ok(self.slice(start));
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn block_comment(&mut self, start: usize) -> Result<Token, TranslationError> {
        match self.src[self.pos + 2..].find("*/") {
            Some(end) => {
                self.pos += 2 + end + 2;
                Ok(Token::Comment(self.slice(start)))
            }
            None => Err(TranslationError::UnterminatedLiteral { offset: start }),
        }
    }

    fn placeholder(&mut self, start: usize) -> Result<Token, TranslationError> {
        self.pos += 1;
        self.take_while(|b| b.is_ascii_digit());
        let digits = &self.src[start + 1..self.pos];
        if digits.is_empty() {
            return Err(TranslationError::Unsupported {
                construct: "dollar-quoted string".to_string(),
                offset: start,
            });
        }
        match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Token::Placeholder(n)),
            _ => Err(TranslationError::InvalidPlaceholder {
                placeholder: self.slice(start),
                offset: start,
            }),
        }
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<Token> {
        tokenize(sql)
            .unwrap()
            .into_iter()
            .map(|(_, t)| t)
            .filter(|t| !t.is_trivia())
            .collect()
    }

    #[test]
    fn test_tokenize_simple_select() {
        let tokens = kinds("SELECT id FROM users WHERE email = $1");
        assert_eq!(
            tokens,
            vec![
                Token::Word("SELECT".to_string()),
                Token::Word("id".to_string()),
                Token::Word("FROM".to_string()),
                Token::Word("users".to_string()),
                Token::Word("WHERE".to_string()),
                Token::Word("email".to_string()),
                Token::Symbol("=".to_string()),
                Token::Placeholder(1),
            ]
        );
    }

    #[test]
    fn test_literals_are_opaque() {
        let tokens = kinds("SELECT 'it''s $1 ILIKE' AS x");
        assert_eq!(tokens[1], Token::Literal("'it''s $1 ILIKE'".to_string()));
        assert!(!tokens.iter().any(|t| matches!(t, Token::Placeholder(_))));
    }

    #[test]
    fn test_cast_and_operators() {
        let tokens = kinds("a::numeric <> b || c");
        assert_eq!(tokens[1], Token::Symbol("::".to_string()));
        assert_eq!(tokens[3], Token::Symbol("<>".to_string()));
        assert_eq!(tokens[5], Token::Symbol("||".to_string()));
    }

    #[test]
    fn test_comments_are_kept() {
        let all: Vec<Token> = tokenize("SELECT 1 -- $9\n/* $8 */")
            .unwrap()
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert!(all.contains(&Token::Comment("-- $9".to_string())));
        assert!(all.contains(&Token::Comment("/* $8 */".to_string())));
    }

    #[test]
    fn test_offsets_are_byte_positions() {
        let tokens = tokenize("SELECT (a").unwrap();
        assert_eq!(tokens[2], (7, Token::LParen));
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            tokenize("SELECT 'open"),
            Err(TranslationError::UnterminatedLiteral { offset: 7 })
        ));
        assert!(matches!(
            tokenize("SELECT $0"),
            Err(TranslationError::InvalidPlaceholder { .. })
        ));
        assert!(matches!(
            tokenize("SELECT $$body$$"),
            Err(TranslationError::Unsupported { .. })
        ));
        assert!(matches!(
            tokenize("SELECT data ? 'key'"),
            Err(TranslationError::Unsupported { .. })
        ));
    }
}

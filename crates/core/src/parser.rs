//! Recursive-descent parser for binding expressions and mutation paths.
//!
//! Grammar (whitespace between tokens is insignificant):
//!
//! ```text
//! expr     := literal | call | binding
//! literal  := 'null' | 'true' | 'false' | INT | FLOAT | STRING
//! call     := WORD '(' [ expr { ',' expr } ] ')'
//! binding  := WORD { '.' WORD | '[' INT ']' }
//! path     := '' | '*' | segment { '.' WORD | '[' INT ']' }
//! ```

use crate::ast::{Expr, PathSegment};
use crate::error::ParseError;
use crate::lexer::{lex, Spanned, Token};
use crate::value::Value;

/// Deepest call nesting accepted before the input is rejected.
pub const MAX_NESTING: usize = 256;

/// Parse an expression. Never fails: malformed input yields
/// [`Expr::Invalid`] carrying the original text and the reason.
pub fn parse(text: &str) -> Expr {
    match try_parse(text) {
        Ok(expr) => expr,
        Err(e) => Expr::Invalid {
            text: text.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Parse an expression, reporting the failure instead of folding it.
pub fn try_parse(text: &str) -> Result<Expr, ParseError> {
    let tokens = lex(text)?;
    let mut p = Parser::new(&tokens);
    if p.peek() == &Token::Eof {
        return Err(p.err("empty expression"));
    }
    let expr = p.parse_expr()?;
    p.expect_eof()?;
    Ok(expr)
}

/// Parse a mutation path relative to a context's value, e.g. `x`,
/// `items[2].name` or `[0]`. An empty path or `*` addresses the whole value.
pub fn parse_path(text: &str) -> Result<Vec<PathSegment>, ParseError> {
    let tokens = lex(text)?;
    let mut p = Parser::new(&tokens);
    match p.peek().clone() {
        Token::Eof => return Ok(Vec::new()),
        Token::Star => {
            p.advance();
            p.expect_eof()?;
            return Ok(Vec::new());
        }
        _ => {}
    }
    let mut path = Vec::new();
    if p.peek() == &Token::LBracket {
        path.push(p.parse_index()?);
    } else {
        path.push(PathSegment::Key(p.take_key()?));
    }
    p.parse_path_tail(&mut path)?;
    p.expect_eof()?;
    Ok(path)
}

// ──────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Spanned]) -> Self {
        Parser {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.cur().token
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].token
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(self.cur().offset, msg)
    }

    fn expect(&mut self, tok: Token, what: &str) -> Result<(), ParseError> {
        if self.peek() == &tok {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected {}, got {}", what, describe(self.peek()))))
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.peek() == &Token::Eof {
            Ok(())
        } else {
            Err(self.err(format!(
                "unexpected trailing content: {}",
                describe(self.peek())
            )))
        }
    }

    /// A key segment after `.`: identifiers and bare digits both qualify.
    fn take_key(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Word(w) => {
                self.advance();
                Ok(w)
            }
            Token::Int(digits) if !digits.starts_with('-') => {
                self.advance();
                Ok(digits)
            }
            other => Err(self.err(format!("expected path key, got {}", describe(&other)))),
        }
    }

    // -- Expressions ----------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let continues_path = matches!(self.peek_next(), Token::Dot | Token::LBracket);
        match self.peek().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            Token::Float(f) => {
                let d: f64 = f
                    .parse()
                    .map_err(|_| self.err(format!("invalid decimal '{}'", f)))?;
                self.advance();
                Ok(Expr::Literal(Value::decimal(d)))
            }
            Token::Int(digits) if !continues_path => {
                let i: i64 = digits
                    .parse()
                    .map_err(|_| self.err(format!("integer '{}' out of range", digits)))?;
                self.advance();
                Ok(Expr::Literal(Value::int(i)))
            }
            Token::Word(w) if self.peek_next() == &Token::LParen => {
                self.advance();
                self.parse_call(w)
            }
            Token::Word(w) if !continues_path && is_keyword(&w) => {
                self.advance();
                Ok(Expr::Literal(keyword_value(&w)))
            }
            Token::Word(_) | Token::Int(_) => self.parse_binding(),
            Token::Eof => Err(self.err("unexpected end of expression")),
            other => Err(self.err(format!("expected expression, got {}", describe(&other)))),
        }
    }

    fn parse_call(&mut self, name: String) -> Result<Expr, ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(self.err("expression nested too deeply"));
        }
        self.depth += 1;
        let call = self.parse_args(name);
        self.depth -= 1;
        call
    }

    fn parse_args(&mut self, name: String) -> Result<Expr, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() == &Token::RParen {
            self.advance();
            return Ok(Expr::Function { name, args });
        }
        loop {
            if matches!(self.peek(), Token::Comma | Token::RParen) {
                return Err(self.err(format!("empty argument in call to '{}'", name)));
            }
            args.push(self.parse_expr()?);
            match self.peek().clone() {
                Token::Comma => self.advance(),
                Token::RParen => {
                    self.advance();
                    break;
                }
                Token::Eof => {
                    return Err(self.err(format!("unbalanced parentheses in call to '{}'", name)))
                }
                other => {
                    return Err(self.err(format!(
                        "expected ',' or ')' in call to '{}', got {}",
                        name,
                        describe(&other)
                    )))
                }
            }
        }
        Ok(Expr::Function { name, args })
    }

    fn parse_binding(&mut self) -> Result<Expr, ParseError> {
        let root = self.take_key()?;
        let mut path = vec![PathSegment::Key(root)];
        self.parse_path_tail(&mut path)?;
        Ok(Expr::Binding(path))
    }

    fn parse_path_tail(&mut self, path: &mut Vec<PathSegment>) -> Result<(), ParseError> {
        loop {
            match self.peek().clone() {
                Token::Dot => {
                    self.advance();
                    path.push(PathSegment::Key(self.take_key()?));
                }
                Token::LBracket => path.push(self.parse_index()?),
                _ => return Ok(()),
            }
        }
    }

    fn parse_index(&mut self) -> Result<PathSegment, ParseError> {
        self.expect(Token::LBracket, "'['")?;
        let idx = match self.peek().clone() {
            Token::Int(digits) => digits
                .parse::<usize>()
                .map_err(|_| self.err(format!("invalid array index '{}'", digits)))?,
            other => {
                return Err(self.err(format!("expected array index, got {}", describe(&other))))
            }
        };
        self.advance();
        self.expect(Token::RBracket, "']'")?;
        Ok(PathSegment::Index(idx))
    }
}

fn is_keyword(w: &str) -> bool {
    matches!(w, "null" | "true" | "false")
}

fn keyword_value(w: &str) -> Value {
    match w {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::Null,
    }
}

fn describe(tok: &Token) -> String {
    match tok {
        Token::Word(w) => format!("'{}'", w),
        Token::Str(s) => format!("string '{}'", s),
        Token::Int(s) | Token::Float(s) => format!("number {}", s),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Eof => "end of input".to_string(),
    }
}

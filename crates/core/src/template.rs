//! Interpolated text templates: `"Hello @{user.name}!"`.
//!
//! A template is a sequence of literal text and `@{expr}` segments.
//! `\@{` produces a literal `@{`. An unterminated `@{` keeps the rest of the
//! text as an invalid segment so it renders verbatim.

use crate::ast::Expr;
use crate::parser::parse;

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub source: String,
    pub segments: Vec<Segment>,
}

impl Template {
    /// The expression when the whole text is exactly one `@{expr}`; such a
    /// template evaluates to the raw value instead of a string.
    pub fn single_expression(&self) -> Option<&Expr> {
        match self.segments.as_slice() {
            [Segment::Expr(e)] if !e.is_invalid() => Some(e),
            _ => None,
        }
    }

    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Expr(e) => Some(e),
            Segment::Text(_) => None,
        })
    }

    /// Invalid segments as `(original text, reason)` pairs, for reporting.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.expressions()
            .filter_map(|e| match e {
                Expr::Invalid { text, reason } => Some((text.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn has_expressions(&self) -> bool {
        self.expressions().next().is_some()
    }
}

/// Split text into literal and expression segments.
pub fn parse_template(text: &str) -> Template {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut buf = String::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c == '\\' && starts_interpolation(&chars, pos + 1) {
            buf.push_str("@{");
            pos += 3;
            continue;
        }

        if starts_interpolation(&chars, pos) {
            let body_start = pos + 2;
            match find_close(&chars, body_start) {
                Some(close) => {
                    if !buf.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut buf)));
                    }
                    let body: String = chars[body_start..close].iter().collect();
                    let expr = match parse(&body) {
                        Expr::Invalid { reason, .. } => Expr::Invalid {
                            text: chars[pos..=close].iter().collect(),
                            reason,
                        },
                        ok => ok,
                    };
                    segments.push(Segment::Expr(expr));
                    pos = close + 1;
                }
                None => {
                    if !buf.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut buf)));
                    }
                    segments.push(Segment::Expr(Expr::Invalid {
                        text: chars[pos..].iter().collect(),
                        reason: "unterminated interpolation".to_string(),
                    }));
                    pos = chars.len();
                }
            }
            continue;
        }

        buf.push(c);
        pos += 1;
    }

    if !buf.is_empty() {
        segments.push(Segment::Text(buf));
    }

    Template {
        source: text.to_string(),
        segments,
    }
}

fn starts_interpolation(chars: &[char], pos: usize) -> bool {
    pos + 1 < chars.len() && chars[pos] == '@' && chars[pos + 1] == '{'
}

/// Position of the `}` closing an interpolation, skipping quoted strings.
fn find_close(chars: &[char], mut pos: usize) -> Option<usize> {
    let mut in_string = false;
    while pos < chars.len() {
        match chars[pos] {
            '\\' if in_string => pos += 1,
            '\'' => in_string = !in_string,
            '}' if !in_string => return Some(pos),
            _ => {}
        }
        pos += 1;
    }
    None
}

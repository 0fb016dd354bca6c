//! Expression AST produced by the parser.
//!
//! Parsing is total: malformed text becomes [`Expr::Invalid`] rather than an
//! error, and callers substitute the original text as a constant string.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::value::Value;

/// One step of a path into a value tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => f.write_str(k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Render a path in the `a.b[0].c` grammar accepted by the parser.
pub fn format_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in path.iter().enumerate() {
        match seg {
            PathSegment::Key(k) => {
                if i > 0 {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSegment::Index(idx) => {
                out.push_str(&format!("[{}]", idx));
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    /// Path whose first segment is always a `Key` naming the context.
    Binding(Vec<PathSegment>),
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Invalid {
        text: String,
        reason: String,
    },
}

impl Expr {
    pub fn is_invalid(&self) -> bool {
        matches!(self, Expr::Invalid { .. })
    }

    /// Context id a binding reads from.
    pub fn binding_root(&self) -> Option<&str> {
        match self {
            Expr::Binding(path) => match path.first() {
                Some(PathSegment::Key(k)) => Some(k),
                _ => None,
            },
            _ => None,
        }
    }

    /// Every context id referenced anywhere in the expression, including
    /// inside nested function arguments.
    pub fn context_ids(&self) -> BTreeSet<&str> {
        let mut ids = BTreeSet::new();
        self.collect_context_ids(&mut ids);
        ids
    }

    fn collect_context_ids<'a>(&'a self, ids: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Binding(_) => {
                if let Some(root) = self.binding_root() {
                    ids.insert(root);
                }
            }
            Expr::Function { args, .. } => {
                for arg in args {
                    arg.collect_context_ids(ids);
                }
            }
            Expr::Literal(_) | Expr::Invalid { .. } => {}
        }
    }
}

/// Re-serialize an expression in the parser's grammar. `Invalid` renders its
/// original text.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(v) => write_literal(f, v),
            Expr::Binding(path) => f.write_str(&format_path(path)),
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
            Expr::Invalid { text, .. } => f.write_str(text),
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::String(s) => {
            f.write_str("'")?;
            for c in s.chars() {
                match c {
                    '\'' => f.write_str("\\'")?,
                    '\\' => f.write_str("\\\\")?,
                    other => write!(f, "{}", other)?,
                }
            }
            f.write_str("'")
        }
        // Scalars print in literal syntax; compound values only arise from
        // ingested JSON and have no literal form.
        other => write!(f, "{}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> PathSegment {
        PathSegment::Key(k.to_string())
    }

    #[test]
    fn formats_mixed_paths() {
        let path = vec![key("a"), key("b"), PathSegment::Index(0), key("c")];
        assert_eq!(format_path(&path), "a.b[0].c");
    }

    #[test]
    fn collects_context_ids_through_nested_calls() {
        let expr = Expr::Function {
            name: "sum".into(),
            args: vec![
                Expr::Binding(vec![key("a"), key("x")]),
                Expr::Function {
                    name: "int".into(),
                    args: vec![Expr::Binding(vec![key("b")]), Expr::Binding(vec![key("a")])],
                },
                Expr::Literal(Value::int(1)),
            ],
        };
        let ids: Vec<&str> = expr.context_ids().into_iter().collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn string_literals_are_requoted_with_escapes() {
        let expr = Expr::Literal(Value::string(r"it's a \ test"));
        assert_eq!(expr.to_string(), r"'it\'s a \\ test'");
    }
}

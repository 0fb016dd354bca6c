//! tether-core: the binding expression language.
//!
//! Turns expression text into an AST of literals, context bindings and
//! nested function calls, and defines the tagged [`Value`] those
//! expressions evaluate to.
//!
//! # Public API
//!
//! - [`parse()`] -- total parse from text to [`Expr`] (malformed text becomes
//!   [`Expr::Invalid`])
//! - [`parse_path()`] -- mutation paths (`items[0].name`, `*`)
//! - [`parse_template()`] -- `@{...}` interpolated text
//! - [`Value`], [`Number`] -- the runtime value model

pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod template;
pub mod value;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::{format_path, Expr, PathSegment};
pub use error::ParseError;
pub use parser::{parse, parse_path, try_parse, MAX_NESTING};
pub use template::{parse_template, Segment, Template};
pub use value::{format_decimal, value_to_json, Number, Value};

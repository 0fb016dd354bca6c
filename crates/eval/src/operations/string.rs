//! String operations. Indices and lengths count characters.

use tether_core::Value;

use crate::numeric::{numeric, Numeric};

/// `concat(...)`: strings, numbers and booleans are stringified; anything
/// else makes the result `Null`.
pub(crate) fn concat(params: &[Value]) -> Value {
    let mut out = String::new();
    for p in params {
        match p {
            Value::String(s) => out.push_str(s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(&b.to_string()),
            _ => return Value::Null,
        }
    }
    Value::String(out)
}

fn map_str(params: &[Value], f: impl FnOnce(&str) -> String) -> Value {
    match params.first() {
        Some(Value::String(s)) => Value::String(f(s)),
        _ => Value::Null,
    }
}

pub(crate) fn capitalize(params: &[Value]) -> Value {
    map_str(params, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    })
}

pub(crate) fn lowercase(params: &[Value]) -> Value {
    map_str(params, str::to_lowercase)
}

pub(crate) fn uppercase(params: &[Value]) -> Value {
    map_str(params, str::to_uppercase)
}

/// `substr(s, start[, length])`, clamped to the string bounds.
pub(crate) fn substr(params: &[Value]) -> Value {
    let Some(Value::String(s)) = params.first() else {
        return Value::Null;
    };
    let start = match params.get(1).and_then(numeric) {
        Some(Numeric::Int(i)) => i.max(0) as usize,
        _ => return Value::Null,
    };
    let length = match params.get(2) {
        None => usize::MAX,
        Some(v) => match numeric(v) {
            Some(Numeric::Int(i)) => i.max(0) as usize,
            _ => return Value::Null,
        },
    };
    Value::String(s.chars().skip(start).take(length).collect())
}

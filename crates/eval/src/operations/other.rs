//! `int`, `isEmpty`, `isNull`, `length`.

use tether_core::Value;

use crate::numeric::to_int;

/// `int(v)`: integer conversion of the first parameter.
pub(crate) fn int(params: &[Value]) -> Value {
    match params.first() {
        Some(v) => to_int(v),
        None => Value::Null,
    }
}

/// Strings, arrays and objects report their own emptiness; every other
/// value, `Null` included, counts as empty.
pub(crate) fn is_empty(params: &[Value]) -> Value {
    let empty = match params.first() {
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(fields)) => fields.is_empty(),
        _ => true,
    };
    Value::Bool(empty)
}

pub(crate) fn is_null(params: &[Value]) -> Value {
    Value::Bool(params.first().map_or(true, Value::is_null))
}

pub(crate) fn length(params: &[Value]) -> Value {
    match params.first() {
        Some(Value::String(s)) => Value::int(s.chars().count() as i64),
        Some(Value::Array(items)) => Value::int(items.len() as i64),
        Some(Value::Object(fields)) => Value::int(fields.len() as i64),
        _ => Value::Null,
    }
}

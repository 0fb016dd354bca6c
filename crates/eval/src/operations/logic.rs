//! `not`, `and`, `or`, `condition`.

use tether_core::Value;

pub(crate) fn not(params: &[Value]) -> Value {
    match params.first().and_then(Value::as_bool) {
        Some(b) => Value::Bool(!b),
        None => Value::Null,
    }
}

/// `and(...)` / `or(...)` over booleans; any other operand yields `Null`.
pub(crate) fn all(params: &[Value]) -> Value {
    let mut result = true;
    for p in params {
        match p.as_bool() {
            Some(b) => result &= b,
            None => return Value::Null,
        }
    }
    Value::Bool(result)
}

pub(crate) fn any(params: &[Value]) -> Value {
    let mut result = false;
    for p in params {
        match p.as_bool() {
            Some(b) => result |= b,
            None => return Value::Null,
        }
    }
    Value::Bool(result)
}

/// `condition(cond, then, else)`.
pub(crate) fn condition(params: &[Value]) -> Value {
    match params.first().and_then(Value::as_bool) {
        Some(true) => params.get(1).cloned().unwrap_or_default(),
        Some(false) => params.get(2).cloned().unwrap_or_default(),
        None => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_connectives() {
        let t = Value::Bool(true);
        let f = Value::Bool(false);
        assert_eq!(all(&[t.clone(), f.clone()]), f);
        assert_eq!(any(&[t.clone(), f.clone()]), t);
        assert_eq!(all(&[t.clone(), Value::int(1)]), Value::Null);
        assert_eq!(not(&[f.clone()]), t);
    }

    #[test]
    fn condition_picks_branch() {
        let params = [Value::Bool(false), Value::string("yes"), Value::string("no")];
        assert_eq!(condition(&params), Value::string("no"));
        assert_eq!(condition(&[Value::string("true"), Value::int(1)]), Value::Null);
    }
}

//! Array operations. Inputs are never modified: every result is a fresh
//! copy of the source array.

use tether_core::Value;

use crate::numeric::{numeric, Numeric};

fn index_param(v: Option<&Value>) -> Option<usize> {
    match v.and_then(numeric) {
        Some(Numeric::Int(i)) => usize::try_from(i).ok(),
        _ => None,
    }
}

/// `contains(array, value)`: structural membership.
pub(crate) fn contains(params: &[Value]) -> Value {
    match (params.first(), params.get(1)) {
        (Some(Value::Array(items)), Some(needle)) => Value::Bool(items.contains(needle)),
        _ => Value::Null,
    }
}

/// `insert(array, value[, index])`: append, or insert before `index`.
pub(crate) fn insert(params: &[Value]) -> Value {
    let (Some(Value::Array(items)), Some(element)) = (params.first(), params.get(1)) else {
        return Value::Null;
    };
    let mut copy = items.clone();
    match params.get(2) {
        None => copy.push(element.clone()),
        Some(_) => match index_param(params.get(2)) {
            Some(i) if i <= copy.len() => copy.insert(i, element.clone()),
            _ => return Value::Null,
        },
    }
    Value::Array(copy)
}

/// `remove(array, value)`: drop every element equal to `value`.
pub(crate) fn remove(params: &[Value]) -> Value {
    let (Some(Value::Array(items)), Some(element)) = (params.first(), params.get(1)) else {
        return Value::Null;
    };
    Value::Array(items.iter().filter(|v| *v != element).cloned().collect())
}

/// `removeIndex(array, index)`.
pub(crate) fn remove_index(params: &[Value]) -> Value {
    let Some(Value::Array(items)) = params.first() else {
        return Value::Null;
    };
    match index_param(params.get(1)) {
        Some(i) if i < items.len() => {
            let mut copy = items.clone();
            copy.remove(i);
            Value::Array(copy)
        }
        _ => Value::Null,
    }
}

/// `union(a, b, ...)`: concatenation of all array parameters.
pub(crate) fn union(params: &[Value]) -> Value {
    let mut out = Vec::new();
    for p in params {
        match p {
            Value::Array(items) => out.extend(items.iter().cloned()),
            _ => return Value::Null,
        }
    }
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(xs: &[i64]) -> Value {
        Value::Array(xs.iter().copied().map(Value::int).collect())
    }

    #[test]
    fn remove_index_copies() {
        let original = ints(&[1, 2, 3]);
        let params = [original.clone(), Value::int(1)];
        assert_eq!(remove_index(&params), ints(&[1, 3]));
        assert_eq!(params[0], original);
    }

    #[test]
    fn remove_index_out_of_range() {
        assert_eq!(remove_index(&[ints(&[1]), Value::int(4)]), Value::Null);
        assert_eq!(remove_index(&[ints(&[1]), Value::int(-1)]), Value::Null);
    }

    #[test]
    fn insert_appends_or_positions() {
        assert_eq!(insert(&[ints(&[1, 2]), Value::int(3)]), ints(&[1, 2, 3]));
        assert_eq!(
            insert(&[ints(&[1, 2]), Value::int(0), Value::int(0)]),
            ints(&[0, 1, 2])
        );
        assert_eq!(
            insert(&[ints(&[1, 2]), Value::int(9), Value::int(2)]),
            ints(&[1, 2, 9])
        );
        assert_eq!(insert(&[ints(&[1]), Value::int(9), Value::int(5)]), Value::Null);
    }

    #[test]
    fn remove_drops_every_match() {
        assert_eq!(remove(&[ints(&[1, 2, 1, 3]), Value::int(1)]), ints(&[2, 3]));
    }

    #[test]
    fn contains_and_union() {
        assert_eq!(contains(&[ints(&[1, 2]), Value::int(2)]), Value::Bool(true));
        assert_eq!(contains(&[Value::int(1), Value::int(1)]), Value::Null);
        assert_eq!(union(&[ints(&[1]), ints(&[2, 3])]), ints(&[1, 2, 3]));
        assert_eq!(union(&[ints(&[1]), Value::Null]), Value::Null);
    }
}

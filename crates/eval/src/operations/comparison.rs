//! `eq`, `gt`, `gte`, `lt`, `lte` and the generic `comparison` primitive.

use std::cmp::Ordering;

use tether_core::Value;

use crate::numeric::{generic_compare, order_values, values_equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Relation {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// Binary comparison. `Null` when an operand is missing or literally
/// `Null`; `false` when the pair has no defined order.
pub(crate) fn compare(rel: Relation, params: &[Value]) -> Value {
    let (Some(left), Some(right)) = (params.first(), params.get(1)) else {
        return Value::Null;
    };
    if left.is_null() || right.is_null() {
        return Value::Null;
    }
    let result = match rel {
        Relation::Eq => values_equal(left, right),
        Relation::Gt => order_values(left, right) == Some(Ordering::Greater),
        Relation::Gte => matches!(
            order_values(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Relation::Lt => order_values(left, right) == Some(Ordering::Less),
        Relation::Lte => matches!(
            order_values(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
    };
    Value::Bool(result)
}

/// `comparison(a, b)`: `-1`, `0` or `1`, or `Null` when not comparable.
pub(crate) fn comparison(params: &[Value]) -> Value {
    let (Some(left), Some(right)) = (params.first(), params.get(1)) else {
        return Value::Null;
    };
    match generic_compare(left, right) {
        Some(Ordering::Less) => Value::int(-1),
        Some(Ordering::Equal) => Value::int(0),
        Some(Ordering::Greater) => Value::int(1),
        None => Value::Null,
    }
}

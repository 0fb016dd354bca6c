//! Numeric coercion and comparison rules.
//!
//! Strings that parse as numbers take part in arithmetic and comparison.
//! Integer operands stay integral; any decimal operand (or a string that
//! only parses as a decimal) promotes the computation to `f64`. Anything
//! else is not numeric and makes arithmetic yield `Null`.
//!
//! Integer-vs-decimal comparisons are integral: a decimal with a fractional
//! part never equals an integer, and ordering truncates the decimal before
//! comparing (`gt(1, 1.5)` is false, `gte(1, 1.5)` is true).

use std::cmp::Ordering;

use tether_core::{format_decimal, Number, Value};

/// The numeric reading of a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Int(i64),
    Decimal(f64),
}

impl Numeric {
    pub fn as_f64(self) -> f64 {
        match self {
            Numeric::Int(i) => i as f64,
            Numeric::Decimal(d) => d,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Numeric::Int(i) => Value::int(i),
            Numeric::Decimal(d) => Value::decimal(d),
        }
    }
}

/// Read a string as an integer if it has no fractional part, otherwise as
/// a finite decimal.
pub fn parse_numeric_str(s: &str) -> Option<Numeric> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Numeric::Int(i));
    }
    match s.parse::<f64>() {
        Ok(d) if d.is_finite() => Some(Numeric::Decimal(d)),
        _ => None,
    }
}

/// Numbers and numeric strings are numeric; booleans, `Null` and compound
/// values are not.
pub fn numeric(v: &Value) -> Option<Numeric> {
    match v {
        Value::Number(Number::Int(i)) => Some(Numeric::Int(*i)),
        Value::Number(Number::Decimal(d)) => Some(Numeric::Decimal(*d)),
        Value::String(s) => parse_numeric_str(s),
        _ => None,
    }
}

// ──────────────────────────────────────────────
// Arithmetic
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary arithmetic under the coercion rules. Non-numeric operands and
/// division by zero yield `Null`. Integer overflow falls back to decimal.
pub fn arithmetic(op: ArithOp, left: &Value, right: &Value) -> Value {
    match (numeric(left), numeric(right)) {
        (Some(Numeric::Int(l)), Some(Numeric::Int(r))) => int_arithmetic(op, l, r),
        (Some(l), Some(r)) => decimal_arithmetic(op, l.as_f64(), r.as_f64()),
        _ => Value::Null,
    }
}

fn int_arithmetic(op: ArithOp, l: i64, r: i64) -> Value {
    let checked = match op {
        ArithOp::Add => l.checked_add(r),
        ArithOp::Sub => l.checked_sub(r),
        ArithOp::Mul => l.checked_mul(r),
        ArithOp::Div => {
            if r == 0 {
                return Value::Null;
            }
            l.checked_div(r)
        }
    };
    match checked {
        Some(i) => Value::int(i),
        None => decimal_arithmetic(op, l as f64, r as f64),
    }
}

fn decimal_arithmetic(op: ArithOp, l: f64, r: f64) -> Value {
    let result = match op {
        ArithOp::Add => l + r,
        ArithOp::Sub => l - r,
        ArithOp::Mul => l * r,
        ArithOp::Div => {
            if r == 0.0 {
                return Value::Null;
            }
            l / r
        }
    };
    if result.is_finite() {
        Value::decimal(result)
    } else {
        Value::Null
    }
}

// ──────────────────────────────────────────────
// Comparison
// ──────────────────────────────────────────────

fn truncate(d: f64) -> i64 {
    // `as` saturates out-of-range values and maps NaN to 0.
    d.trunc() as i64
}

fn numeric_equal(l: Numeric, r: Numeric) -> bool {
    match (l, r) {
        (Numeric::Int(a), Numeric::Int(b)) => a == b,
        (Numeric::Int(i), Numeric::Decimal(d)) | (Numeric::Decimal(d), Numeric::Int(i)) => {
            d.fract() == 0.0 && truncate(d) == i
        }
        (Numeric::Decimal(a), Numeric::Decimal(b)) => a == b,
    }
}

fn numeric_order(l: Numeric, r: Numeric) -> Option<Ordering> {
    match (l, r) {
        (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(&b)),
        (Numeric::Int(i), Numeric::Decimal(d)) => Some(i.cmp(&truncate(d))),
        (Numeric::Decimal(d), Numeric::Int(i)) => Some(truncate(d).cmp(&i)),
        (Numeric::Decimal(a), Numeric::Decimal(b)) => a.partial_cmp(&b),
    }
}

/// Numeric reading of a pair where at least one side is a number and the
/// other a number or numeric string.
fn numeric_pair(left: &Value, right: &Value) -> Option<(Numeric, Numeric)> {
    match (left, right) {
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => Some((numeric(left)?, numeric(right)?)),
        _ => None,
    }
}

/// Equality as used by `eq`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    if let Some((l, r)) = numeric_pair(left, right) {
        return numeric_equal(l, r);
    }
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(_), Value::String(_)) | (Value::Array(_), Value::Array(_)) => {
            generic_compare(left, right) == Some(Ordering::Equal)
        }
        (Value::Object(a), Value::Object(b)) => a == b,
        _ => false,
    }
}

/// Ordering as used by `gt`, `gte`, `lt` and `lte`. `None` means the pair
/// has no defined order and the comparison is false.
pub fn order_values(left: &Value, right: &Value) -> Option<Ordering> {
    if let Some((l, r)) = numeric_pair(left, right) {
        return numeric_order(l, r);
    }
    match (left, right) {
        (Value::String(_), Value::String(_)) | (Value::Array(_), Value::Array(_)) => {
            generic_compare(left, right)
        }
        _ => None,
    }
}

/// The generic comparator: arrays compare by their comma-joined renderings;
/// scalars compare numerically when both parse as decimals, otherwise as
/// raw strings.
pub fn generic_compare(left: &Value, right: &Value) -> Option<Ordering> {
    if let (Value::Array(l), Value::Array(r)) = (left, right) {
        return Some(join_rendered(l).cmp(&join_rendered(r)));
    }
    let l = scalar_text(left)?;
    let r = scalar_text(right)?;
    match (l.parse::<f64>(), r.parse::<f64>()) {
        (Ok(a), Ok(b)) if a.is_finite() && b.is_finite() => a.partial_cmp(&b),
        _ => Some(l.cmp(&r)),
    }
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn join_rendered(items: &[Value]) -> String {
    items
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// ──────────────────────────────────────────────
// Conversions
// ──────────────────────────────────────────────

/// Integer reading of a numeric value or numeric string; decimals truncate.
pub fn to_int(v: &Value) -> Value {
    match numeric(v) {
        Some(Numeric::Int(i)) => Value::int(i),
        Some(Numeric::Decimal(d)) => Value::int(truncate(d)),
        None => Value::Null,
    }
}

pub fn to_double(v: &Value) -> Value {
    match numeric(v) {
        Some(n) => Value::decimal(n.as_f64()),
        None => Value::Null,
    }
}

/// Text form of a numeric value. Numeric strings are returned unchanged.
pub fn to_string_value(v: &Value) -> Value {
    match v {
        Value::String(s) if parse_numeric_str(s).is_some() => Value::String(s.clone()),
        Value::Number(Number::Int(i)) => Value::String(i.to_string()),
        Value::Number(Number::Decimal(d)) => Value::String(format_decimal(*d)),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(text: &str) -> Value {
        Value::string(text)
    }

    #[test]
    fn numeric_strings() {
        assert_eq!(parse_numeric_str("12"), Some(Numeric::Int(12)));
        assert_eq!(parse_numeric_str("1.0"), Some(Numeric::Decimal(1.0)));
        assert_eq!(parse_numeric_str("abc"), None);
        assert_eq!(parse_numeric_str("NaN"), None);
        assert_eq!(numeric(&Value::Bool(true)), None);
    }

    #[test]
    fn int_arithmetic_stays_integral() {
        assert_eq!(arithmetic(ArithOp::Add, &Value::int(2), &s("3")), Value::int(5));
        assert_eq!(arithmetic(ArithOp::Div, &Value::int(7), &Value::int(2)), Value::int(3));
    }

    #[test]
    fn decimal_operand_promotes() {
        assert_eq!(
            arithmetic(ArithOp::Add, &s("1"), &Value::decimal(1.5)),
            Value::decimal(2.5)
        );
        assert_eq!(
            arithmetic(ArithOp::Mul, &Value::int(2), &s("0.5")),
            Value::decimal(1.0)
        );
    }

    #[test]
    fn non_numeric_operands_yield_null() {
        assert_eq!(arithmetic(ArithOp::Add, &Value::int(1), &Value::Bool(true)), Value::Null);
        assert_eq!(arithmetic(ArithOp::Sub, &s("x"), &Value::int(1)), Value::Null);
        assert_eq!(arithmetic(ArithOp::Div, &Value::int(1), &Value::int(0)), Value::Null);
    }

    #[test]
    fn overflow_falls_back_to_decimal() {
        let big = Value::int(i64::MAX);
        assert!(matches!(
            arithmetic(ArithOp::Add, &big, &Value::int(1)),
            Value::Number(Number::Decimal(_))
        ));
    }

    #[test]
    fn integer_decimal_equality_requires_zero_fraction() {
        assert!(values_equal(&Value::int(1), &Value::decimal(1.0)));
        assert!(!values_equal(&Value::int(1), &Value::decimal(1.5)));
        assert!(values_equal(&Value::int(1), &s("1")));
        assert!(values_equal(&Value::decimal(2.5), &s("2.5")));
    }

    #[test]
    fn integer_decimal_ordering_truncates() {
        assert_eq!(
            order_values(&Value::int(1), &Value::decimal(1.5)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            order_values(&Value::int(2), &Value::decimal(1.9)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            order_values(&Value::decimal(-0.5), &Value::int(0)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn generic_comparator() {
        assert_eq!(generic_compare(&s("10"), &s("9")), Some(Ordering::Greater));
        assert_eq!(generic_compare(&s("apple"), &s("banana")), Some(Ordering::Less));
        let a = Value::Array(vec![Value::int(1), Value::int(2)]);
        let b = Value::Array(vec![Value::int(1), Value::int(3)]);
        assert_eq!(generic_compare(&a, &b), Some(Ordering::Less));
        assert_eq!(generic_compare(&Value::Null, &s("a")), None);
    }

    #[test]
    fn unsupported_pairs_have_no_order() {
        assert_eq!(order_values(&Value::Bool(false), &Value::int(2)), None);
        assert!(!values_equal(&Value::Bool(true), &Value::int(1)));
    }

    #[test]
    fn conversions() {
        assert_eq!(to_int(&Value::decimal(3.9)), Value::int(3));
        assert_eq!(to_int(&s("42")), Value::int(42));
        assert_eq!(to_int(&Value::Bool(true)), Value::Null);
        assert_eq!(to_double(&Value::int(2)), Value::decimal(2.0));
        assert_eq!(to_string_value(&Value::decimal(2.0)), s("2.0"));
        assert_eq!(to_string_value(&s("7")), s("7"));
        assert_eq!(to_string_value(&s("seven")), Value::Null);
    }
}

//! Runtime value model shared by the parser and the evaluator.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// ──────────────────────────────────────────────
// Numbers
// ──────────────────────────────────────────────

/// Numeric payload of a [`Value`].
///
/// Integer and decimal literals both denote numbers, but the coercion rules
/// treat them differently (`eq(1, 1.5)` is false, `sum(1, 2)` stays integral),
/// so the distinction is kept in the representation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Decimal(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Decimal(d) => d,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Decimal(d) => f.write_str(&format_decimal(*d)),
        }
    }
}

/// Render a decimal so that it always reads back as a decimal: integral
/// values keep a `.0` suffix.
pub fn format_decimal(d: f64) -> String {
    if d.is_finite() && d.fract() == 0.0 {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

// ──────────────────────────────────────────────
// Values
// ──────────────────────────────────────────────

/// A tagged runtime value. Value trees are acyclic: they are built from
/// parsed literals or ingested JSON and only ever copied on write.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<Value>),
    /// Unique keys, iterated in sorted order.
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn int(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }

    pub fn decimal(d: f64) -> Self {
        Value::Number(Number::Decimal(d))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Returns a human-readable type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Number(Number::Int(_)) => "Int",
            Value::Number(Number::Decimal(_)) => "Decimal",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Text used when a value is spliced into a string: strings verbatim,
    /// `Null` as nothing, everything else as JSON.
    pub fn to_display_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// JSON rendering. Decimals keep their fractional marker.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => {
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Object(fields) => {
                f.write_str("{")?;
                for (i, (key, item)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    let quoted = serde_json::to_string(key).map_err(|_| fmt::Error)?;
                    write!(f, "{}:{}", quoted, item)?;
                }
                f.write_str("}")
            }
        }
    }
}

// ──────────────────────────────────────────────
// JSON interop
// ──────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::int(i),
                None => n.as_f64().map(Value::decimal).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(fields) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a runtime value back to JSON. Non-finite decimals become `null`.
pub fn value_to_json(v: &Value) -> serde_json::Value {
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(Number::Int(i)) => serde_json::Value::from(*i),
        Value::Number(Number::Decimal(d)) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Object(fields) => serde_json::Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_integers_and_decimals_stay_distinct() {
        assert_eq!(Value::from(json!(1)), Value::int(1));
        assert_eq!(Value::from(json!(1.0)), Value::decimal(1.0));
        assert_ne!(Value::int(1), Value::decimal(1.0));
    }

    #[test]
    fn display_keeps_decimal_marker() {
        assert_eq!(Value::decimal(1.0).to_string(), "1.0");
        assert_eq!(Value::decimal(2.5).to_string(), "2.5");
        assert_eq!(Value::int(3).to_string(), "3");
    }

    #[test]
    fn display_renders_nested_json() {
        let v = Value::from(json!({"b": [1, "x", null], "a": true}));
        assert_eq!(v.to_string(), r#"{"a":true,"b":[1,"x",null]}"#);
    }

    #[test]
    fn object_keys_iterate_sorted() {
        let v = Value::from(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let Value::Object(fields) = &v else {
            panic!("expected object");
        };
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);
        assert_eq!(v.to_display_text(), r#"{"alpha":2,"mid":3,"zeta":1}"#);
    }

    #[test]
    fn display_text_for_interpolation() {
        assert_eq!(Value::Null.to_display_text(), "");
        assert_eq!(Value::string("hi").to_display_text(), "hi");
        assert_eq!(Value::int(4).to_display_text(), "4");
    }

    #[test]
    fn value_to_json_round_trips_objects() {
        let src = json!({"user": {"name": "Ada", "tags": ["a", "b"], "score": 1.5}});
        assert_eq!(value_to_json(&Value::from(src.clone())), src);
    }
}

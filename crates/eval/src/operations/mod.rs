//! Operation registry.
//!
//! Built-in operations form a closed enum dispatched by name; custom
//! operations are registered explicitly under names that do not collide
//! with a built-in. Every operation is a pure function from parameters to a
//! value and never fails: type mismatches collapse to `Null` or `false`.

mod arithmetic;
mod array;
mod comparison;
mod logic;
mod other;
mod string;

use std::collections::BTreeMap;
use std::fmt;

use tether_core::Value;

use crate::numeric::ArithOp;
use comparison::Relation;

/// A custom operation.
pub type OperationFn = Box<dyn Fn(&[Value]) -> Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("'{0}' is a built-in operation and cannot be replaced")]
    ReservedName(String),
    #[error("invalid operation name '{0}'")]
    InvalidName(String),
}

// ──────────────────────────────────────────────
// Built-ins
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Builtin {
    // Arithmetic
    Sum,
    Subtract,
    Multiply,
    Divide,
    // Comparison
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    Comparison,
    // Logic
    Not,
    And,
    Or,
    Condition,
    // String
    Concat,
    Capitalize,
    Lowercase,
    Uppercase,
    Substr,
    // Array
    Contains,
    Insert,
    Remove,
    RemoveIndex,
    Union,
    // Other
    Int,
    IsEmpty,
    IsNull,
    Length,
}

impl Builtin {
    pub const ALL: [Builtin; 28] = [
        Builtin::Sum,
        Builtin::Subtract,
        Builtin::Multiply,
        Builtin::Divide,
        Builtin::Eq,
        Builtin::Gt,
        Builtin::Gte,
        Builtin::Lt,
        Builtin::Lte,
        Builtin::Comparison,
        Builtin::Not,
        Builtin::And,
        Builtin::Or,
        Builtin::Condition,
        Builtin::Concat,
        Builtin::Capitalize,
        Builtin::Lowercase,
        Builtin::Uppercase,
        Builtin::Substr,
        Builtin::Contains,
        Builtin::Insert,
        Builtin::Remove,
        Builtin::RemoveIndex,
        Builtin::Union,
        Builtin::Int,
        Builtin::IsEmpty,
        Builtin::IsNull,
        Builtin::Length,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Sum => "sum",
            Builtin::Subtract => "subtract",
            Builtin::Multiply => "multiply",
            Builtin::Divide => "divide",
            Builtin::Eq => "eq",
            Builtin::Gt => "gt",
            Builtin::Gte => "gte",
            Builtin::Lt => "lt",
            Builtin::Lte => "lte",
            Builtin::Comparison => "comparison",
            Builtin::Not => "not",
            Builtin::And => "and",
            Builtin::Or => "or",
            Builtin::Condition => "condition",
            Builtin::Concat => "concat",
            Builtin::Capitalize => "capitalize",
            Builtin::Lowercase => "lowercase",
            Builtin::Uppercase => "uppercase",
            Builtin::Substr => "substr",
            Builtin::Contains => "contains",
            Builtin::Insert => "insert",
            Builtin::Remove => "remove",
            Builtin::RemoveIndex => "removeIndex",
            Builtin::Union => "union",
            Builtin::Int => "int",
            Builtin::IsEmpty => "isEmpty",
            Builtin::IsNull => "isNull",
            Builtin::Length => "length",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.iter().copied().find(|b| b.name() == name)
    }

    pub fn apply(self, params: &[Value]) -> Value {
        match self {
            Builtin::Sum => arithmetic::fold(ArithOp::Add, params),
            Builtin::Subtract => arithmetic::fold(ArithOp::Sub, params),
            Builtin::Multiply => arithmetic::fold(ArithOp::Mul, params),
            Builtin::Divide => arithmetic::fold(ArithOp::Div, params),
            Builtin::Eq => comparison::compare(Relation::Eq, params),
            Builtin::Gt => comparison::compare(Relation::Gt, params),
            Builtin::Gte => comparison::compare(Relation::Gte, params),
            Builtin::Lt => comparison::compare(Relation::Lt, params),
            Builtin::Lte => comparison::compare(Relation::Lte, params),
            Builtin::Comparison => comparison::comparison(params),
            Builtin::Not => logic::not(params),
            Builtin::And => logic::all(params),
            Builtin::Or => logic::any(params),
            Builtin::Condition => logic::condition(params),
            Builtin::Concat => string::concat(params),
            Builtin::Capitalize => string::capitalize(params),
            Builtin::Lowercase => string::lowercase(params),
            Builtin::Uppercase => string::uppercase(params),
            Builtin::Substr => string::substr(params),
            Builtin::Contains => array::contains(params),
            Builtin::Insert => array::insert(params),
            Builtin::Remove => array::remove(params),
            Builtin::RemoveIndex => array::remove_index(params),
            Builtin::Union => array::union(params),
            Builtin::Int => other::int(params),
            Builtin::IsEmpty => other::is_empty(params),
            Builtin::IsNull => other::is_null(params),
            Builtin::Length => other::length(params),
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

/// Name → operation lookup used by the evaluator.
#[derive(Default)]
pub struct OperationRegistry {
    custom: BTreeMap<String, OperationFn>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom operation. Re-registering a custom name replaces
    /// the previous function.
    pub fn register<F>(&mut self, name: impl Into<String>, op: F) -> Result<(), RegistryError>
    where
        F: Fn(&[Value]) -> Value + 'static,
    {
        let name = name.into();
        if Builtin::from_name(&name).is_some() {
            return Err(RegistryError::ReservedName(name));
        }
        let valid = !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_');
        if !valid {
            return Err(RegistryError::InvalidName(name));
        }
        self.custom.insert(name, Box::new(op));
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.custom.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        Builtin::from_name(name).is_some() || self.custom.contains_key(name)
    }

    /// Invoke an operation by name. Unknown names yield `Null`.
    pub fn call(&self, name: &str, params: &[Value]) -> Value {
        if let Some(builtin) = Builtin::from_name(name) {
            return builtin.apply(params);
        }
        match self.custom.get(name) {
            Some(op) => op(params),
            None => Value::Null,
        }
    }

    pub fn custom_names(&self) -> impl Iterator<Item = &str> {
        self.custom.keys().map(String::as_str)
    }
}

impl fmt::Debug for OperationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRegistry")
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_round_trip() {
        for b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
    }

    #[test]
    fn unknown_name_is_null() {
        let reg = OperationRegistry::new();
        assert_eq!(reg.call("frobnicate", &[Value::int(1)]), Value::Null);
        assert!(!reg.contains("frobnicate"));
    }

    #[test]
    fn custom_operations() {
        let mut reg = OperationRegistry::new();
        reg.register("double", |p: &[Value]| match p.first() {
            Some(v) => Builtin::Sum.apply(&[v.clone(), v.clone()]),
            None => Value::Null,
        })
        .unwrap();
        assert_eq!(reg.call("double", &[Value::int(21)]), Value::int(42));
        assert_eq!(reg.custom_names().collect::<Vec<_>>(), vec!["double"]);
        assert!(reg.unregister("double"));
        assert_eq!(reg.call("double", &[Value::int(21)]), Value::Null);
    }

    #[test]
    fn builtin_names_are_reserved() {
        let mut reg = OperationRegistry::new();
        let err = reg.register("sum", |_: &[Value]| Value::Null).unwrap_err();
        assert_eq!(err, RegistryError::ReservedName("sum".to_string()));
        assert!(matches!(
            reg.register("bad name", |_: &[Value]| Value::Null),
            Err(RegistryError::InvalidName(_))
        ));
    }
}

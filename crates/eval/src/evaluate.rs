//! Tree-walking evaluator.
//!
//! Evaluation is pure: it reads the scope and never mutates a context.
//! A binding whose context is not in scope turns the whole expression into
//! `Null`. A missing key or index only nulls that one binding.

use tether_core::{Expr, PathSegment, Segment, Template, Value};

use crate::operations::OperationRegistry;
use crate::scope::Scope;

/// Evaluate `expr` against `scope`. `Invalid` expressions evaluate to their
/// original text so callers can pass it through as a literal.
pub fn evaluate(expr: &Expr, scope: &Scope<'_>, registry: &OperationRegistry) -> Value {
    if expr.context_ids().iter().any(|id| scope.lookup(id).is_none()) {
        return Value::Null;
    }
    eval_in_scope(expr, scope, registry)
}

fn eval_in_scope(expr: &Expr, scope: &Scope<'_>, registry: &OperationRegistry) -> Value {
    match expr {
        Expr::Literal(v) => v.clone(),
        Expr::Binding(path) => resolve_binding(path, scope).cloned().unwrap_or(Value::Null),
        Expr::Function { name, args } => {
            let params: Vec<Value> = args
                .iter()
                .map(|arg| eval_in_scope(arg, scope, registry))
                .collect();
            registry.call(name, &params)
        }
        Expr::Invalid { text, .. } => Value::String(text.clone()),
    }
}

fn resolve_binding<'s>(path: &[PathSegment], scope: &'s Scope<'_>) -> Option<&'s Value> {
    let (root, rest) = path.split_first()?;
    let PathSegment::Key(id) = root else {
        return None;
    };
    let entry = scope.lookup(id)?;
    lookup_path(&entry.context.value, rest)
}

/// Walk `path` into `value`. `None` on a missing key, an index out of
/// range, or a segment that does not match the value's shape.
pub fn lookup_path<'v>(value: &'v Value, path: &[PathSegment]) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, segment| match (segment, current) {
        (PathSegment::Key(k), Value::Object(fields)) => fields.get(k),
        (PathSegment::Index(i), Value::Array(items)) => items.get(*i),
        _ => None,
    })
}

/// Evaluate an interpolated template. A lone `@{expr}` yields the raw
/// value; anything else renders to a string.
pub fn evaluate_template(
    template: &Template,
    scope: &Scope<'_>,
    registry: &OperationRegistry,
) -> Value {
    if let Some(expr) = template.single_expression() {
        return evaluate(expr, scope, registry);
    }
    let mut out = String::new();
    for segment in &template.segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Expr(Expr::Invalid { text, .. }) => out.push_str(text),
            Segment::Expr(expr) => {
                out.push_str(&evaluate(expr, scope, registry).to_display_text())
            }
        }
    }
    Value::String(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use serde_json::json;
    use tether_core::{parse, parse_template};

    fn eval_in(text: &str, contexts: &[Context]) -> Value {
        let registry = OperationRegistry::new();
        evaluate(&parse(text), &Scope::from_contexts(contexts), &registry)
    }

    fn user() -> Vec<Context> {
        vec![Context::new(
            "user",
            Value::from(json!({"name": "Ada", "tags": ["x", "y"], "age": 36})),
        )]
    }

    #[test]
    fn literals_need_no_scope() {
        assert_eq!(eval_in("1", &[]), Value::int(1));
        assert_eq!(eval_in("1.0", &[]), Value::decimal(1.0));
        assert_eq!(eval_in("'hi'", &[]), Value::string("hi"));
        assert_eq!(eval_in("sum(1, 2)", &[]), Value::int(3));
    }

    #[test]
    fn bindings_walk_into_values() {
        let ctx = user();
        assert_eq!(eval_in("user.name", &ctx), Value::string("Ada"));
        assert_eq!(eval_in("user.tags[1]", &ctx), Value::string("y"));
        assert_eq!(eval_in("user", &ctx), ctx[0].value);
    }

    #[test]
    fn misses_resolve_to_null() {
        let ctx = user();
        assert_eq!(eval_in("user.email", &ctx), Value::Null);
        assert_eq!(eval_in("user.tags[9]", &ctx), Value::Null);
        assert_eq!(eval_in("user.name[0]", &ctx), Value::Null);
        assert_eq!(eval_in("user.tags.first", &ctx), Value::Null);
        assert_eq!(eval_in("account.id", &ctx), Value::Null);
    }

    #[test]
    fn context_out_of_scope_nulls_whole_expression() {
        let ctx = user();
        assert_eq!(eval_in("isEmpty(nosuch.x)", &ctx), Value::Null);
        assert_eq!(eval_in("isNull(nosuch)", &ctx), Value::Null);
        assert_eq!(eval_in("condition(true, 1, nosuch)", &ctx), Value::Null);
        assert_eq!(eval_in("concat(user.name, nosuch.x)", &ctx), Value::Null);
        // Known context, missing key: only the binding is null.
        assert_eq!(eval_in("isNull(user.email)", &ctx), Value::Bool(true));
        assert_eq!(eval_in("isEmpty(user.tags[7])", &ctx), Value::Bool(true));
        // No bindings at all: scope is irrelevant.
        assert_eq!(eval_in("isNull(null)", &[]), Value::Bool(true));
    }

    #[test]
    fn functions_evaluate_arguments_in_scope() {
        let ctx = user();
        assert_eq!(eval_in("gt(user.age, 30)", &ctx), Value::Bool(true));
        assert_eq!(eval_in("length(user.tags)", &ctx), Value::int(2));
        assert_eq!(eval_in("nosuch(user.age)", &ctx), Value::Null);
    }

    #[test]
    fn invalid_evaluates_to_its_text() {
        assert_eq!(eval_in("sum(1,", &[]), Value::string("sum(1,"));
    }

    #[test]
    fn templates_render_or_pass_raw_value() {
        let ctx = user();
        let registry = OperationRegistry::new();
        let scope = Scope::from_contexts(&ctx);

        let t = parse_template("Hi @{user.name}, @{length(user.tags)} tags@{user.none}");
        assert_eq!(
            evaluate_template(&t, &scope, &registry),
            Value::string("Hi Ada, 2 tags")
        );

        let t = parse_template("@{user.age}");
        assert_eq!(evaluate_template(&t, &scope, &registry), Value::int(36));

        let t = parse_template("tags: @{user.tags} @{a..b}");
        assert_eq!(
            evaluate_template(&t, &scope, &registry),
            Value::string(r#"tags: ["x","y"] @{a..b}"#)
        );
    }
}

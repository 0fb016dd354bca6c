//! Parser integration tests: totality over hostile input, literal and
//! binding round trips, and the JSON shape of the serialized AST.

use serde_json::json;
use tether_core::{
    parse, parse_template, try_parse, Expr, PathSegment, Segment, Value, MAX_NESTING,
};

// ──────────────────────────────────────────────
// Totality
// ──────────────────────────────────────────────

#[test]
fn parse_never_panics_on_fragments() {
    let alphabet = [
        "a", "1", "'", "\\", "(", ")", "[", "]", ",", ".", " ", "-", "*", "é", "@", "{",
    ];
    // Every two- and three-character combination.
    for x in alphabet {
        for y in alphabet {
            let _ = parse(&format!("{}{}", x, y));
            for z in alphabet {
                let _ = parse(&format!("{}{}{}", x, y, z));
            }
        }
    }
}

#[test]
fn invalid_keeps_original_text() {
    let text = "sum(a.x, ";
    match parse(text) {
        Expr::Invalid { text: t, reason } => {
            assert_eq!(t, text);
            assert!(!reason.is_empty());
        }
        other => panic!("expected Invalid, got {:?}", other),
    }
}

#[test]
fn deeply_nested_calls_parse() {
    let mut text = String::from("1");
    for _ in 0..64 {
        text = format!("sum({}, 1)", text);
    }
    assert!(!parse(&text).is_invalid());
}

#[test]
fn runaway_nesting_is_invalid() {
    for depth in [MAX_NESTING + 1, 10_000, 50_000] {
        let text = format!("{}1{}", "sum(".repeat(depth), ")".repeat(depth));
        match parse(&text) {
            Expr::Invalid { text: t, reason } => {
                assert_eq!(t, text);
                assert!(reason.contains("nested too deeply"), "{}", reason);
            }
            other => panic!("depth {} parsed as {:?}", depth, other),
        }
    }
    let open_only = "sum(".repeat(10_000);
    assert!(parse(&open_only).is_invalid());
    assert!(try_parse(&open_only).is_err());
}

// ──────────────────────────────────────────────
// Round trips
// ──────────────────────────────────────────────

#[test]
fn literals_and_bindings_survive_reparse() {
    for text in [
        "null",
        "true",
        "false",
        "0",
        "-42",
        "3.25",
        "10.0",
        "'plain'",
        "'quote \\' and slash \\\\'",
        "'keeps \\n verbatim'",
        "user",
        "user.name",
        "items[3]",
        "a.b[0].c[12].d",
        "2fa.code",
    ] {
        let first = parse(text);
        assert!(!first.is_invalid(), "{} should parse", text);
        let again = parse(&first.to_string());
        assert_eq!(first, again, "round trip of {}", text);
    }
}

#[test]
fn unknown_escape_passes_through() {
    assert_eq!(parse(r"'a\nb'"), Expr::Literal(Value::string(r"a\nb")));
}

#[test]
fn whitespace_between_tokens_is_ignored() {
    assert_eq!(parse(" sum ( 1 ,\t2 ) "), parse("sum(1,2)"));
    assert_eq!(parse(" a . b [ 0 ] "), parse("a.b[0]"));
}

// ──────────────────────────────────────────────
// Serialized shape
// ──────────────────────────────────────────────

#[test]
fn ast_serializes_with_kind_tags() {
    let expr = parse("gt(user.age, 18)");
    let value = serde_json::to_value(&expr).unwrap();
    assert_eq!(
        value,
        json!({
            "kind": "function",
            "value": {
                "name": "gt",
                "args": [
                    {"kind": "binding", "value": [{"key": "user"}, {"key": "age"}]},
                    {"kind": "literal", "value": 18}
                ]
            }
        })
    );
}

#[test]
fn invalid_serializes_text_and_reason() {
    let value = serde_json::to_value(parse("a..b")).unwrap();
    assert_eq!(value["kind"], "invalid");
    assert_eq!(value["value"]["text"], "a..b");
    assert!(value["value"]["reason"].is_string());
}

#[test]
fn decimal_literals_serialize_as_floats() {
    let value = serde_json::to_value(parse("1.0")).unwrap();
    assert_eq!(value, json!({"kind": "literal", "value": 1.0}));
    assert!(value["value"].is_f64());
}

// ──────────────────────────────────────────────
// Templates
// ──────────────────────────────────────────────

#[test]
fn template_with_several_expressions() {
    let t = parse_template("@{a} + @{b[1]} = @{sum(a, b[1])}");
    assert_eq!(t.expressions().count(), 3);
    assert_eq!(t.segments[1], Segment::Text(" + ".into()));
    assert_eq!(
        t.segments[2],
        Segment::Expr(Expr::Binding(vec![
            PathSegment::Key("b".into()),
            PathSegment::Index(1)
        ]))
    );
    assert!(t.failures().is_empty());
}

#[test]
fn template_without_interpolation_is_plain_text() {
    let t = parse_template("just text with @ and { braces }");
    assert!(!t.has_expressions());
    assert_eq!(t.segments, vec![Segment::Text("just text with @ and { braces }".into())]);
}

//! End-to-end tests for the expression language: lex, parse, evaluate,
//! display.

use probsh_kernel::{
    evaluate_expression, EmptyResolver, EvalError, LineError, Value, ValueError,
    VariableResolver,
};
use rstest::rstest;
use std::collections::HashMap;

fn eval(source: &str) -> String {
    evaluate_expression(source, &EmptyResolver)
        .unwrap_or_else(|e| panic!("{:?} failed: {}", source, e))
        .to_string()
}

fn eval_err(source: &str) -> LineError {
    evaluate_expression(source, &EmptyResolver)
        .err()
        .unwrap_or_else(|| panic!("{:?} should have failed", source))
}

#[rstest]
#[case("10", "10")]
#[case("0x10", "16")]
#[case("010", "8")]
#[case("0", "0")]
#[case("0xdeadbeef", "3735928559")]
fn test_integer_literals(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[rstest]
#[case("1 + 2 * 3", "7")]
#[case("(1 + 2) * 3", "9")]
#[case("1 << 2 + 1", "8")]
#[case("1 | 2 ^ 3 & 4", "3")]
#[case("2 < 3 == 1", "1")]
#[case("1 || 0 && 0", "1")]
#[case("1 & 3 == 1", "0")]
#[case("8 - 4 - 2", "2")]
#[case("2 * 3 % 4", "2")]
#[case("0 == 1 < 0", "1")]
#[case("(2 << 1) + 2", "6")]
fn test_precedence(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[rstest]
#[case("-1", "-1")]
#[case("+5", "5")]
#[case("~0", "-1")]
#[case("~--1", "-2")]
#[case("!0", "1")]
#[case("!5", "0")]
#[case("!\"\"", "1")]
#[case("!\"x\"", "0")]
#[case("-~0", "1")]
fn test_unary_operators(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[rstest]
#[case("7 / 2", "3")]
#[case("-7 / 2", "-3")]
#[case("7 / -2", "-3")]
#[case("7 % -2", "1")]
#[case("-7 % 2", "-1")]
fn test_division_and_modulo(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[rstest]
#[case("1 << 4", "16")]
#[case("-16 >> 2", "-4")]
#[case("-1 >> 10", "-1")]
#[case("16 >> -2", "64")]
#[case("16 << -2", "4")]
fn test_shifts(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[rstest]
#[case("\"foo\" + \"bar\"", "foobar")]
#[case("\"a\" < \"b\"", "1")]
#[case("\"b\" <= \"a\"", "0")]
#[case("\"a\" == \"a\"", "1")]
#[case("\"a\" == 1", "0")]
#[case("\"1\" != 1", "1")]
#[case("\"a\" && \"\"", "0")]
#[case("\"a\" || \"\"", "1")]
fn test_strings(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(eval(source), expected);
}

#[test]
fn test_short_circuit_protects_right_side() {
    assert_eq!(eval("0 && (1 / 0)"), "0");
    assert_eq!(eval("1 || $undefined"), "1");
}

#[test]
fn test_arbitrary_precision_literals() {
    assert_eq!(
        eval("0xffffffffffffffffffffffffffffffff"),
        "340282366920938463463374607431768211455"
    );
    assert_eq!(
        eval("0xffffffffffffffff * 0xffffffffffffffff"),
        "340282366920938463426481119284349108225"
    );
}

#[test]
fn test_type_error_messages() {
    let err = eval_err("1 + \"x\"");
    assert_eq!(
        err.to_string(),
        "unsupported type for +: \"int\" and \"string\""
    );
    let err = eval_err("-\"x\"");
    assert_eq!(err.to_string(), "unsupported type for -: \"string\"");
    let err = eval_err("\"foo\" * 5");
    assert_eq!(
        err.to_string(),
        "unsupported type for *: \"string\" and \"int\""
    );
}

#[test]
fn test_division_by_zero_error() {
    assert_eq!(
        eval_err("1 / 0"),
        LineError::Eval(EvalError::Value(ValueError::DivisionByZero))
    );
}

#[test]
fn test_unresolved_variable_error() {
    assert_eq!(
        eval_err("$rax").to_string(),
        "unknown variable: $rax"
    );
}

#[test]
fn test_variables_resolve_against_provided_resolver() {
    let mut vars = HashMap::new();
    vars.insert("rax".to_string(), Value::int(0xdead));
    vars.insert("rbx".to_string(), Value::int(0xbeef));
    let resolver: &dyn VariableResolver = &vars;
    let result = evaluate_expression("($rax << 16) | $rbx", resolver).unwrap();
    assert_eq!(result, Value::int(0xdead_beef_u32 as i64));
}

#[test]
fn test_syntax_errors_accumulate() {
    let err = eval_err("1 @ ` 2");
    match err {
        LineError::Syntax(errors) => assert_eq!(errors.len(), 2),
        other => panic!("expected syntax errors, got {:?}", other),
    }
}

#[test]
fn test_string_escape_edge_cases() {
    assert_eq!(eval(r#""foo\tbar""#), "foo\tbar");
    assert_eq!(eval(r#""foo\z""#), "foo\\z");
    assert_eq!(eval(r#""foo\xzz""#), "foo\\xzz");
    assert_eq!(eval(r#""\x41B""#), "AB");
}

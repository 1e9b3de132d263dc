mod common;

use common::{compile, execute, lex, linearize, main_with, run};
use ifjcode::prelude::*;

fn print(expression: &str) -> common::Outcome {
    execute(
        &main_with(&format!("var v = {expression};\nifj.write(v);")),
        &[],
    )
}

fn postfix(src: &str) -> Vec<String> {
    let ast = linearize(lex(src)).unwrap();
    ast.tokens().map(|token| token.lexeme.clone()).collect()
}

#[test]
fn precedence_and_associativity() {
    assert_eq!(print("1 + 2 * 3").output, "7");
    assert_eq!(print("(1 + 2) * 3").output, "9");
    assert_eq!(print("10 - 4 - 3").output, "3");
    assert_eq!(print("100 / 10 / 5").output, "2");
    assert_eq!(print("2 * 3 < 7").output, "true");
    assert_eq!(print("1 < 2 == 3 < 4").output, "true");
}

#[test]
fn expressions_are_stored_in_postfix_order() {
    assert_eq!(
        postfix("x = a + b * c;"),
        ["x", "=", "a", "b", "c", "*", "+", ";"]
    );
    assert_eq!(
        postfix("x = a < b == c;"),
        ["x", "=", "a", "b", "<", "c", "==", ";"]
    );
    assert_eq!(
        postfix("if ((a - b) * c) {"),
        ["if", "(", "a", "b", "-", "c", "*", ")", "{"]
    );
}

#[test]
fn mixed_operands_are_promoted_to_float() {
    assert_eq!(print("1 + 0.5").output, "0x1.8p+0");
    assert_eq!(print("0.5 + 1").output, "0x1.8p+0");
    assert_eq!(print("3 * 0.5").output, "0x1.8p+0");
    assert_eq!(print("2 - 0.5").output, "0x1.8p+0");
    assert_eq!(print("1 < 1.5").output, "true");
    assert_eq!(print("2.0 == 2").output, "true");
}

#[test]
fn same_typed_operands_are_not_promoted() {
    assert_eq!(print("1 + 2").output, "3");
    assert_eq!(print("1.5 + 1.5").output, "0x1.8p+1");
    assert_eq!(print("\"ab\" == \"ab\"").output, "true");
}

#[test]
fn relational_operators() {
    assert_eq!(print("2 <= 2").output, "true");
    assert_eq!(print("3 <= 2").output, "false");
    assert_eq!(print("2 >= 3").output, "false");
    assert_eq!(print("3 > 2").output, "true");
    assert_eq!(print("1 != 2").output, "true");
}

#[test]
fn null_only_compares_for_equality() {
    assert_eq!(print("null == null").output, "true");
    assert_eq!(print("null != null").output, "false");
    assert_eq!(print("1 == null").output, "false");
    assert_eq!(print("null != 1").output, "true");

    for op in ["+", "-", "*", "/", "<", ">", "<=", ">="] {
        let outcome = print(&format!("null {op} 1"));
        assert_eq!(outcome.exit_code, exit_code::TYPE_MISMATCH, "{op}");
        assert_eq!(outcome.output, "", "{op}");
    }
}

#[test]
fn integer_division_by_zero_exits() {
    let outcome = print("7 / 0");
    assert_eq!(outcome.exit_code, exit_code::DIVISION_BY_ZERO);
    assert_eq!(outcome.output, "");

    let program = compile(&main_with("var v = 7 / 0;"));
    let text = program.to_string();
    assert!(text.contains("JUMPIFNEQ division_continuation0 GF@__typecheck_var int@0\nEXIT int@57\n"));
    assert!(text.contains("LABEL __div_int0\nIDIVS\n"));
}

#[test]
fn division_picks_integer_or_float_semantics() {
    assert_eq!(print("8 / 2").output, "4");
    assert_eq!(print("7 / 2").output, "3");
    assert_eq!(print("3.0 / 2").output, "0x1.8p+0");
    assert_eq!(print("1 / 0.5").output, "0x1p+1");
}

#[test]
fn string_literals_are_escaped() {
    let program = compile(&main_with("var s = \"a b#\\\\\";\nifj.write(s);"));
    assert!(program
        .to_string()
        .contains("PUSHS string@a\\032b\\035\\092\n"));
    assert_eq!(run(&program, &[]).output, "a b#\\");
}

#[test]
fn syntax_errors_carry_exit_code_two() {
    for src in ["x = a + ;", "x = (a;", "x = a b;", "x = * a;"] {
        let err = linearize(lex(src)).unwrap_err();
        assert_eq!(err.exit_code(), exit_code::SYNTAX, "{src}");
    }
}

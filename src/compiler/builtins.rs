//! Bodies of the `ifj.*` standard library functions.
//!
//! Every builtin takes its arguments from `LF@__arg0..` and, unless it returns
//! `void`, leaves its result on top of the data stack.

use super::operators::type_tag;
use crate::bytecode::{Instruction as I, Literal, Symbol, ValueType, Var};

fn lf(name: &str) -> Var {
    Var::local(name)
}

fn val(name: &str) -> Symbol {
    Var::local(name).into()
}

fn int(value: i64) -> Symbol {
    Literal::Int(value).into()
}

fn yes() -> Symbol {
    Literal::Bool(true).into()
}

fn nil() -> Symbol {
    Literal::Nil.into()
}

fn label(name: &str) -> I {
    I::Label(name.to_owned())
}

/// Push `LF@__retval` and return to the caller.
fn return_value(out: &mut Vec<I>) {
    out.extend([I::PushS(val("__retval")), I::PopFrame, I::Return]);
}

/// `readstr`, `readi32` and `readf64`: `null` unless a value of `ty` was read.
fn read(out: &mut Vec<I>, name: &str, ty: ValueType) {
    let end = format!("ifj_{name}_end");
    out.extend([
        I::Label(format!("ifj${name}")),
        I::DefVar(lf("__retval")),
        I::DefVar(lf("__type")),
        I::Read(lf("__retval"), ty),
        I::Type(lf("__type"), val("__retval")),
        I::JumpIfEq(end.clone(), val("__type"), type_tag(ty.name())),
        I::Move(lf("__retval"), nil()),
        I::Label(end),
    ]);
    return_value(out);
}

fn write(out: &mut Vec<I>) {
    out.extend([
        label("ifj$write"),
        I::DefVar(lf("__term")),
        I::DefVar(lf("__type")),
        I::Move(lf("__term"), val("__arg0")),
        I::Type(lf("__type"), val("__term")),
        I::JumpIfEq("ifj_write_nil".into(), val("__type"), type_tag("nil")),
        I::Write(val("__term")),
        I::Jump("ifj_write_end".into()),
        label("ifj_write_nil"),
        I::Write(Literal::Str("null".into()).into()),
        label("ifj_write_end"),
        I::PopFrame,
        I::Return,
    ]);
}

fn conversions(out: &mut Vec<I>) {
    out.extend([
        label("ifj$i2f"),
        I::DefVar(lf("__retval")),
        I::Int2Float(lf("__retval"), val("__arg0")),
    ]);
    return_value(out);

    out.extend([
        label("ifj$f2i"),
        I::DefVar(lf("__retval")),
        I::Float2Int(lf("__retval"), val("__arg0")),
    ]);
    return_value(out);

    out.extend([
        label("ifj$string"),
        I::PushS(val("__arg0")),
        I::PopFrame,
        I::Return,
    ]);
}

fn length(out: &mut Vec<I>) {
    out.extend([
        label("ifj$length"),
        I::DefVar(lf("__s")),
        I::Move(lf("__s"), val("__arg0")),
        I::DefVar(lf("__retval")),
        I::StrLen(lf("__retval"), val("__s")),
    ]);
    return_value(out);
}

fn concat(out: &mut Vec<I>) {
    out.extend([
        label("ifj$concat"),
        I::DefVar(lf("__s1")),
        I::DefVar(lf("__s2")),
        I::DefVar(lf("__retval")),
        I::Move(lf("__s1"), val("__arg0")),
        I::Move(lf("__s2"), val("__arg1")),
        I::Concat(lf("__retval"), val("__s1"), val("__s2")),
    ]);
    return_value(out);
}

/// `s[i..j]`, or `null` unless `0 <= i <= j <= len` and `i < len`.
fn substring(out: &mut Vec<I>) {
    let error = || "ifj_substring_error".to_owned();
    out.extend([
        label("ifj$substring"),
        I::DefVar(lf("__s")),
        I::DefVar(lf("__i")),
        I::DefVar(lf("__j")),
        I::Move(lf("__s"), val("__arg0")),
        I::Move(lf("__i"), val("__arg1")),
        I::Move(lf("__j"), val("__arg2")),
        I::DefVar(lf("__retval")),
        I::DefVar(lf("__len")),
        I::DefVar(lf("__cond")),
        I::DefVar(lf("__substring")),
        I::DefVar(lf("__tmp_char")),
        I::Lt(lf("__cond"), val("__i"), int(0)),
        I::JumpIfEq(error(), val("__cond"), yes()),
        I::Lt(lf("__cond"), val("__j"), int(0)),
        I::JumpIfEq(error(), val("__cond"), yes()),
        I::Gt(lf("__cond"), val("__i"), val("__j")),
        I::JumpIfEq(error(), val("__cond"), yes()),
        I::StrLen(lf("__len"), val("__s")),
        I::Lt(lf("__cond"), val("__i"), val("__len")),
        I::JumpIfNeq(error(), val("__cond"), yes()),
        I::Gt(lf("__cond"), val("__j"), val("__len")),
        I::JumpIfEq(error(), val("__cond"), yes()),
        I::Move(lf("__substring"), Literal::Str(String::new()).into()),
        label("ifj_substring_while"),
        I::JumpIfEq("ifj_substring_while_end".into(), val("__i"), val("__j")),
        I::GetChar(lf("__tmp_char"), val("__s"), val("__i")),
        I::Concat(lf("__substring"), val("__substring"), val("__tmp_char")),
        I::Add(lf("__i"), val("__i"), int(1)),
        I::Jump("ifj_substring_while".into()),
        label("ifj_substring_error"),
        I::Move(lf("__retval"), nil()),
        I::Jump("ifj_substring_end".into()),
        label("ifj_substring_while_end"),
        I::Move(lf("__retval"), val("__substring")),
        label("ifj_substring_end"),
    ]);
    return_value(out);
}

/// Lexicographic comparison yielding -1, 0 or 1.
fn strcmp(out: &mut Vec<I>) {
    let jump = |name: &str| I::Jump(name.to_owned());
    let jump_if_set = |name: &str| I::JumpIfEq(name.to_owned(), val("__cmp_res"), yes());
    out.extend([
        label("ifj$strcmp"),
        I::DefVar(lf("__s1")),
        I::DefVar(lf("__s2")),
        I::Move(lf("__s1"), val("__arg0")),
        I::Move(lf("__s2"), val("__arg1")),
        I::DefVar(lf("__len1")),
        I::DefVar(lf("__len2")),
        I::DefVar(lf("__min_len")),
        I::DefVar(lf("__i")),
        I::DefVar(lf("__char1")),
        I::DefVar(lf("__char2")),
        I::DefVar(lf("__cmp_res")),
        I::DefVar(lf("__retval")),
        I::StrLen(lf("__len1"), val("__s1")),
        I::StrLen(lf("__len2"), val("__s2")),
        I::Lt(lf("__cmp_res"), val("__len1"), val("__len2")),
        jump_if_set("ifj_strcmp_set_min_len1"),
        I::Move(lf("__min_len"), val("__len2")),
        jump("ifj_strcmp_start"),
        label("ifj_strcmp_set_min_len1"),
        I::Move(lf("__min_len"), val("__len1")),
        label("ifj_strcmp_start"),
        I::Move(lf("__i"), int(0)),
        label("ifj_strcmp_loop"),
        I::Lt(lf("__cmp_res"), val("__i"), val("__min_len")),
        jump_if_set("ifj_strcmp_compare_chars"),
        jump("ifj_strcmp_length_compare"),
        label("ifj_strcmp_compare_chars"),
        I::GetChar(lf("__char1"), val("__s1"), val("__i")),
        I::GetChar(lf("__char2"), val("__s2"), val("__i")),
        I::Gt(lf("__cmp_res"), val("__char1"), val("__char2")),
        jump_if_set("ifj_strcmp_s1_greater"),
        I::Lt(lf("__cmp_res"), val("__char1"), val("__char2")),
        jump_if_set("ifj_strcmp_s1_less"),
        I::Add(lf("__i"), val("__i"), int(1)),
        jump("ifj_strcmp_loop"),
        label("ifj_strcmp_s1_greater"),
        I::Move(lf("__retval"), int(1)),
        jump("ifj_strcmp_end"),
        label("ifj_strcmp_s1_less"),
        I::Move(lf("__retval"), int(-1)),
        jump("ifj_strcmp_end"),
        label("ifj_strcmp_length_compare"),
        I::Eq(lf("__cmp_res"), val("__len1"), val("__len2")),
        jump_if_set("ifj_strcmp_equal"),
        I::Gt(lf("__cmp_res"), val("__len1"), val("__len2")),
        jump_if_set("ifj_strcmp_s1_greater"),
        jump("ifj_strcmp_s1_less"),
        label("ifj_strcmp_equal"),
        I::Move(lf("__retval"), int(0)),
        jump("ifj_strcmp_end"),
        label("ifj_strcmp_end"),
    ]);
    return_value(out);
}

/// Code of the character at `i`, 0 when out of range.
fn ord(out: &mut Vec<I>) {
    let end = || "ifj_ord_end".to_owned();
    out.extend([
        label("ifj$ord"),
        I::DefVar(lf("__s")),
        I::DefVar(lf("__i")),
        I::Move(lf("__s"), val("__arg0")),
        I::Move(lf("__i"), val("__arg1")),
        I::DefVar(lf("__len")),
        I::DefVar(lf("__char")),
        I::DefVar(lf("__retval")),
        I::DefVar(lf("__cond")),
        I::StrLen(lf("__len"), val("__s")),
        I::Move(lf("__retval"), int(0)),
        I::Eq(lf("__cond"), val("__len"), int(0)),
        I::JumpIfEq(end(), val("__cond"), yes()),
        I::Lt(lf("__cond"), val("__i"), int(0)),
        I::JumpIfEq(end(), val("__cond"), yes()),
        I::Gt(lf("__cond"), val("__i"), val("__len")),
        I::JumpIfEq(end(), val("__cond"), yes()),
        I::Eq(lf("__cond"), val("__i"), val("__len")),
        I::JumpIfEq(end(), val("__cond"), yes()),
        I::Stri2Int(lf("__retval"), val("__s"), val("__i")),
        I::Label(end()),
    ]);
    return_value(out);
}

fn chr(out: &mut Vec<I>) {
    out.extend([
        label("ifj$chr"),
        I::DefVar(lf("__i")),
        I::Move(lf("__i"), val("__arg0")),
        I::DefVar(lf("__retval")),
        I::Int2Char(lf("__retval"), val("__i")),
    ]);
    return_value(out);
}

/// Every builtin, in the order they are appended to a program.
pub(super) fn instructions() -> Vec<I> {
    let mut out = Vec::new();
    read(&mut out, "readstr", ValueType::String);
    read(&mut out, "readi32", ValueType::Int);
    read(&mut out, "readf64", ValueType::Float);
    write(&mut out);
    conversions(&mut out);
    length(&mut out);
    concat(&mut out);
    substring(&mut out);
    strcmp(&mut out);
    ord(&mut out);
    chr(&mut out);
    out
}

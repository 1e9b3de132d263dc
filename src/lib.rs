#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! # ifjcode
//! The back half of an IFJ24 compiler: an operator-precedence expression parser
//! and a code generator for the IFJcode24 frame-oriented stack machine.
//!
//! The parser turns infix expression tokens into postfix order inside a program
//! syntax tree. The code generator walks that tree and produces a [`bytecode::Program`]
//! whose [`Display`](std::fmt::Display) is the textual IFJcode24 listing.

pub mod ast;
pub mod bytecode;
mod common;
pub mod compiler;
pub use common::*;
pub mod prelude;

/// Generate a program with the default [`compiler::CodeGenerator`] limits.
pub fn generate_code(ast: &ast::Ast) -> Result<bytecode::Program, compiler::CompileError> {
    compiler::CodeGenerator::new().generate_program(ast)
}

//! Everyday types, for glob import.

pub use crate::ast::{Ast, Cursor, ExpressionTree};
pub use crate::bytecode::{Instruction, Literal, Program, Symbol, Var};
pub use crate::compiler::{
    CodeGenerator, CompileError, ExpressionParser, ParseError, ParsedExpression, TokenSource,
};
pub use crate::{generate_code, exit_code, Keyword, Operator, Punct, Token, TokenKind};

//! Instruction type definitions for the frame-oriented stack machine.

mod operand;
pub use operand::*;

use std::fmt::{self, Display};
use std::io;

/// Directive opening every generated program.
pub const HEADER: &str = ".IFJcode24";

/// A single instruction, which may contain operands.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Instruction {
    /// Define a variable in a frame.
    DefVar(Var),
    /// Copy a value into a variable.
    Move(Var, Symbol),
    /// Replace the temporary frame with a fresh one.
    CreateFrame,
    /// Turn the temporary frame into the local frame.
    PushFrame,
    /// Turn the local frame back into the temporary frame.
    PopFrame,
    /// Jump to the label, remembering where to return.
    Call(String),
    /// Return to the instruction after the last `CALL`.
    Return,
    /// Stop the program with the given exit code.
    Exit(Symbol),
    /// Push a value onto the data stack.
    PushS(Symbol),
    /// Pop a value from the data stack into a variable.
    PopS(Var),
    /// Pop two values, push their sum.
    AddS,
    /// Pop two values, push their difference.
    SubS,
    /// Pop two values, push their product.
    MulS,
    /// Pop two floats, push their quotient.
    DivS,
    /// Pop two ints, push their quotient.
    IDivS,
    /// Pop two values, push whether the first is less than the second.
    LtS,
    /// Pop two values, push whether the first is greater than the second.
    GtS,
    /// Pop two values, push whether they are equal.
    EqS,
    /// Pop a bool, push its negation.
    NotS,
    /// Pop an int, push it converted to a float.
    Int2FloatS,
    /// `var = a + b`
    Add(Var, Symbol, Symbol),
    /// `var = a < b`
    Lt(Var, Symbol, Symbol),
    /// `var = a > b`
    Gt(Var, Symbol, Symbol),
    /// `var = a == b`
    Eq(Var, Symbol, Symbol),
    /// Unconditional jump.
    Jump(String),
    /// Jump if both operands are equal.
    JumpIfEq(String, Symbol, Symbol),
    /// Jump if the operands differ.
    JumpIfNeq(String, Symbol, Symbol),
    /// Jump target.
    Label(String),
    /// Store the type name of a value (`int`, `nil`, ...) into a variable.
    Type(Var, Symbol),
    /// Convert an int to a float.
    Int2Float(Var, Symbol),
    /// Convert a float to an int.
    Float2Int(Var, Symbol),
    /// Read a line of standard input as the given type.
    Read(Var, ValueType),
    /// Print a value to standard output.
    Write(Symbol),
    /// Length of a string.
    StrLen(Var, Symbol),
    /// Concatenation of two strings.
    Concat(Var, Symbol, Symbol),
    /// Single-character string at an index.
    GetChar(Var, Symbol, Symbol),
    /// Character code at an index.
    Stri2Int(Var, Symbol, Symbol),
    /// Single-character string from a character code.
    Int2Char(Var, Symbol),
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefVar(var) => write!(f, "DEFVAR {var}"),
            Self::Move(var, symbol) => write!(f, "MOVE {var} {symbol}"),
            Self::CreateFrame => f.write_str("CREATEFRAME"),
            Self::PushFrame => f.write_str("PUSHFRAME"),
            Self::PopFrame => f.write_str("POPFRAME"),
            Self::Call(label) => write!(f, "CALL {label}"),
            Self::Return => f.write_str("RETURN"),
            Self::Exit(code) => write!(f, "EXIT {code}"),
            Self::PushS(symbol) => write!(f, "PUSHS {symbol}"),
            Self::PopS(var) => write!(f, "POPS {var}"),
            Self::AddS => f.write_str("ADDS"),
            Self::SubS => f.write_str("SUBS"),
            Self::MulS => f.write_str("MULS"),
            Self::DivS => f.write_str("DIVS"),
            Self::IDivS => f.write_str("IDIVS"),
            Self::LtS => f.write_str("LTS"),
            Self::GtS => f.write_str("GTS"),
            Self::EqS => f.write_str("EQS"),
            Self::NotS => f.write_str("NOTS"),
            Self::Int2FloatS => f.write_str("INT2FLOATS"),
            Self::Add(var, a, b) => write!(f, "ADD {var} {a} {b}"),
            Self::Lt(var, a, b) => write!(f, "LT {var} {a} {b}"),
            Self::Gt(var, a, b) => write!(f, "GT {var} {a} {b}"),
            Self::Eq(var, a, b) => write!(f, "EQ {var} {a} {b}"),
            Self::Jump(label) => write!(f, "JUMP {label}"),
            Self::JumpIfEq(label, a, b) => write!(f, "JUMPIFEQ {label} {a} {b}"),
            Self::JumpIfNeq(label, a, b) => write!(f, "JUMPIFNEQ {label} {a} {b}"),
            Self::Label(label) => write!(f, "LABEL {label}"),
            Self::Type(var, symbol) => write!(f, "TYPE {var} {symbol}"),
            Self::Int2Float(var, symbol) => write!(f, "INT2FLOAT {var} {symbol}"),
            Self::Float2Int(var, symbol) => write!(f, "FLOAT2INT {var} {symbol}"),
            Self::Read(var, ty) => write!(f, "READ {var} {ty}"),
            Self::Write(symbol) => write!(f, "WRITE {symbol}"),
            Self::StrLen(var, symbol) => write!(f, "STRLEN {var} {symbol}"),
            Self::Concat(var, a, b) => write!(f, "CONCAT {var} {a} {b}"),
            Self::GetChar(var, a, b) => write!(f, "GETCHAR {var} {a} {b}"),
            Self::Stri2Int(var, a, b) => write!(f, "STRI2INT {var} {a} {b}"),
            Self::Int2Char(var, symbol) => write!(f, "INT2CHAR {var} {symbol}"),
        }
    }
}

/// A complete generated program.
///
/// Rendering it with [`Display`] yields the textual program: the header
/// directive followed by one instruction per line.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct Program {
    /// The instruction stream, prologue first and builtins last.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Position of `LABEL name`, if the program defines it.
    pub fn label_address(&self, name: &str) -> Option<usize> {
        self.instructions
            .iter()
            .position(|inst| matches!(inst, Instruction::Label(label) if label == name))
    }

    /// Write the textual program.
    pub fn write_to<W: io::Write>(&self, mut out: W) -> io::Result<()> {
        writeln!(out, "{HEADER}")?;
        for inst in &self.instructions {
            writeln!(out, "{inst}")?;
        }
        out.flush()
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }
        Ok(())
    }
}

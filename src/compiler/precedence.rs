//! Terminal classes and the operator-precedence table.

use crate::Operator;
use std::fmt::{self, Display};

/// Terminal symbol class of the expression grammar.
///
/// The discriminants are the row/column indices of [`TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `i`, any identifier or literal.
    Operand,
    /// `$`, bottom of the stack and end of the input.
    End,
}

impl Terminal {
    /// Row and column index in the table.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The binary operator this terminal stands for, if any.
    pub fn operator(self) -> Option<Operator> {
        Some(match self {
            Self::Mul => Operator::Mul,
            Self::Div => Operator::Div,
            Self::Add => Operator::Add,
            Self::Sub => Operator::Sub,
            Self::Eq => Operator::Eq,
            Self::Ne => Operator::Ne,
            Self::Lt => Operator::Lt,
            Self::Gt => Operator::Gt,
            Self::Le => Operator::Le,
            Self::Ge => Operator::Ge,
            Self::LParen | Self::RParen | Self::Operand | Self::End => return None,
        })
    }
}

impl From<Operator> for Terminal {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Mul => Self::Mul,
            Operator::Div => Self::Div,
            Operator::Add => Self::Add,
            Operator::Sub => Self::Sub,
            Operator::Eq => Self::Eq,
            Operator::Ne => Self::Ne,
            Operator::Lt => Self::Lt,
            Operator::Gt => Self::Gt,
            Operator::Le => Self::Le,
            Operator::Ge => Self::Ge,
        }
    }
}

impl Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::Operand => f.write_str("i"),
            Self::End => f.write_str("$"),
            op => match op.operator() {
                Some(op) => op.fmt(f),
                None => Ok(()),
            },
        }
    }
}

/// What the parser does for a (stack top, incoming) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `S`: push the incoming terminal.
    Shift,
    /// `R`: reduce the handle on top of the stack.
    Reduce,
    /// `=`: push `)` and reduce the parenthesized handle at once.
    Match,
    /// `O`: an operand followed by `(`; stop so the caller can parse a call.
    Call,
    /// No relation; the input is malformed.
    Error,
}

const S: Action = Action::Shift;
const R: Action = Action::Reduce;
const M: Action = Action::Match;
const O: Action = Action::Call;
const X: Action = Action::Error;

/// Rows: topmost terminal on the stack. Columns: incoming terminal.
///
/// Order: `* / + - == != < > <= >= ( ) i $`.
#[rustfmt::skip]
pub const TABLE: [[Action; 14]; 14] = [
    //        *  /  +  -  == != <  >  <= >= (  )  i  $
    /* *  */ [R, R, R, R, R, R, R, R, R, R, S, R, S, R],
    /* /  */ [R, R, R, R, R, R, R, R, R, R, S, R, S, R],
    /* +  */ [S, S, R, R, R, R, R, R, R, R, S, R, S, R],
    /* -  */ [S, S, R, R, R, R, R, R, R, R, S, R, S, R],
    /* == */ [S, S, S, S, R, R, S, S, S, S, S, R, S, R],
    /* != */ [S, S, S, S, R, R, S, S, S, S, S, R, S, R],
    /* <  */ [S, S, S, S, R, R, R, R, R, R, S, R, S, R],
    /* >  */ [S, S, S, S, R, R, R, R, R, R, S, R, S, R],
    /* <= */ [S, S, S, S, R, R, R, R, R, R, S, R, S, R],
    /* >= */ [S, S, S, S, R, R, R, R, R, R, S, R, S, R],
    /* (  */ [S, S, S, S, S, S, S, S, S, S, S, M, S, X],
    /* )  */ [R, R, R, R, R, R, R, R, R, R, X, R, X, R],
    /* i  */ [R, R, R, R, R, R, R, R, R, R, O, R, X, R],
    /* $  */ [S, S, S, S, S, S, S, S, S, S, S, X, S, X],
];

/// Look up the action for the topmost stack terminal and the incoming one.
pub fn relation(top: Terminal, incoming: Terminal) -> Action {
    TABLE[top.index()][incoming.index()]
}

//! Auxiliary stacks driving the precedence parser.

use super::precedence::Terminal;
use super::ParseError;
use crate::{ast::ExpressionTree, Operator, Token};
use std::fmt::{self, Display, Write};

/// A grammar symbol on the parser stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackSymbol {
    /// A terminal class.
    Terminal(Terminal),
    /// `E`, an already reduced expression.
    Expr,
    /// Start of the handle that will be reduced next.
    HandleStart,
}

/// A reduction recognised from the handle on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// `E op E`
    Binary(Operator),
    /// `(E)`
    Parenthesized,
    /// `i`
    Operand,
}

/// Grammar symbol stack. The bottom element is always `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolStack {
    symbols: Vec<StackSymbol>,
}

impl Default for SymbolStack {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolStack {
    /// A stack holding only `$`.
    pub fn new() -> Self {
        Self {
            symbols: vec![StackSymbol::Terminal(Terminal::End)],
        }
    }

    /// The symbol on top.
    pub fn top(&self) -> Option<StackSymbol> {
        self.symbols.last().copied()
    }

    /// The topmost terminal, looking past any `E` and handle markers.
    pub fn top_terminal(&self) -> Terminal {
        self.symbols
            .iter()
            .rev()
            .find_map(|symbol| match symbol {
                StackSymbol::Terminal(terminal) => Some(*terminal),
                _ => None,
            })
            .unwrap_or(Terminal::End)
    }

    /// Push a symbol as is.
    pub fn push(&mut self, symbol: StackSymbol) {
        self.symbols.push(symbol);
    }

    /// Mark a handle start just above the topmost terminal, then push `terminal`.
    pub fn shift(&mut self, terminal: Terminal) {
        let at = self
            .symbols
            .iter()
            .rposition(|symbol| matches!(symbol, StackSymbol::Terminal(_)))
            .map_or(0, |index| index + 1);
        self.symbols.insert(at, StackSymbol::HandleStart);
        self.symbols.push(StackSymbol::Terminal(terminal));
    }

    fn handle_start(&self) -> Option<usize> {
        self.symbols
            .iter()
            .rposition(|symbol| *symbol == StackSymbol::HandleStart)
    }

    /// Symbols above the most recent handle marker.
    pub fn handle(&self) -> &[StackSymbol] {
        let from = self.handle_start().map_or(0, |index| index + 1);
        &self.symbols[from..]
    }

    /// Recognise the handle as a grammar rule.
    pub fn rule(&self) -> Result<Rule, ParseError> {
        use StackSymbol::{Expr, Terminal as T};

        match self.handle() {
            [Expr, T(terminal), Expr] => match terminal.operator() {
                Some(op) => Ok(Rule::Binary(op)),
                None => Err(self.unknown_rule()),
            },
            [T(Terminal::LParen), Expr, T(Terminal::RParen)] => Ok(Rule::Parenthesized),
            [T(Terminal::Operand)] => Ok(Rule::Operand),
            _ => Err(self.unknown_rule()),
        }
    }

    fn unknown_rule(&self) -> ParseError {
        ParseError::UnknownRule {
            rule: Handle(self.handle()).to_string(),
        }
    }

    /// Replace the handle and its marker with a single `E`.
    pub fn reduce(&mut self) {
        let from = self.handle_start().unwrap_or(0);
        self.symbols.truncate(from);
        self.symbols.push(StackSymbol::Expr);
    }
}

/// Renders a handle the way grammar rules are written, e.g. `E+E`.
struct Handle<'a>(&'a [StackSymbol]);

impl Display for Handle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in self.0 {
            match symbol {
                StackSymbol::Terminal(terminal) => terminal.fmt(f)?,
                StackSymbol::Expr => f.write_char('E')?,
                StackSymbol::HandleStart => f.write_char('<')?,
            }
        }
        Ok(())
    }
}

/// Builds the expression tree as reductions happen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeBuilder {
    nodes: Vec<ExpressionTree>,
}

impl TreeBuilder {
    /// Push a new operand leaf.
    pub fn push_leaf(&mut self, token: Token) {
        self.nodes.push(ExpressionTree::leaf(token));
    }

    /// Pop the two most recent subtrees and push them joined by `op`.
    pub fn combine(&mut self, op: Operator) -> Result<(), ParseError> {
        let right = self.nodes.pop().ok_or(ParseError::MissingOperand)?;
        let left = self.nodes.pop().ok_or(ParseError::MissingOperand)?;
        self.nodes.push(ExpressionTree::binary(op, left, right));
        Ok(())
    }

    /// Number of subtrees not yet joined.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing has been built.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The finished tree, or `None` for an empty expression.
    pub fn finish(mut self) -> Result<Option<ExpressionTree>, ParseError> {
        let root = self.nodes.pop();
        if self.nodes.is_empty() {
            Ok(root)
        } else {
            Err(ParseError::DanglingOperand)
        }
    }
}

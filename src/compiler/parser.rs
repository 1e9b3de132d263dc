use super::precedence::{relation, Action, Terminal};
use super::stack::{Rule, StackSymbol, SymbolStack, TreeBuilder};
use crate::{ast::*, exit_code, Punct, Token, TokenKind};
use thiserror::Error;
use tracing::{debug, trace};

/// Anything that can hand out tokens one at a time.
///
/// Implemented for every token iterator; an exhausted iterator keeps
/// yielding end-of-input tokens.
pub trait TokenSource {
    /// The next token of the input.
    fn next_token(&mut self) -> Token;
}

impl<I: Iterator<Item = Token>> TokenSource for I {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or_else(Token::eof)
    }
}

/// Parses expressions with an operator-precedence table.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ExpressionParser {
    max_depth: usize,
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new()
    }
}

/// A syntax error in an expression.
#[derive(Debug, Error, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum ParseError {
    #[error("syntax error: unexpected `{token}` in expression")]
    UnexpectedToken { token: String },
    #[error("syntax error: `{incoming}` cannot follow `{top}`")]
    NoRelation { top: Terminal, incoming: Terminal },
    #[error("syntax error: unknown rule `{rule}`")]
    UnknownRule { rule: String },
    #[error("syntax error: operator is missing an operand")]
    MissingOperand,
    #[error("syntax error: operand without operator")]
    DanglingOperand,
    #[error("syntax error: expression is not terminated")]
    Unterminated,
    #[error("max depth exceeded")]
    MaxDepthExceeded,
}

impl ParseError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MaxDepthExceeded => exit_code::INTERNAL,
            _ => exit_code::SYNTAX,
        }
    }
}

/// A parsed expression and the token that ended it.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct ParsedExpression {
    /// The expression tree, `None` if the expression was empty.
    pub tree: Option<ExpressionTree>,
    /// The `;` or unmatched `)` that ended the expression, or the `(` of a call.
    pub terminator: Token,
}

impl ExpressionParser {
    /// Create a configurable parser.
    pub fn new() -> Self {
        Self { max_depth: 50 }
    }

    /// Return a [`ParseError`] if parentheses nest deeper than this.
    ///
    /// Default: 50
    pub fn with_max_depth(mut self, max: usize) -> Self {
        self.max_depth = max;
        self
    }

    /// Parse an expression starting with `first`, pulling further tokens from `source`.
    ///
    /// Parsing stops at a `;`, at a `)` with no matching `(`, or at the `(`
    /// directly after an operand (a function call). The stopping token is
    /// consumed and returned as the terminator.
    pub fn parse<S: TokenSource + ?Sized>(
        &self,
        first: Token,
        source: &mut S,
    ) -> Result<ParsedExpression, ParseError> {
        let mut input = Input::new(first, self.max_depth)?;
        let mut stack = SymbolStack::new();
        let mut tree = TreeBuilder::default();

        loop {
            let incoming = input.terminal()?;
            let top = stack.top_terminal();
            if top == Terminal::End && incoming == Terminal::End {
                break;
            }

            let action = relation(top, incoming);
            trace!(%top, %incoming, ?action, "precedence step");
            match action {
                Action::Shift => {
                    if let Some(token) = input.current.take() {
                        if incoming == Terminal::Operand {
                            tree.push_leaf(token);
                        }
                    }
                    stack.shift(incoming);
                    input.advance(source)?;
                }
                Action::Reduce => reduce(&mut stack, &mut tree)?,
                Action::Match => {
                    stack.push(StackSymbol::Terminal(incoming));
                    reduce(&mut stack, &mut tree)?;
                    input.current = None;
                    input.advance(source)?;
                }
                Action::Call => {
                    input.terminator = input.current.take();
                    break;
                }
                Action::Error => return Err(ParseError::NoRelation { top, incoming }),
            }
        }

        let terminator = input.terminator.ok_or(ParseError::Unterminated)?;
        let tree = tree.finish()?;
        debug!(
            terminator = %terminator,
            depth = tree.as_ref().map_or(0, ExpressionTree::depth),
            "expression parsed"
        );
        Ok(ParsedExpression { tree, terminator })
    }

    /// Parse an expression and append it to `ast` in postfix order.
    ///
    /// Returns the terminating token, which is not appended.
    pub fn parse_into<S: TokenSource + ?Sized>(
        &self,
        first: Token,
        source: &mut S,
        ast: &mut Ast,
    ) -> Result<Token, ParseError> {
        let ParsedExpression { tree, terminator } = self.parse(first, source)?;
        if let Some(tree) = tree {
            tree.append_postfix(ast);
        }
        Ok(terminator)
    }
}

fn reduce(stack: &mut SymbolStack, tree: &mut TreeBuilder) -> Result<(), ParseError> {
    match stack.rule()? {
        Rule::Binary(op) => tree.combine(op)?,
        Rule::Parenthesized | Rule::Operand => {}
    }
    stack.reduce();
    Ok(())
}

/// Lookahead state: the current token, the bracket balance, and the
/// terminator once it has been seen.
struct Input {
    /// `None` once the terminator was captured; it then reads as `$`.
    current: Option<Token>,
    terminator: Option<Token>,
    brackets: i32,
    max_depth: usize,
}

impl Input {
    fn new(first: Token, max_depth: usize) -> Result<Self, ParseError> {
        let mut input = Self {
            current: None,
            terminator: None,
            brackets: 0,
            max_depth,
        };
        input.accept(first)?;
        Ok(input)
    }

    /// Classify the current token.
    fn terminal(&self) -> Result<Terminal, ParseError> {
        let Some(token) = &self.current else {
            return Ok(Terminal::End);
        };
        match token.kind {
            _ if token.is_operand() => Ok(Terminal::Operand),
            TokenKind::Operator(op) => Ok(Terminal::from(op)),
            TokenKind::Punct(Punct::LParen) => Ok(Terminal::LParen),
            TokenKind::Punct(Punct::RParen) => Ok(Terminal::RParen),
            _ => Err(ParseError::UnexpectedToken {
                token: token.to_string(),
            }),
        }
    }

    /// Move to the next token unless the terminator was already captured.
    fn advance<S: TokenSource + ?Sized>(&mut self, source: &mut S) -> Result<(), ParseError> {
        if self.terminator.is_some() {
            self.current = None;
            return Ok(());
        }
        self.accept(source.next_token())
    }

    fn accept(&mut self, token: Token) -> Result<(), ParseError> {
        if token.is_punct(Punct::LParen) {
            self.brackets += 1;
            if self.brackets as usize > self.max_depth {
                return Err(ParseError::MaxDepthExceeded);
            }
        } else if token.is_punct(Punct::RParen) {
            self.brackets -= 1;
        }

        if token.is_punct(Punct::Semicolon) || self.brackets < 0 {
            self.terminator = Some(token);
            self.current = None;
        } else {
            self.current = Some(token);
        }
        Ok(())
    }
}

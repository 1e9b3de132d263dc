//! Abstract syntax tree type definitions.
//!
//! A program reaches the code generator as a flat chain of tokens in which
//! every expression has already been linearized into postfix order. The chain
//! lives in an arena addressed by [`NodeId`]; traversal state is an explicit
//! [`Cursor`] value rather than a pointer shared between callers.

mod expression;
pub use expression::*;

use crate::Token;

/// Index of a node in an [`Ast`].
pub type NodeId = usize;

/// One link of the chain.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct AstNode {
    /// The token this node carries.
    pub token: Token,
    /// The following node, if any.
    pub next: Option<NodeId>,
}

/// A program as a forward-navigable chain of tokens.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ast {
    nodes: Vec<AstNode>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
}

/// Read position in an [`Ast`]. Past the last node it reads as end of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor(Option<NodeId>);

impl Cursor {
    /// The node under the cursor, if the cursor is not past the end.
    pub fn node(self) -> Option<NodeId> {
        self.0
    }
}

static END_OF_INPUT: Token = Token {
    kind: crate::TokenKind::Eof,
    lexeme: String::new(),
};

impl Ast {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a token to the end of the chain.
    pub fn append(&mut self, token: Token) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(AstNode { token, next: None });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    /// Number of nodes in the chain.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look a node up by id.
    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    /// A cursor at the first node.
    pub fn cursor(&self) -> Cursor {
        Cursor(self.head)
    }

    /// The token under the cursor.
    pub fn token(&self, at: Cursor) -> &Token {
        at.0
            .and_then(|id| self.nodes.get(id))
            .map_or(&END_OF_INPUT, |node| &node.token)
    }

    /// The cursor one node further along the chain.
    pub fn advance(&self, at: Cursor) -> Cursor {
        Cursor(at.0.and_then(|id| self.nodes.get(id)).and_then(|node| node.next))
    }

    /// The token `n` nodes past the cursor.
    pub fn peek(&self, at: Cursor, n: usize) -> &Token {
        let at = (0..n).fold(at, |at, _| self.advance(at));
        self.token(at)
    }

    /// Tokens in chain order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> + '_ {
        let mut at = self.cursor();
        std::iter::from_fn(move || {
            let id = at.0?;
            at = self.advance(at);
            self.nodes.get(id).map(|node| &node.token)
        })
    }
}

impl Extend<Token> for Ast {
    fn extend<T: IntoIterator<Item = Token>>(&mut self, iter: T) {
        for token in iter {
            self.append(token);
        }
    }
}

impl FromIterator<Token> for Ast {
    fn from_iter<T: IntoIterator<Item = Token>>(iter: T) -> Self {
        let mut ast = Self::new();
        ast.extend(iter);
        ast
    }
}

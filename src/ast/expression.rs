use super::Ast;
use crate::{Operator, Token};

/// A binary expression tree built by the precedence parser.
///
/// Leaves are operands (identifiers and literals); inner nodes are operators
/// that own both of their subtrees.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct ExpressionTree {
    /// Operand or operator token.
    pub token: Token,
    /// Left-hand side operand.
    pub left: Option<Box<ExpressionTree>>,
    /// Right-hand side operand.
    pub right: Option<Box<ExpressionTree>>,
}

impl ExpressionTree {
    /// An operand without children.
    pub fn leaf(token: Token) -> Self {
        Self {
            token,
            left: None,
            right: None,
        }
    }

    /// `left op right`
    pub fn binary(op: Operator, left: ExpressionTree, right: ExpressionTree) -> Self {
        Self {
            token: Token::operator(op),
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        }
    }

    /// Whether this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 1)];
        while let Some((node, level)) = pending.pop() {
            deepest = deepest.max(level);
            pending.extend(node.children().map(|child| (child, level + 1)));
        }
        deepest
    }

    /// Tokens in postfix order: left subtree, right subtree, then the node.
    pub fn postfix(&self) -> Vec<&Token> {
        // Node, right, left; reversed at the end.
        let mut out = Vec::new();
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            out.push(&node.token);
            pending.extend(node.children());
        }
        out.reverse();
        out
    }

    /// Append the tree to `ast` in postfix order, consuming it.
    pub fn append_postfix(mut self, ast: &mut Ast) {
        let mut tokens = vec![std::mem::replace(&mut self.token, Token::eof())];
        let mut pending: Vec<Box<ExpressionTree>> = self.take_children().collect();
        while let Some(mut node) = pending.pop() {
            tokens.push(std::mem::replace(&mut node.token, Token::eof()));
            pending.extend(node.take_children());
        }
        ast.extend(tokens.into_iter().rev());
    }

    fn children(&self) -> impl Iterator<Item = &ExpressionTree> {
        self.left.as_deref().into_iter().chain(self.right.as_deref())
    }

    fn take_children(&mut self) -> impl Iterator<Item = Box<ExpressionTree>> {
        self.left.take().into_iter().chain(self.right.take())
    }
}

// Long left-associative chains are as deep as they are wide.
impl Drop for ExpressionTree {
    fn drop(&mut self) {
        let mut pending: Vec<Box<ExpressionTree>> = self.take_children().collect();
        while let Some(mut node) = pending.pop() {
            pending.extend(node.take_children());
        }
    }
}

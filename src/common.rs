use std::fmt::{self, Display};

/// Process exit codes used by the compiler and by the programs it generates.
pub mod exit_code {
    /// Malformed expression rejected by the precedence parser.
    pub const SYNTAX: i32 = 2;
    /// Operand of the wrong type, e.g. `null` reaching an arithmetic operator.
    pub const TYPE_MISMATCH: i32 = 7;
    /// Integer division by zero in a generated program.
    pub const DIVISION_BY_ZERO: i32 = 57;
    /// Internal failure of the compiler itself.
    pub const INTERNAL: i32 = 99;
}

/// A binary operator of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
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
}

impl Operator {
    /// Every operator, in precedence-table order.
    pub const ALL: [Operator; 10] = [
        Self::Mul,
        Self::Div,
        Self::Add,
        Self::Sub,
        Self::Eq,
        Self::Ne,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Ge,
    ];

    /// Source text of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
        }
    }

    /// Look an operator up by its source text.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// `==` and `!=`, the only operators that accept `null` operands.
    pub fn is_equality(self) -> bool {
        matches!(self, Self::Eq | Self::Ne)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Reserved words that steer statement generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Keyword {
    /// `var`
    Var,
    /// `const`
    Const,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `pub`
    Pub,
    /// `fn`
    Fn,
    /// `return`
    Return,
}

impl Keyword {
    /// Source text of the keyword.
    pub fn text(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Const => "const",
            Self::If => "if",
            Self::Else => "else",
            Self::While => "while",
            Self::Pub => "pub",
            Self::Fn => "fn",
            Self::Return => "return",
        }
    }

    /// Look a keyword up by its source text.
    pub fn from_text(text: &str) -> Option<Self> {
        [
            Self::Var,
            Self::Const,
            Self::If,
            Self::Else,
            Self::While,
            Self::Pub,
            Self::Fn,
            Self::Return,
        ]
        .into_iter()
        .find(|keyword| keyword.text() == text)
    }
}

/// Punctuation that delimits statements, blocks and argument lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Punct {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `;`
    Semicolon,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `|`
    Pipe,
    /// `=`
    Assign,
}

impl Punct {
    /// Source text of the punctuator.
    pub fn text(self) -> &'static str {
        match self {
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Pipe => "|",
            Self::Assign => "=",
        }
    }

    /// Look a punctuator up by its source text.
    pub fn from_text(text: &str) -> Option<Self> {
        [
            Self::LParen,
            Self::RParen,
            Self::LBrace,
            Self::RBrace,
            Self::Semicolon,
            Self::Colon,
            Self::Comma,
            Self::Pipe,
            Self::Assign,
        ]
        .into_iter()
        .find(|punct| punct.text() == text)
    }
}

/// Classification of a token, decided once by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// Variable or function name, including qualified builtins like `ifj.write`.
    Identifier,
    /// Decimal integer literal.
    Int,
    /// Floating point literal.
    Float,
    /// String literal; the lexeme holds the decoded content without quotes.
    String,
    /// `null`
    Null,
    /// See [`Operator`].
    Operator(Operator),
    /// See [`Keyword`].
    Keyword(Keyword),
    /// See [`Punct`].
    Punct(Punct),
    /// Type annotation such as `i32`, `?[]u8` or `void`.
    Type,
    /// End of input.
    Eof,
}

/// A lexeme together with its classification.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source text (decoded content for string literals).
    pub lexeme: String,
}

impl Token {
    /// Create a token from its parts.
    pub fn new(kind: TokenKind, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
        }
    }

    /// `name`
    pub fn identifier(name: impl Into<String>) -> Self {
        Self::new(TokenKind::Identifier, name)
    }

    /// `42`
    pub fn int(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Int, text)
    }

    /// `3.14`
    pub fn float(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Float, text)
    }

    /// `"hello"`, given the decoded content.
    pub fn string(content: impl Into<String>) -> Self {
        Self::new(TokenKind::String, content)
    }

    /// `null`
    pub fn null() -> Self {
        Self::new(TokenKind::Null, "null")
    }

    /// An operator token.
    pub fn operator(op: Operator) -> Self {
        Self::new(TokenKind::Operator(op), op.symbol())
    }

    /// A keyword token.
    pub fn keyword(keyword: Keyword) -> Self {
        Self::new(TokenKind::Keyword(keyword), keyword.text())
    }

    /// A punctuator token.
    pub fn punct(punct: Punct) -> Self {
        Self::new(TokenKind::Punct(punct), punct.text())
    }

    /// A type annotation token.
    pub fn type_name(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Type, text)
    }

    /// End of input.
    pub fn eof() -> Self {
        Self::new(TokenKind::Eof, "")
    }

    /// Whether this is the given punctuator.
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    /// Whether this is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    /// Whether this is the end of input.
    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Identifiers and literals, the `i` of the precedence grammar.
    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Identifier
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::String
                | TokenKind::Null
        )
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.lexeme),
            _ => f.write_str(&self.lexeme),
        }
    }
}

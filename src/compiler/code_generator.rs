use super::{builtins, operators::operand};
use crate::{ast::*, bytecode::*, exit_code, Keyword, Punct, Token, TokenKind};
use std::collections::TryReserveError;
use thiserror::Error;
use tracing::debug;

/// Global scratch variables defined at the start of every program.
pub(super) mod scratch {
    /// Result of an `if`/`while` condition.
    pub const CONDITION: &str = "__condition_bool";
    /// Right operand of a binary operation while its type is checked.
    pub const OPERAND_RIGHT: &str = "__type_conver_var1";
    /// Left operand of a binary operation while its type is checked.
    pub const OPERAND_LEFT: &str = "__type_conver_var2";
    /// Type name of the right operand.
    pub const TYPE_RIGHT: &str = "__type_conver_type1";
    /// Type name of the left operand.
    pub const TYPE_LEFT: &str = "__type_conver_type2";
    /// Whether both operand types match.
    pub const TYPES_EQUAL: &str = "__type_conver_res";
    /// Divisor while it is checked for zero.
    pub const DIVISOR: &str = "__typecheck_var";
    /// Type name of the divisor.
    pub const DIVISOR_TYPE: &str = "__typecheck_type";
    /// Nullable value tested by `if (x) |y|` and `while (x) |y|`.
    pub const UNWRAP: &str = "__extcheck_var";
    /// Type name of the nullable value.
    pub const UNWRAP_TYPE: &str = "__extcheck_type";
    /// Runtime count of declarations executed in the current call.
    pub const DECL_COUNT: &str = "__decl_cnt";
    /// Whether a declaration was already executed.
    pub const DECL_DONE: &str = "__decl_bool";
    /// Sink for discarded values, `_ = expr;`.
    pub const DISCARD: &str = "_";
}

/// Turns a linearized program syntax tree into stack-machine instructions.
pub struct CodeGenerator {
    pub(super) instructions: Vec<Instruction>,
    /// Compile-time twin of the runtime `__decl_cnt`, reset per function.
    pub(super) declarations: u32,
    pub(super) labels: LabelCounters,
    /// `while` bodies enclosing the statement being generated.
    loops: u32,
    depth: u32,
    max_instructions: u32,
    max_depth: u32,
}

/// One counter per label family, keeping every emitted label unique.
#[derive(Debug, Default)]
pub(super) struct LabelCounters {
    pub(super) if_statements: u32,
    pub(super) while_loops: u32,
    pub(super) declarations: u32,
    pub(super) binary_operations: u32,
    pub(super) divisions: u32,
}

/// Take the current value of a label counter and advance it.
pub(super) fn bump(counter: &mut u32) -> u32 {
    let value = *counter;
    *counter += 1;
    value
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// An error produced when compiling a program into instructions.
#[derive(Debug, Error, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum CompileError {
    #[error("unexpected token `{token}` in expression")]
    UnexpectedToken { token: String },
    #[error("invalid literal `{literal}`")]
    InvalidLiteral { literal: String },
    #[error("malformed syntax tree: expected {expected}, found {found}")]
    Malformed { expected: String, found: String },
    #[error("out of memory while escaping a string literal")]
    OutOfMemory(#[from] TryReserveError),
    #[error("max instructions exceeded")]
    MaxInstructionsExceeded,
    #[error("max depth exceeded")]
    MaxDepthExceeded,
}

impl CompileError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::UnexpectedToken { .. } | Self::InvalidLiteral { .. } => {
                exit_code::TYPE_MISMATCH
            }
            _ => exit_code::INTERNAL,
        }
    }

    fn malformed(expected: impl Into<String>, found: &Token) -> Self {
        Self::Malformed {
            expected: expected.into(),
            found: found.to_string(),
        }
    }
}

/// Step over a punctuator the tree must contain at this point.
fn expect_punct(ast: &Ast, at: Cursor, punct: Punct) -> Result<Cursor, CompileError> {
    let token = ast.token(at);
    if token.is_punct(punct) {
        Ok(ast.advance(at))
    } else {
        Err(CompileError::malformed(format!("`{}`", punct.text()), token))
    }
}

/// Step over a keyword the tree must contain at this point.
fn expect_keyword(ast: &Ast, at: Cursor, keyword: Keyword) -> Result<Cursor, CompileError> {
    let token = ast.token(at);
    if token.is_keyword(keyword) {
        Ok(ast.advance(at))
    } else {
        Err(CompileError::malformed(format!("`{}`", keyword.text()), token))
    }
}

fn identifier(ast: &Ast, at: Cursor) -> Result<String, CompileError> {
    let token = ast.token(at);
    match token.kind {
        TokenKind::Identifier => Ok(token.lexeme.clone()),
        _ => Err(CompileError::malformed("identifier", token)),
    }
}

/// Skip statements after a `return` up to the `}` closing the current block.
fn skip_unreachable(ast: &Ast, mut at: Cursor) -> Cursor {
    let mut depth = 0usize;
    loop {
        let token = ast.token(at);
        if token.is_eof() {
            return at;
        }
        if token.is_punct(Punct::LBrace) {
            depth += 1;
        } else if token.is_punct(Punct::RBrace) {
            if depth == 0 {
                return at;
            }
            depth -= 1;
        }
        at = ast.advance(at);
    }
}

/// Names declared inside the body of the `while` at `at`, binders of nested
/// `|y|` forms included, in order of first appearance.
fn loop_declarations(ast: &Ast, mut at: Cursor) -> Vec<String> {
    while !ast.token(at).is_eof() && !ast.token(at).is_punct(Punct::LBrace) {
        at = ast.advance(at);
    }

    let mut names: Vec<String> = Vec::new();
    let mut depth = 0usize;
    loop {
        let token = ast.token(at);
        if token.is_eof() {
            break;
        }
        if token.is_punct(Punct::LBrace) {
            depth += 1;
        } else if token.is_punct(Punct::RBrace) {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }

        let declares = token.is_keyword(Keyword::Var)
            || token.is_keyword(Keyword::Const)
            || (token.is_punct(Punct::Pipe) && ast.peek(at, 2).is_punct(Punct::Pipe));
        let name = ast.peek(at, 1);
        if declares && name.kind == TokenKind::Identifier && !names.contains(&name.lexeme) {
            names.push(name.lexeme.clone());
        }
        at = ast.advance(at);
    }
    names
}

/// Label of a function; qualified builtin names use `$` instead of `.`.
pub fn function_label(name: &str) -> String {
    name.replace('.', "$")
}

/// Where an assignment stores its value.
fn assignment_target(name: &str) -> Var {
    if name == scratch::DISCARD {
        Var::global(scratch::DISCARD)
    } else {
        Var::local(name)
    }
}

fn decl_count() -> Var {
    Var::global(scratch::DECL_COUNT)
}

impl CodeGenerator {
    /// Create a configurable code generator.
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
            declarations: 0,
            labels: LabelCounters::default(),
            loops: 0,
            depth: 0,
            max_instructions: 1_000_000,
            max_depth: 50,
        }
    }

    /// Return a [`CompileError`] if there would be more than `max` instructions.
    ///
    /// Default: 1 million
    pub fn with_max_instructions(mut self, max: u32) -> Self {
        self.max_instructions = max;
        self
    }

    /// Return a [`CompileError`] if blocks nest deeper than this.
    ///
    /// Default: 50
    pub fn with_max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    pub(super) fn emit(&mut self, inst: Instruction) -> Result<(), CompileError> {
        if self.instructions.len() >= self.max_instructions as usize {
            return Err(CompileError::MaxInstructionsExceeded);
        }
        self.instructions.push(inst);
        Ok(())
    }

    fn generate_prologue(&mut self) -> Result<(), CompileError> {
        for name in [
            scratch::CONDITION,
            scratch::OPERAND_RIGHT,
            scratch::OPERAND_LEFT,
            scratch::TYPE_RIGHT,
            scratch::TYPE_LEFT,
            scratch::TYPES_EQUAL,
            scratch::DIVISOR,
            scratch::DIVISOR_TYPE,
            scratch::UNWRAP,
            scratch::UNWRAP_TYPE,
            scratch::DECL_COUNT,
        ] {
            self.emit(Instruction::DefVar(Var::global(name)))?;
        }
        self.emit(Instruction::Move(decl_count(), Literal::Int(0).into()))?;
        self.emit(Instruction::DefVar(Var::global(scratch::DECL_DONE)))?;
        self.emit(Instruction::DefVar(Var::global(scratch::DISCARD)))?;

        self.emit(Instruction::CreateFrame)?;
        self.emit(Instruction::PushFrame)?;
        self.emit(Instruction::Call("main".into()))?;
        self.emit(Instruction::Exit(Literal::Int(0).into()))
    }

    /// Statements up to the next `}`, `return` or end of input.
    fn generate_block(&mut self, ast: &Ast, mut at: Cursor) -> Result<Cursor, CompileError> {
        if self.depth >= self.max_depth {
            return Err(CompileError::MaxDepthExceeded);
        }
        self.depth += 1;
        loop {
            let token = ast.token(at);
            at = match token.kind {
                TokenKind::Eof
                | TokenKind::Punct(Punct::RBrace)
                | TokenKind::Keyword(Keyword::Return) => break,
                TokenKind::Keyword(Keyword::Var | Keyword::Const) => {
                    self.generate_declaration(ast, at)?
                }
                TokenKind::Keyword(Keyword::If) => self.generate_if(ast, at)?,
                TokenKind::Keyword(Keyword::While) => self.generate_while(ast, at)?,
                TokenKind::Keyword(Keyword::Pub) => self.generate_function(ast, at)?,
                _ => self.generate_assignment_or_call(ast, at)?,
            };
        }
        self.depth -= 1;
        Ok(at)
    }

    /// A block that may end in `return`; unreachable statements after it are skipped.
    fn generate_body(&mut self, ast: &Ast, at: Cursor) -> Result<Cursor, CompileError> {
        let at = self.generate_block(ast, at)?;
        if ast.token(at).is_keyword(Keyword::Return) {
            let at = self.generate_return(ast, at)?;
            Ok(skip_unreachable(ast, at))
        } else {
            Ok(at)
        }
    }

    /// Allocate `LF@name` only the first time control reaches this point in a call.
    ///
    /// Only sound outside loops, where every point is reached at most once per
    /// call and the counter never runs ahead of the declarations emitted so far.
    fn generate_declaration_guard(&mut self, name: &str, skip: String) -> Result<(), CompileError> {
        self.emit(Instruction::Gt(
            Var::global(scratch::DECL_DONE),
            decl_count().into(),
            Literal::Int(i64::from(self.declarations)).into(),
        ))?;
        self.emit(Instruction::JumpIfEq(
            skip.clone(),
            Var::global(scratch::DECL_DONE).into(),
            Literal::Bool(true).into(),
        ))?;
        self.emit(Instruction::DefVar(Var::local(name)))?;
        self.declarations += 1;
        self.emit(Instruction::Move(
            decl_count(),
            Literal::Int(i64::from(self.declarations)).into(),
        ))?;
        self.emit(Instruction::Label(skip))
    }

    /// `var name [: type] = value;`
    fn generate_declaration(&mut self, ast: &Ast, at: Cursor) -> Result<Cursor, CompileError> {
        let at = ast.advance(at);
        let name = identifier(ast, at)?;
        if self.loops == 0 {
            let skip = format!("declskip{}", bump(&mut self.labels.declarations));
            self.generate_declaration_guard(&name, skip)?;
        }

        let mut at = ast.advance(at);
        if ast.token(at).is_punct(Punct::Colon) {
            at = ast.advance(ast.advance(at));
        }
        let at = expect_punct(ast, at, Punct::Assign)?;
        self.generate_initializer(ast, at, &name)
    }

    /// Right-hand side of a declaration or assignment, stored into `name`.
    fn generate_initializer(
        &mut self,
        ast: &Ast,
        at: Cursor,
        name: &str,
    ) -> Result<Cursor, CompileError> {
        let token = ast.token(at);
        if token.kind == TokenKind::Identifier && ast.peek(at, 1).is_punct(Punct::LParen) {
            let at = self.generate_call(ast, ast.advance(at), &token.lexeme)?;
            self.emit(Instruction::PopS(assignment_target(name)))?;
            self.emit(Instruction::PopS(decl_count()))?;
            Ok(at)
        } else {
            let at = self.generate_expression(ast, at)?;
            self.emit(Instruction::PopS(assignment_target(name)))?;
            expect_punct(ast, at, Punct::Semicolon)
        }
    }

    /// `name = value;` or `name(args);`
    fn generate_assignment_or_call(
        &mut self,
        ast: &Ast,
        at: Cursor,
    ) -> Result<Cursor, CompileError> {
        let name = identifier(ast, at)?;
        let at = ast.advance(at);
        let token = ast.token(at);
        match token.kind {
            TokenKind::Punct(Punct::Assign) => {
                self.generate_initializer(ast, ast.advance(at), &name)
            }
            TokenKind::Punct(Punct::LParen) => {
                let at = self.generate_call(ast, at, &name)?;
                self.emit(Instruction::PopS(decl_count()))?;
                Ok(at)
            }
            _ => Err(CompileError::malformed("`=` or `(`", token)),
        }
    }

    /// `(args);` of a call to `name`, leaving any result on the data stack
    /// above the caller's saved declaration counter.
    fn generate_call(&mut self, ast: &Ast, at: Cursor, name: &str) -> Result<Cursor, CompileError> {
        let mut at = expect_punct(ast, at, Punct::LParen)?;
        self.emit(Instruction::CreateFrame)?;

        let mut index = 0;
        while !ast.token(at).is_punct(Punct::RParen) {
            let slot = Var::temporary(format!("__arg{index}"));
            let value = operand(ast.token(at))?;
            self.emit(Instruction::DefVar(slot.clone()))?;
            self.emit(Instruction::Move(slot, value))?;

            at = ast.advance(at);
            if ast.token(at).is_punct(Punct::Comma) {
                at = ast.advance(at);
            }
            index += 1;
        }

        self.emit(Instruction::PushS(decl_count().into()))?;
        self.emit(Instruction::Move(decl_count(), Literal::Int(0).into()))?;
        self.emit(Instruction::PushFrame)?;
        self.emit(Instruction::Call(function_label(name)))?;

        expect_punct(ast, ast.advance(at), Punct::Semicolon)
    }

    /// Jump to `target` if `LF@subject` holds `null`.
    fn generate_null_check(&mut self, subject: &str, target: &str) -> Result<(), CompileError> {
        self.emit(Instruction::Move(
            Var::global(scratch::UNWRAP),
            Var::local(subject).into(),
        ))?;
        self.emit(Instruction::Type(
            Var::global(scratch::UNWRAP_TYPE),
            Var::global(scratch::UNWRAP).into(),
        ))?;
        self.emit(Instruction::JumpIfEq(
            target.to_owned(),
            Var::global(scratch::UNWRAP_TYPE).into(),
            Literal::Str("nil".into()).into(),
        ))
    }

    fn bind_unwrapped(&mut self, binding: &str) -> Result<(), CompileError> {
        self.emit(Instruction::Move(
            Var::local(binding),
            Var::global(scratch::UNWRAP).into(),
        ))
    }

    /// Pop a condition and jump to `target` when it equals `when`.
    fn generate_condition_jump(&mut self, target: String, when: bool) -> Result<(), CompileError> {
        self.emit(Instruction::PopS(Var::global(scratch::CONDITION)))?;
        self.emit(Instruction::JumpIfEq(
            target,
            Var::global(scratch::CONDITION).into(),
            Literal::Bool(when).into(),
        ))
    }

    /// `if (cond) { .. } else { .. }` and `if (x) |y| { .. } else { .. }`
    fn generate_if(&mut self, ast: &Ast, at: Cursor) -> Result<Cursor, CompileError> {
        let n = bump(&mut self.labels.if_statements);
        debug!(n, "generating if");
        let then_label = format!("if_then{n}");
        let else_label = format!("if_else{n}");
        let end_label = format!("if_end{n}");

        let at = expect_punct(ast, ast.advance(at), Punct::LParen)?;
        let at = if ast.peek(at, 2).is_punct(Punct::Pipe) {
            let binder = expect_punct(ast, ast.advance(at), Punct::RParen)?;
            let binder = expect_punct(ast, binder, Punct::Pipe)?;
            let subject = identifier(ast, at)?;
            let binding = identifier(ast, binder)?;

            self.generate_null_check(&subject, &else_label)?;
            if self.loops == 0 {
                self.generate_declaration_guard(&binding, format!("if_declskip{n}"))?;
            }
            self.bind_unwrapped(&binding)?;
            expect_punct(ast, ast.advance(binder), Punct::Pipe)?
        } else {
            let at = self.generate_expression(ast, at)?;
            let at = expect_punct(ast, at, Punct::RParen)?;
            self.generate_condition_jump(then_label.clone(), true)?;
            self.emit(Instruction::Jump(else_label.clone()))?;
            at
        };

        self.emit(Instruction::Label(then_label))?;
        let at = expect_punct(ast, at, Punct::LBrace)?;
        let at = self.generate_body(ast, at)?;
        self.emit(Instruction::Jump(end_label.clone()))?;

        let at = expect_punct(ast, at, Punct::RBrace)?;
        let at = expect_keyword(ast, at, Keyword::Else)?;
        let at = expect_punct(ast, at, Punct::LBrace)?;
        self.emit(Instruction::Label(else_label))?;
        let at = self.generate_body(ast, at)?;
        let at = expect_punct(ast, at, Punct::RBrace)?;

        self.emit(Instruction::Label(end_label))?;
        Ok(at)
    }

    /// `while (cond) { .. }` and `while (x) |y| { .. }`
    fn generate_while(&mut self, ast: &Ast, at: Cursor) -> Result<Cursor, CompileError> {
        let n = bump(&mut self.labels.while_loops);
        debug!(n, "generating while");
        let start_label = format!("while_start{n}");
        let end_label = format!("while_end{n}");

        // Everything the loop declares, at any nesting, is allocated once up front.
        if self.loops == 0 {
            for name in loop_declarations(ast, at) {
                let skip = format!("declskip{}", bump(&mut self.labels.declarations));
                self.generate_declaration_guard(&name, skip)?;
            }
        }

        let at = expect_punct(ast, ast.advance(at), Punct::LParen)?;
        let at = if ast.peek(at, 2).is_punct(Punct::Pipe) {
            let binder = expect_punct(ast, ast.advance(at), Punct::RParen)?;
            let binder = expect_punct(ast, binder, Punct::Pipe)?;
            let subject = identifier(ast, at)?;
            let binding = identifier(ast, binder)?;

            self.generate_null_check(&subject, &end_label)?;
            if self.loops == 0 {
                self.generate_declaration_guard(&binding, format!("while_declskip{n}"))?;
            }
            self.bind_unwrapped(&binding)?;

            // The subject may change inside the body, so every iteration re-checks and re-binds.
            self.emit(Instruction::Label(start_label.clone()))?;
            self.generate_null_check(&subject, &end_label)?;
            self.bind_unwrapped(&binding)?;
            expect_punct(ast, ast.advance(binder), Punct::Pipe)?
        } else {
            self.emit(Instruction::Label(start_label.clone()))?;
            let at = self.generate_expression(ast, at)?;
            let at = expect_punct(ast, at, Punct::RParen)?;
            self.generate_condition_jump(end_label.clone(), false)?;
            at
        };

        let at = expect_punct(ast, at, Punct::LBrace)?;
        self.loops += 1;
        let at = self.generate_body(ast, at)?;
        self.loops -= 1;
        let at = expect_punct(ast, at, Punct::RBrace)?;

        self.emit(Instruction::Jump(start_label))?;
        self.emit(Instruction::Label(end_label))?;
        Ok(at)
    }

    /// `pub fn name(param: type, ..) type { .. }`
    ///
    /// Stops on the closing `}` of the body.
    fn generate_function(&mut self, ast: &Ast, at: Cursor) -> Result<Cursor, CompileError> {
        let at = expect_keyword(ast, ast.advance(at), Keyword::Fn)?;
        let name = identifier(ast, at)?;
        debug!(function = %name, "generating function");

        self.emit(Instruction::Label(function_label(&name)))?;
        self.emit(Instruction::Move(decl_count(), Literal::Int(0).into()))?;
        self.declarations = 0;
        self.loops = 0;

        let mut at = expect_punct(ast, ast.advance(at), Punct::LParen)?;
        let mut index = 0;
        while !ast.token(at).is_punct(Punct::RParen) {
            let param = identifier(ast, at)?;
            at = expect_punct(ast, ast.advance(at), Punct::Colon)?;
            at = ast.advance(at);

            self.emit(Instruction::DefVar(Var::local(&param)))?;
            self.emit(Instruction::Move(
                Var::local(param),
                Var::local(format!("__arg{index}")).into(),
            ))?;
            index += 1;

            if ast.token(at).is_punct(Punct::Comma) {
                at = ast.advance(at);
            }
        }

        // `)` and the return type.
        let at = ast.advance(ast.advance(at));
        let at = expect_punct(ast, at, Punct::LBrace)?;
        let at = self.generate_body(ast, at)?;
        if !matches!(self.instructions.last(), Some(Instruction::Return)) {
            self.emit(Instruction::PopFrame)?;
            self.emit(Instruction::Return)?;
        }

        let token = ast.token(at);
        if token.is_punct(Punct::RBrace) {
            Ok(at)
        } else {
            Err(CompileError::malformed("`}`", token))
        }
    }

    /// `return [value];`, or the implicit return at a closing `}`.
    ///
    /// A returned value stays on top of the data stack for the caller.
    fn generate_return(&mut self, ast: &Ast, mut at: Cursor) -> Result<Cursor, CompileError> {
        if ast.token(at).is_keyword(Keyword::Return) {
            at = ast.advance(at);
            if !ast.token(at).is_punct(Punct::Semicolon) {
                at = self.generate_expression(ast, at)?;
            }
            at = expect_punct(ast, at, Punct::Semicolon)?;
        }
        self.emit(Instruction::PopFrame)?;
        self.emit(Instruction::Return)?;
        Ok(at)
    }

    /// Generate a whole program: prologue, every function, then the builtins.
    pub fn generate_program(mut self, ast: &Ast) -> Result<Program, CompileError> {
        self.generate_prologue()?;

        let mut at = ast.cursor();
        while !ast.token(at).is_eof() {
            at = self.generate_block(ast, at)?;
            // The `}` closing a function.
            at = ast.advance(at);
        }

        debug!("appending builtin functions");
        for inst in builtins::instructions() {
            self.emit(inst)?;
        }

        Ok(Program {
            instructions: self.instructions,
        })
    }
}

//! Postfix expressions to stack instructions, with runtime operand checks.

use super::code_generator::{bump, scratch, CodeGenerator, CompileError};
use crate::{ast::*, bytecode::*, exit_code, Operator, Punct, Token, TokenKind};

/// `string@name`, the form `TYPE` stores a type name in.
pub(super) fn type_tag(name: &str) -> Symbol {
    Literal::Str(name.to_owned()).into()
}

/// The value an operand token pushes or passes as an argument.
pub(super) fn operand(token: &Token) -> Result<Symbol, CompileError> {
    let invalid = || CompileError::InvalidLiteral {
        literal: token.lexeme.clone(),
    };
    let literal = match token.kind {
        TokenKind::Identifier => return Ok(Var::local(&token.lexeme).into()),
        TokenKind::Int => Literal::Int(token.lexeme.parse().map_err(|_| invalid())?),
        TokenKind::Float => Literal::Float(token.lexeme.parse().map_err(|_| invalid())?),
        TokenKind::String => Literal::Str(escape_string(&token.lexeme)?),
        TokenKind::Null => Literal::Nil,
        _ => {
            return Err(CompileError::UnexpectedToken {
                token: token.to_string(),
            })
        }
    };
    Ok(literal.into())
}

fn global(name: &str) -> Var {
    Var::global(name)
}

impl CodeGenerator {
    /// Emit a postfix expression up to the `;` or `)` that ends it.
    ///
    /// The result is left on top of the data stack. Returns a cursor at the terminator.
    pub(super) fn generate_expression(
        &mut self,
        ast: &Ast,
        mut at: Cursor,
    ) -> Result<Cursor, CompileError> {
        loop {
            let token = ast.token(at);
            match token.kind {
                TokenKind::Punct(Punct::Semicolon | Punct::RParen) => return Ok(at),
                TokenKind::Operator(op) => self.generate_operator(op)?,
                _ => self.emit(Instruction::PushS(operand(token)?))?,
            }
            at = ast.advance(at);
        }
    }

    fn generate_operator(&mut self, op: Operator) -> Result<(), CompileError> {
        self.generate_coercion(op.is_equality())?;
        match op {
            Operator::Mul => self.emit(Instruction::MulS),
            Operator::Div => self.generate_division(),
            Operator::Add => self.emit(Instruction::AddS),
            Operator::Sub => self.emit(Instruction::SubS),
            Operator::Eq => self.emit(Instruction::EqS),
            Operator::Ne => {
                self.emit(Instruction::EqS)?;
                self.emit(Instruction::NotS)
            }
            Operator::Lt => self.emit(Instruction::LtS),
            Operator::Gt => self.emit(Instruction::GtS),
            Operator::Le => {
                self.emit(Instruction::GtS)?;
                self.emit(Instruction::NotS)
            }
            Operator::Ge => {
                self.emit(Instruction::LtS)?;
                self.emit(Instruction::NotS)
            }
        }
    }

    /// Bring the two topmost operands to a common type.
    ///
    /// Operands of equal type are pushed back untouched, otherwise the int one is
    /// promoted to float. A `nil` operand exits with a type error unless
    /// `nullable`, in which case both are pushed back as they are.
    fn generate_coercion(&mut self, nullable: bool) -> Result<(), CompileError> {
        let n = bump(&mut self.labels.binary_operations);
        let push_back = format!("convert_push_back{n}");
        let second = format!("convert_second{n}");
        let end = format!("convert_end{n}");
        let null_exit = format!("null_error_exit{n}");
        let on_nil = if nullable { &push_back } else { &null_exit };

        self.emit(Instruction::PopS(global(scratch::OPERAND_RIGHT)))?;
        self.emit(Instruction::PopS(global(scratch::OPERAND_LEFT)))?;
        self.emit(Instruction::Type(
            global(scratch::TYPE_RIGHT),
            global(scratch::OPERAND_RIGHT).into(),
        ))?;
        self.emit(Instruction::Type(
            global(scratch::TYPE_LEFT),
            global(scratch::OPERAND_LEFT).into(),
        ))?;
        for ty in [scratch::TYPE_RIGHT, scratch::TYPE_LEFT] {
            self.emit(Instruction::JumpIfEq(
                on_nil.clone(),
                global(ty).into(),
                type_tag("nil"),
            ))?;
        }
        self.emit(Instruction::Eq(
            global(scratch::TYPES_EQUAL),
            global(scratch::TYPE_RIGHT).into(),
            global(scratch::TYPE_LEFT).into(),
        ))?;
        self.emit(Instruction::JumpIfEq(
            push_back.clone(),
            global(scratch::TYPES_EQUAL).into(),
            Literal::Bool(true).into(),
        ))?;
        self.emit(Instruction::JumpIfEq(
            second.clone(),
            global(scratch::TYPE_RIGHT).into(),
            type_tag("float"),
        ))?;

        // Right operand is the int one.
        self.emit(Instruction::PushS(global(scratch::OPERAND_LEFT).into()))?;
        self.emit(Instruction::PushS(global(scratch::OPERAND_RIGHT).into()))?;
        self.emit(Instruction::Int2FloatS)?;
        self.emit(Instruction::Jump(end.clone()))?;

        // Left operand is the int one.
        self.emit(Instruction::Label(second))?;
        self.emit(Instruction::PushS(global(scratch::OPERAND_LEFT).into()))?;
        self.emit(Instruction::Int2FloatS)?;
        self.emit(Instruction::PushS(global(scratch::OPERAND_RIGHT).into()))?;
        self.emit(Instruction::Jump(end.clone()))?;

        if !nullable {
            self.emit(Instruction::Label(null_exit))?;
            self.emit(Instruction::Exit(
                Literal::Int(exit_code::TYPE_MISMATCH.into()).into(),
            ))?;
        }

        self.emit(Instruction::Label(push_back))?;
        self.emit(Instruction::PushS(global(scratch::OPERAND_LEFT).into()))?;
        self.emit(Instruction::PushS(global(scratch::OPERAND_RIGHT).into()))?;
        self.emit(Instruction::Label(end))
    }

    /// Exit on an integer zero divisor, then divide with `IDIVS` or `DIVS`.
    fn generate_division(&mut self) -> Result<(), CompileError> {
        let n = bump(&mut self.labels.divisions);
        let continuation = format!("division_continuation{n}");
        let int_division = format!("__div_int{n}");
        let end = format!("__div_end{n}");

        self.emit(Instruction::PopS(global(scratch::DIVISOR)))?;
        self.emit(Instruction::Type(
            global(scratch::DIVISOR_TYPE),
            global(scratch::DIVISOR).into(),
        ))?;
        self.emit(Instruction::JumpIfNeq(
            continuation.clone(),
            global(scratch::DIVISOR_TYPE).into(),
            type_tag("int"),
        ))?;
        self.emit(Instruction::JumpIfNeq(
            continuation.clone(),
            global(scratch::DIVISOR).into(),
            Literal::Int(0).into(),
        ))?;
        self.emit(Instruction::Exit(
            Literal::Int(exit_code::DIVISION_BY_ZERO.into()).into(),
        ))?;

        self.emit(Instruction::Label(continuation))?;
        self.emit(Instruction::PushS(global(scratch::DIVISOR).into()))?;
        self.emit(Instruction::JumpIfEq(
            int_division.clone(),
            global(scratch::DIVISOR_TYPE).into(),
            type_tag("int"),
        ))?;
        self.emit(Instruction::DivS)?;
        self.emit(Instruction::Jump(end.clone()))?;
        self.emit(Instruction::Label(int_division))?;
        self.emit(Instruction::IDivS)?;
        self.emit(Instruction::Label(end))
    }
}

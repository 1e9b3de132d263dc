#![allow(dead_code)]

//! Shared helpers: a small lexer for program text, a front end that puts
//! expressions into postfix order, and a reference interpreter for the
//! generated instructions.

use ifjcode::bytecode::{hex_float, Frame, ValueType};
use ifjcode::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, one_of},
    combinator::{map, map_opt, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult, Parser,
};
use std::collections::{HashMap, VecDeque};

/// Whitespace and `//` comments.
fn blank(i: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            multispace1,
            preceded(tag("//"), take_while(|c| c != '\n')),
        ))),
    )
    .parse(i)
}

fn string(i: &str) -> IResult<&str, Token> {
    let escape = alt((
        value("\\", tag("\\")),
        value("\"", tag("\"")),
        value("\n", tag("n")),
        value("\t", tag("t")),
        value("\r", tag("r")),
    ));
    map(
        delimited(
            char('"'),
            opt(escaped_transform(is_not("\\\""), '\\', escape)),
            char('"'),
        ),
        |content: Option<String>| Token::string(content.unwrap_or_default()),
    )
    .parse(i)
}

fn number(i: &str) -> IResult<&str, Token> {
    let exponent = || (one_of("eE"), opt(one_of("+-")), digit1);
    alt((
        map(
            recognize((digit1, char('.'), digit1, opt(exponent()))),
            |text: &str| Token::float(text),
        ),
        map(recognize((digit1, exponent())), |text: &str| {
            Token::float(text)
        }),
        map(digit1, |text: &str| Token::int(text)),
    ))
    .parse(i)
}

/// `?i32`, `[]u8`, `?[]u8`
fn prefixed_type(i: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(alt((tag("?[]"), tag("?"), tag("[]"))), alphanumeric1)),
        |text: &str| Token::type_name(text),
    )
    .parse(i)
}

fn word(i: &str) -> IResult<&str, Token> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_"), tag(".")))),
        )),
        |text: &str| match text {
            "null" => Token::null(),
            "i32" | "f64" | "void" => Token::type_name(text),
            _ => match Keyword::from_text(text) {
                Some(keyword) => Token::keyword(keyword),
                None => Token::identifier(text),
            },
        },
    )
    .parse(i)
}

fn operator(i: &str) -> IResult<&str, Token> {
    map_opt(
        alt((
            tag("=="),
            tag("!="),
            tag("<="),
            tag(">="),
            tag("<"),
            tag(">"),
            tag("+"),
            tag("-"),
            tag("*"),
            tag("/"),
        )),
        |symbol: &str| Operator::from_symbol(symbol).map(Token::operator),
    )
    .parse(i)
}

fn punct(i: &str) -> IResult<&str, Token> {
    map_opt(
        recognize(one_of("(){};:,|=")),
        |text: &str| Punct::from_text(text).map(Token::punct),
    )
    .parse(i)
}

fn token(i: &str) -> IResult<&str, Token> {
    alt((string, number, prefixed_type, word, operator, punct)).parse(i)
}

/// Tokenize program text, ending with an end-of-input token.
pub fn lex(src: &str) -> Vec<Token> {
    let (rest, mut tokens) = many0(delimited(blank, token, blank))
        .parse(src)
        .expect("lexer never fails outright");
    assert!(rest.trim().is_empty(), "cannot tokenize `{rest}`");
    tokens.push(Token::eof());
    tokens
}

/// Whether an identifier followed by `(` starts at `i`.
fn is_call(tokens: &[Token], i: usize) -> bool {
    tokens.get(i).is_some_and(|t| t.kind == TokenKind::Identifier)
        && tokens.get(i + 1).is_some_and(|t| t.is_punct(Punct::LParen))
}

/// Whether an expression starts at `i`, right after the token at `i - 1`.
fn starts_expression(tokens: &[Token], i: usize) -> bool {
    let Some(previous) = i.checked_sub(1).and_then(|p| tokens.get(p)) else {
        return false;
    };
    match previous.kind {
        TokenKind::Punct(Punct::Assign) => !is_call(tokens, i),
        TokenKind::Keyword(Keyword::Return) => !tokens[i].is_punct(Punct::Semicolon),
        TokenKind::Punct(Punct::LParen) => {
            let condition = i
                .checked_sub(2)
                .and_then(|p| tokens.get(p))
                .is_some_and(|t| t.is_keyword(Keyword::If) || t.is_keyword(Keyword::While));
            let unwrap = tokens.get(i + 2).is_some_and(|t| t.is_punct(Punct::Pipe));
            condition && !unwrap
        }
        _ => false,
    }
}

/// Build the program chain, putting every expression into postfix order.
pub fn linearize(tokens: Vec<Token>) -> Result<Ast, ParseError> {
    let parser = ExpressionParser::new();
    let mut ast = Ast::new();
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].is_eof() {
            break;
        }
        if starts_expression(&tokens, i) {
            let mut rest = tokens[i + 1..].iter().cloned();
            let terminator = parser.parse_into(tokens[i].clone(), &mut rest, &mut ast)?;
            ast.append(terminator);
            i = tokens.len() - rest.len();
        } else {
            ast.append(tokens[i].clone());
            i += 1;
        }
    }
    Ok(ast)
}

/// Source text all the way to a generated program.
pub fn compile(src: &str) -> Program {
    let ast = linearize(lex(src)).expect("expressions parse");
    generate_code(&ast).expect("code generation succeeds")
}

/// A runtime value of the stack machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Nil,
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
        }
    }
}

/// Decode `\ddd` escapes of a `string@` immediate.
pub fn unescape(text: &str) -> String {
    let mut out = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let code: String = chars.by_ref().take(3).collect();
            let code: u32 = code.parse().expect("three decimal digits");
            out.push(char::from_u32(code).expect("valid character code"));
        } else {
            out.push(c);
        }
    }
    out
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub exit_code: i32,
    pub output: String,
}

type Scope = HashMap<String, Option<Value>>;

/// A reference interpreter for generated instructions.
pub struct Machine<'a> {
    instructions: &'a [Instruction],
    labels: HashMap<&'a str, usize>,
    globals: Scope,
    locals: Vec<Scope>,
    temporary: Option<Scope>,
    stack: Vec<Value>,
    calls: Vec<usize>,
    input: VecDeque<String>,
    output: String,
}

const STEP_LIMIT: usize = 1_000_000;

impl<'a> Machine<'a> {
    pub fn new(program: &'a Program, input: &[&str]) -> Self {
        let mut labels = HashMap::new();
        for (at, inst) in program.instructions.iter().enumerate() {
            if let Instruction::Label(name) = inst {
                assert!(labels.insert(name.as_str(), at).is_none(), "duplicate label {name}");
            }
        }
        Self {
            instructions: &program.instructions,
            labels,
            globals: Scope::new(),
            locals: Vec::new(),
            temporary: None,
            stack: Vec::new(),
            calls: Vec::new(),
            input: input.iter().map(|line| line.to_string()).collect(),
            output: String::new(),
        }
    }

    pub fn run(mut self) -> Outcome {
        let exit_code = match self.execute() {
            Ok(code) | Err(code) => code,
        };
        Outcome {
            exit_code,
            output: self.output,
        }
    }

    fn scope(&mut self, frame: Frame) -> Result<&mut Scope, i32> {
        match frame {
            Frame::Global => Ok(&mut self.globals),
            Frame::Local => self.locals.last_mut().ok_or(55),
            Frame::Temporary => self.temporary.as_mut().ok_or(55),
        }
    }

    fn define(&mut self, var: &Var) -> Result<(), i32> {
        let scope = self.scope(var.frame)?;
        if scope.insert(var.name.clone(), None).is_some() {
            return Err(52);
        }
        Ok(())
    }

    fn store(&mut self, var: &Var, value: Value) -> Result<(), i32> {
        let slot = self.scope(var.frame)?.get_mut(&var.name).ok_or(54)?;
        *slot = Some(value);
        Ok(())
    }

    /// The value of a symbol; `None` for a defined but uninitialized variable.
    fn load_raw(&mut self, symbol: &Symbol) -> Result<Option<Value>, i32> {
        Ok(match symbol {
            Symbol::Var(var) => self.scope(var.frame)?.get(&var.name).ok_or(54)?.clone(),
            Symbol::Literal(literal) => Some(match literal {
                Literal::Int(v) => Value::Int(*v),
                Literal::Float(v) => Value::Float(*v),
                Literal::Str(text) => Value::Str(unescape(text)),
                Literal::Bool(v) => Value::Bool(*v),
                Literal::Nil => Value::Nil,
            }),
        })
    }

    fn load(&mut self, symbol: &Symbol) -> Result<Value, i32> {
        self.load_raw(symbol)?.ok_or(56)
    }

    fn pop(&mut self) -> Result<Value, i32> {
        self.stack.pop().ok_or(56)
    }

    fn jump(&self, label: &str) -> Result<usize, i32> {
        self.labels.get(label).copied().ok_or(52)
    }

    fn execute(&mut self) -> Result<i32, i32> {
        let instructions = self.instructions;
        let mut pc = 0;
        let mut steps = 0;
        while let Some(inst) = instructions.get(pc) {
            steps += 1;
            assert!(steps < STEP_LIMIT, "program does not terminate");
            pc += 1;
            match inst {
                Instruction::DefVar(var) => self.define(var)?,
                Instruction::Move(var, symbol) => {
                    let value = self.load(symbol)?;
                    self.store(var, value)?;
                }
                Instruction::CreateFrame => self.temporary = Some(Scope::new()),
                Instruction::PushFrame => {
                    let frame = self.temporary.take().ok_or(55)?;
                    self.locals.push(frame);
                }
                Instruction::PopFrame => {
                    let frame = self.locals.pop().ok_or(55)?;
                    self.temporary = Some(frame);
                }
                Instruction::Call(label) => {
                    self.calls.push(pc);
                    pc = self.jump(label)?;
                }
                Instruction::Return => pc = self.calls.pop().ok_or(56)?,
                Instruction::Exit(symbol) => match self.load(symbol)? {
                    Value::Int(code @ 0..=49) => return Ok(code as i32),
                    Value::Int(_) => return Err(57),
                    _ => return Err(53),
                },
                Instruction::PushS(symbol) => {
                    let value = self.load(symbol)?;
                    self.stack.push(value);
                }
                Instruction::PopS(var) => {
                    let value = self.pop()?;
                    self.store(var, value)?;
                }
                Instruction::AddS
                | Instruction::SubS
                | Instruction::MulS
                | Instruction::DivS
                | Instruction::IDivS
                | Instruction::LtS
                | Instruction::GtS
                | Instruction::EqS => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    let result = binary(inst, a, b)?;
                    self.stack.push(result);
                }
                Instruction::NotS => match self.pop()? {
                    Value::Bool(v) => self.stack.push(Value::Bool(!v)),
                    _ => return Err(53),
                },
                Instruction::Int2FloatS => match self.pop()? {
                    Value::Int(v) => self.stack.push(Value::Float(v as f64)),
                    _ => return Err(53),
                },
                Instruction::Add(var, a, b)
                | Instruction::Lt(var, a, b)
                | Instruction::Gt(var, a, b)
                | Instruction::Eq(var, a, b) => {
                    let a = self.load(a)?;
                    let b = self.load(b)?;
                    let op = match inst {
                        Instruction::Add(..) => Instruction::AddS,
                        Instruction::Lt(..) => Instruction::LtS,
                        Instruction::Gt(..) => Instruction::GtS,
                        _ => Instruction::EqS,
                    };
                    let result = binary(&op, a, b)?;
                    self.store(var, result)?;
                }
                Instruction::Jump(label) => pc = self.jump(label)?,
                Instruction::JumpIfEq(label, a, b) | Instruction::JumpIfNeq(label, a, b) => {
                    let a = self.load(a)?;
                    let b = self.load(b)?;
                    let Value::Bool(equal) = binary(&Instruction::EqS, a, b)? else {
                        return Err(53);
                    };
                    let wanted = matches!(inst, Instruction::JumpIfEq(..));
                    if equal == wanted {
                        pc = self.jump(label)?;
                    }
                }
                Instruction::Label(_) => {}
                Instruction::Type(var, symbol) => {
                    let name = self
                        .load_raw(symbol)?
                        .map_or("", |value| value.type_name());
                    self.store(var, Value::Str(name.to_owned()))?;
                }
                Instruction::Int2Float(var, symbol) => match self.load(symbol)? {
                    Value::Int(v) => self.store(var, Value::Float(v as f64))?,
                    _ => return Err(53),
                },
                Instruction::Float2Int(var, symbol) => match self.load(symbol)? {
                    Value::Float(v) => self.store(var, Value::Int(v.trunc() as i64))?,
                    _ => return Err(53),
                },
                Instruction::Read(var, ty) => {
                    let line = self.input.pop_front();
                    let value = match (line, ty) {
                        (None, _) => Value::Nil,
                        (Some(line), ValueType::String) => Value::Str(line),
                        (Some(line), ValueType::Int) => {
                            line.trim().parse().map_or(Value::Nil, Value::Int)
                        }
                        (Some(line), ValueType::Float) => {
                            line.trim().parse().map_or(Value::Nil, Value::Float)
                        }
                        (Some(line), ValueType::Bool) => {
                            Value::Bool(line.trim().eq_ignore_ascii_case("true"))
                        }
                    };
                    self.store(var, value)?;
                }
                Instruction::Write(symbol) => {
                    let text = match self.load(symbol)? {
                        Value::Int(v) => v.to_string(),
                        Value::Float(v) => hex_float(v),
                        Value::Str(text) => text,
                        Value::Bool(v) => v.to_string(),
                        Value::Nil => String::new(),
                    };
                    self.output.push_str(&text);
                }
                Instruction::StrLen(var, symbol) => match self.load(symbol)? {
                    Value::Str(text) => self.store(var, Value::Int(text.chars().count() as i64))?,
                    _ => return Err(53),
                },
                Instruction::Concat(var, a, b) => match (self.load(a)?, self.load(b)?) {
                    (Value::Str(a), Value::Str(b)) => self.store(var, Value::Str(a + &b))?,
                    _ => return Err(53),
                },
                Instruction::GetChar(var, a, b) | Instruction::Stri2Int(var, a, b) => {
                    let (Value::Str(text), Value::Int(index)) = (self.load(a)?, self.load(b)?) else {
                        return Err(53);
                    };
                    let c = usize::try_from(index)
                        .ok()
                        .and_then(|index| text.chars().nth(index))
                        .ok_or(58)?;
                    let value = match inst {
                        Instruction::GetChar(..) => Value::Str(c.to_string()),
                        _ => Value::Int(i64::from(u32::from(c))),
                    };
                    self.store(var, value)?;
                }
                Instruction::Int2Char(var, symbol) => {
                    let Value::Int(code) = self.load(symbol)? else {
                        return Err(53);
                    };
                    let c = u32::try_from(code)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or(58)?;
                    self.store(var, Value::Str(c.to_string()))?;
                }
                other => panic!("unsupported instruction {other}"),
            }
        }
        Ok(0)
    }
}

fn binary(op: &Instruction, a: Value, b: Value) -> Result<Value, i32> {
    use Value::*;
    Ok(match (op, a, b) {
        (Instruction::EqS, Nil, Nil) => Bool(true),
        (Instruction::EqS, Nil, _) | (Instruction::EqS, _, Nil) => Bool(false),
        (_, Nil, _) | (_, _, Nil) => return Err(53),

        (Instruction::AddS, Int(a), Int(b)) => Int(a.wrapping_add(b)),
        (Instruction::SubS, Int(a), Int(b)) => Int(a.wrapping_sub(b)),
        (Instruction::MulS, Int(a), Int(b)) => Int(a.wrapping_mul(b)),
        (Instruction::IDivS, Int(_), Int(0)) => return Err(57),
        (Instruction::IDivS, Int(a), Int(b)) => Int(a.wrapping_div(b)),
        (Instruction::AddS, Float(a), Float(b)) => Float(a + b),
        (Instruction::SubS, Float(a), Float(b)) => Float(a - b),
        (Instruction::MulS, Float(a), Float(b)) => Float(a * b),
        (Instruction::DivS, Float(_), Float(b)) if b == 0.0 => return Err(57),
        (Instruction::DivS, Float(a), Float(b)) => Float(a / b),

        (Instruction::LtS, Int(a), Int(b)) => Bool(a < b),
        (Instruction::LtS, Float(a), Float(b)) => Bool(a < b),
        (Instruction::LtS, Str(a), Str(b)) => Bool(a < b),
        (Instruction::LtS, Bool(a), Bool(b)) => Bool(!a & b),
        (Instruction::GtS, Int(a), Int(b)) => Bool(a > b),
        (Instruction::GtS, Float(a), Float(b)) => Bool(a > b),
        (Instruction::GtS, Str(a), Str(b)) => Bool(a > b),
        (Instruction::GtS, Bool(a), Bool(b)) => Bool(a & !b),
        (Instruction::EqS, a, b) if a.type_name() == b.type_name() => Bool(a == b),
        _ => return Err(53),
    })
}

/// Run a generated program with the given input lines.
pub fn run(program: &Program, input: &[&str]) -> Outcome {
    Machine::new(program, input).run()
}

/// Compile and run source text.
pub fn execute(src: &str, input: &[&str]) -> Outcome {
    run(&compile(src), input)
}

/// `pub fn main() void { <body> }`
pub fn main_with(body: &str) -> String {
    format!("pub fn main() void {{\n{body}\n}}\n")
}

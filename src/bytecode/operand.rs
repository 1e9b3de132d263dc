use std::collections::TryReserveError;
use std::fmt::{self, Display};

/// A variable scope of the virtual machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Frame {
    /// `GF`, alive for the whole program.
    Global,
    /// `LF`, the frame of the running function.
    Local,
    /// `TF`, the frame being prepared for the next call.
    Temporary,
}

impl Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Global => "GF",
            Self::Local => "LF",
            Self::Temporary => "TF",
        })
    }
}

/// A frame-qualified variable, `LF@name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Var {
    /// Frame the variable lives in.
    pub frame: Frame,
    /// Variable name.
    pub name: String,
}

impl Var {
    /// `GF@name`
    pub fn global(name: impl Into<String>) -> Self {
        Self {
            frame: Frame::Global,
            name: name.into(),
        }
    }

    /// `LF@name`
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            frame: Frame::Local,
            name: name.into(),
        }
    }

    /// `TF@name`
    pub fn temporary(name: impl Into<String>) -> Self {
        Self {
            frame: Frame::Temporary,
            name: name.into(),
        }
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.frame, self.name)
    }
}

/// A typed immediate, `int@42`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    /// `int@42`
    Int(i64),
    /// `float@0x1.8p+1`
    Float(f64),
    /// `string@text`, holding text already in escaped form (see [`escape_string`]).
    Str(String),
    /// `bool@true`
    Bool(bool),
    /// `nil@nil`
    Nil,
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "int@{value}"),
            Self::Float(value) => write!(f, "float@{}", hex_float(*value)),
            Self::Str(text) => write!(f, "string@{text}"),
            Self::Bool(value) => write!(f, "bool@{value}"),
            Self::Nil => f.write_str("nil@nil"),
        }
    }
}

/// Instruction operand: a variable or an immediate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Symbol {
    /// See [`Var`].
    Var(Var),
    /// See [`Literal`].
    Literal(Literal),
}

impl From<Var> for Symbol {
    fn from(var: Var) -> Self {
        Self::Var(var)
    }
}

impl From<Literal> for Symbol {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(var) => var.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

/// Type operand of `READ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueType {
    /// `int`
    Int,
    /// `float`
    Float,
    /// `string`
    String,
    /// `bool`
    Bool,
}

impl ValueType {
    /// The name `TYPE` reports for values of this type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
        }
    }
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format a float the way C's `%a` does, e.g. `0x1.8p+1` for `3.0`.
///
/// The encoding is exact, so the value survives the round trip unchanged.
pub fn hex_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        let text = if value < 0.0 { "-inf" } else { "inf" };
        return text.to_owned();
    }

    let bits = value.to_bits();
    let sign = if bits >> 63 == 1 { "-" } else { "" };
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let mantissa = bits & 0x000f_ffff_ffff_ffff;

    if exponent == 0 && mantissa == 0 {
        return format!("{sign}0x0p+0");
    }
    // Subnormals keep a zero lead digit and the minimum exponent.
    let (lead, exponent) = if exponent == 0 {
        (0, -1022)
    } else {
        (1, exponent - 1023)
    };

    let mut digits = format!("{mantissa:013x}");
    while digits.ends_with('0') {
        digits.pop();
    }
    let point = if digits.is_empty() { "" } else { "." };
    format!("{sign}0x{lead}{point}{digits}p{exponent:+}")
}

/// Escape text for a `string@` immediate.
///
/// Bytes up to and including space, `#` and `\` become `\0dd` (decimal);
/// everything else is copied unchanged.
pub fn escape_string(input: &str) -> Result<String, TryReserveError> {
    let mut escaped = String::new();
    escaped.try_reserve(input.len() * 4)?;
    for c in input.chars() {
        match u32::from(c) {
            code @ (0..=32 | 35 | 92) => {
                escaped.push('\\');
                escaped.push('0');
                escaped.push(char::from(b'0' + ((code / 10) % 10) as u8));
                escaped.push(char::from(b'0' + (code % 10) as u8));
            }
            _ => escaped.push(c),
        }
    }
    Ok(escaped)
}

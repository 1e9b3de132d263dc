//! Parse expressions and compile a program syntax tree to stack-machine code.

mod builtins;
mod code_generator;
pub use code_generator::*;
mod operators;
mod parser;
pub use parser::*;
pub mod precedence;
pub mod stack;

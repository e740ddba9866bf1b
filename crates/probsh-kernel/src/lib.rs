//! probsh kernel: the language and formatting core of the probe shell.
//!
//! The shell reads lines that are either raw assembly (passed straight to
//! the assembler) or `:commands`. This crate owns everything between a
//! command line and its effect:
//!
//! - **Lexing and parsing**: `:name` commands with C-style expression
//!   arguments ([`lexer`], [`parser`], [`ast`])
//! - **Evaluation**: arbitrary-precision integers and strings, with
//!   `$register` variables resolved through a trait ([`eval`],
//!   [`probsh_types::Value`])
//! - **Binary formatting**: registers, floats (including x87 80-bit), and
//!   memory dump cells decoded from raw snapshot bytes ([`format`],
//!   [`memory`])
//! - **Register model**: the x86-64 register table with status bit
//!   breakdown and x87 tag word reconstruction ([`registers`],
//!   [`x86_64`], [`x87`])
//!
//! The crate is deliberately backend-free: it never touches ptrace or a
//! target process, it only transforms text and bytes. That keeps every
//! piece testable with fixture buffers.

pub mod ast;
pub mod eval;
pub mod format;
pub mod lexer;
pub mod memory;
pub mod parser;
pub mod registers;
pub mod x86_64;
pub mod x87;

pub use ast::{ArgExpr, BinaryOp, CommandExpr, Expr, UnaryOp};
pub use eval::{eval_command, eval_expr, EmptyResolver, EvalError, VariableResolver};
pub use format::{
    escape_char, format_float32, format_float64, format_float80, format_integer, Endianness,
    FormatError, FormatSpec, Radix, Signedness, Width,
};
pub use lexer::{tokenize_command, tokenize_expression, LexError, Spanned, Token};
pub use parser::{parse_command_line, parse_expression_line, ParseError, SyntaxError};
pub use probsh_types::{Argument, Command, Value, ValueError};
pub use x86_64::{format_register, REGISTERS};

use std::fmt;

/// Any way a command line can fail before reaching its handler.
#[derive(Debug, Clone, PartialEq)]
pub enum LineError {
    /// One or more lexical or parse errors; all of them are reported.
    Syntax(Vec<SyntaxError>),
    Eval(EvalError),
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineError::Syntax(errors) => {
                for (i, error) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", error)?;
                }
                Ok(())
            }
            LineError::Eval(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for LineError {}

impl From<Vec<SyntaxError>> for LineError {
    fn from(errors: Vec<SyntaxError>) -> LineError {
        LineError::Syntax(errors)
    }
}

impl From<EvalError> for LineError {
    fn from(error: EvalError) -> LineError {
        LineError::Eval(error)
    }
}

/// Parse and evaluate a `:command` line down to its dispatchable form.
#[tracing::instrument(level = "debug", skip(resolver))]
pub fn evaluate_command_line(
    line: &str,
    resolver: &dyn VariableResolver,
) -> Result<Command, LineError> {
    let cmd = parse_command_line(line)?;
    let cmd = eval_command(&cmd, resolver)?;
    tracing::debug!(name = %cmd.name, args = cmd.args.len(), "evaluated command");
    Ok(cmd)
}

/// Parse and evaluate a bare expression, e.g. for `:print`.
#[tracing::instrument(level = "debug", skip(resolver))]
pub fn evaluate_expression(
    source: &str,
    resolver: &dyn VariableResolver,
) -> Result<Value, LineError> {
    let expr = parse_expression_line(source)?;
    Ok(eval_expr(&expr, resolver)?)
}

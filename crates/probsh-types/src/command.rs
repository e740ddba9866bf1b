//! The evaluated form of a command line.
//!
//! The kernel parses `:name arg arg ...` into a syntax tree and evaluates
//! each argument down to this flat shape, which is what command handlers
//! actually receive.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A fully evaluated command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// The name after the leading `:`, e.g. `registers` for `:registers`.
    pub name: String,
    pub args: Vec<Argument>,
}

/// One evaluated command argument.
///
/// Bare identifiers pass through unevaluated so commands can accept
/// keywords (`:registers general`) without quoting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Ident(String),
    Value(Value),
}

impl Argument {
    /// The argument as text: the identifier itself, or the value's display
    /// form.
    pub fn as_text(&self) -> String {
        match self {
            Argument::Ident(name) => name.clone(),
            Argument::Value(value) => value.to_string(),
        }
    }
}

//! Shared value types for probsh.
//!
//! This crate defines the runtime value model used by the expression
//! evaluator and the command dispatcher. It is deliberately small so that
//! frontends (REPL, tests, remote clients) can depend on it without pulling
//! in the whole kernel.

pub mod command;
pub mod value;

pub use command::{Argument, Command};
pub use value::{Value, ValueError};

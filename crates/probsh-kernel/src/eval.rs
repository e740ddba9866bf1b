//! Tree-walking evaluator for probsh expressions.
//!
//! Evaluation is fail-fast: the first type error or unresolved variable
//! aborts the walk. The only exception is the short-circuit of `&&` and
//! `||`, which skips the right operand entirely, so `0 && (1 / 0)` is 0
//! rather than a division error.

use crate::ast::{ArgExpr, BinaryOp, CommandExpr, Expr, UnaryOp};
use probsh_types::{Argument, Command, Value, ValueError};
use std::collections::HashMap;

/// Resolves `$name` references during evaluation.
///
/// The debugger backend implements this against the live register file;
/// tests use a [`HashMap`] or closure.
pub trait VariableResolver {
    fn resolve(&self, name: &str) -> Option<Value>;
}

/// A resolver with no variables at all.
pub struct EmptyResolver;

impl VariableResolver for EmptyResolver {
    fn resolve(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl VariableResolver for HashMap<String, Value> {
    fn resolve(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

impl<F> VariableResolver for F
where
    F: Fn(&str) -> Option<Value>,
{
    fn resolve(&self, name: &str) -> Option<Value> {
        self(name)
    }
}

/// Evaluation error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("unknown variable: ${0}")]
    UnresolvedVariable(String),
}

/// Evaluate an expression tree down to a [`Value`].
pub fn eval_expr(expr: &Expr, resolver: &dyn VariableResolver) -> Result<Value, EvalError> {
    match expr {
        Expr::Integer(n) => Ok(Value::Integer(n.clone())),
        Expr::String(s) => Ok(Value::String(s.clone())),
        Expr::Variable(name) => resolver
            .resolve(name)
            .ok_or_else(|| EvalError::UnresolvedVariable(name.clone())),
        Expr::Paren(inner) => eval_expr(inner, resolver),
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand, resolver)?;
            let result = match op {
                UnaryOp::Pos => value.pos()?,
                UnaryOp::Neg => value.neg()?,
                UnaryOp::Invert => value.invert()?,
                UnaryOp::Not => value.not(),
            };
            Ok(result)
        }
        Expr::Binary { op, lhs, rhs } => eval_binary(*op, lhs, rhs, resolver),
    }
}

fn eval_binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    resolver: &dyn VariableResolver,
) -> Result<Value, EvalError> {
    // Short-circuit operators evaluate the right side conditionally and
    // always produce 0 or 1.
    match op {
        BinaryOp::And => {
            let lhs = eval_expr(lhs, resolver)?;
            if !lhs.is_truthy() {
                return Ok(Value::from_bool(false));
            }
            let rhs = eval_expr(rhs, resolver)?;
            return Ok(Value::from_bool(rhs.is_truthy()));
        }
        BinaryOp::Or => {
            let lhs = eval_expr(lhs, resolver)?;
            if lhs.is_truthy() {
                return Ok(Value::from_bool(true));
            }
            let rhs = eval_expr(rhs, resolver)?;
            return Ok(Value::from_bool(rhs.is_truthy()));
        }
        _ => {}
    }

    let lhs = eval_expr(lhs, resolver)?;
    let rhs = eval_expr(rhs, resolver)?;
    let result = match op {
        BinaryOp::BitOr => lhs.bit_or(&rhs)?,
        BinaryOp::BitXor => lhs.bit_xor(&rhs)?,
        BinaryOp::BitAnd => lhs.bit_and(&rhs)?,
        BinaryOp::Eq => lhs.equals(&rhs),
        BinaryOp::Ne => lhs.not_equals(&rhs),
        BinaryOp::Lt => lhs.less_than(&rhs)?,
        BinaryOp::Le => lhs.less_equal(&rhs)?,
        BinaryOp::Gt => lhs.greater_than(&rhs)?,
        BinaryOp::Ge => lhs.greater_equal(&rhs)?,
        BinaryOp::Shl => lhs.shift_left(&rhs)?,
        BinaryOp::Shr => lhs.shift_right(&rhs)?,
        BinaryOp::Add => lhs.add(&rhs)?,
        BinaryOp::Sub => lhs.sub(&rhs)?,
        BinaryOp::Mul => lhs.mul(&rhs)?,
        BinaryOp::Div => lhs.div(&rhs)?,
        BinaryOp::Rem => lhs.rem(&rhs)?,
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    };
    Ok(result)
}

/// Evaluate every argument of a parsed command line.
///
/// Bare identifiers pass through unevaluated; everything else becomes a
/// [`Value`].
pub fn eval_command(
    cmd: &CommandExpr,
    resolver: &dyn VariableResolver,
) -> Result<Command, EvalError> {
    let mut args = Vec::with_capacity(cmd.args.len());
    for arg in &cmd.args {
        match arg {
            ArgExpr::Ident(name) => args.push(Argument::Ident(name.clone())),
            ArgExpr::Expr(expr) => args.push(Argument::Value(eval_expr(expr, resolver)?)),
        }
    }
    Ok(Command {
        name: cmd.name.clone(),
        args,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression_line;

    fn eval(source: &str) -> Value {
        let expr = parse_expression_line(source).expect("parse should succeed");
        eval_expr(&expr, &EmptyResolver).expect("eval should succeed")
    }

    fn eval_err(source: &str) -> EvalError {
        let expr = parse_expression_line(source).expect("parse should succeed");
        eval_expr(&expr, &EmptyResolver).expect_err("eval should fail")
    }

    #[test]
    fn test_short_circuit_skips_division_by_zero() {
        assert_eq!(eval("0 && (1 / 0)"), Value::int(0));
        assert_eq!(eval("1 || (1 / 0)"), Value::int(1));
    }

    #[test]
    fn test_logical_operators_coerce_to_integer() {
        assert_eq!(eval("\"a\" && \"b\""), Value::int(1));
        assert_eq!(eval("\"a\" && \"\""), Value::int(0));
        assert_eq!(eval("\"\" || \"b\""), Value::int(1));
    }

    #[test]
    fn test_unevaluated_side_may_contain_type_errors() {
        assert_eq!(eval("0 && (\"x\" - 1)"), Value::int(0));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        assert_eq!(
            eval_err("1 / 0"),
            EvalError::Value(ValueError::DivisionByZero)
        );
    }

    #[test]
    fn test_variable_resolution() {
        let mut vars = HashMap::new();
        vars.insert("rax".to_string(), Value::int(0x42));
        let expr = parse_expression_line("$rax + 1").unwrap();
        assert_eq!(eval_expr(&expr, &vars).unwrap(), Value::int(0x43));
    }

    #[test]
    fn test_unresolved_variable() {
        assert_eq!(
            eval_err("$nope"),
            EvalError::UnresolvedVariable("nope".to_string())
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |name: &str| {
            if name == "pc" {
                Some(Value::int(0x1000))
            } else {
                None
            }
        };
        let expr = parse_expression_line("$pc").unwrap();
        assert_eq!(eval_expr(&expr, &resolver).unwrap(), Value::int(0x1000));
    }

    #[test]
    fn test_command_arguments_evaluate() {
        let cmd = crate::parser::parse_command_line(":memory ($addr + 8) x").unwrap();
        let resolver = |name: &str| {
            if name == "addr" {
                Some(Value::int(0x7f00))
            } else {
                None
            }
        };
        let cmd = eval_command(&cmd, &resolver).unwrap();
        assert_eq!(cmd.name, "memory");
        assert_eq!(cmd.args[0], Argument::Value(Value::int(0x7f08)));
        assert_eq!(cmd.args[1], Argument::Ident("x".to_string()));
    }
}

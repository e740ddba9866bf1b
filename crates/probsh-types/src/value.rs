//! Runtime values for probsh expressions.
//!
//! Every expression evaluates to a [`Value`]: an arbitrary-precision integer
//! or a string. Operator semantics live here so that the evaluator is a thin
//! tree walk and frontends can reuse the same typing rules.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A type error raised by an operator, or an arithmetic fault.
///
/// Type errors render as `unsupported type for <op>: "<type>"` so the
/// frontend can print them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    #[error("unsupported type for {operator}: \"{operand}\"")]
    UnaryType {
        operator: &'static str,
        operand: &'static str,
    },
    #[error("unsupported type for {operator}: \"{lhs}\" and \"{rhs}\"")]
    BinaryType {
        operator: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("shift count out of range")]
    ShiftOverflow,
}

/// A runtime value.
///
/// Integers are arbitrary precision: register contents, addresses, and
/// immediates must never silently wrap or lose bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Integer(BigInt),
    String(String),
}

impl Value {
    /// Build an integer value from anything convertible to a `BigInt`.
    pub fn int(n: impl Into<BigInt>) -> Value {
        Value::Integer(n.into())
    }

    /// Build a string value.
    pub fn string(s: impl Into<String>) -> Value {
        Value::String(s.into())
    }

    /// Booleans are represented as the integers 0 and 1.
    pub fn from_bool(b: bool) -> Value {
        Value::Integer(if b { BigInt::from(1) } else { BigInt::from(0) })
    }

    /// The type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::String(_) => "string",
        }
    }

    /// Truthiness: zero and the empty string are false, everything else true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Integer(n) => !n.is_zero(),
            Value::String(s) => !s.is_empty(),
        }
    }

    fn unary_type_error(&self, operator: &'static str) -> ValueError {
        ValueError::UnaryType {
            operator,
            operand: self.type_name(),
        }
    }

    fn binary_type_error(&self, operator: &'static str, other: &Value) -> ValueError {
        ValueError::BinaryType {
            operator,
            lhs: self.type_name(),
            rhs: other.type_name(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Binary operators
    // ═══════════════════════════════════════════════════════════════════

    pub fn bit_or(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a | b)),
            _ => Err(self.binary_type_error("|", other)),
        }
    }

    pub fn bit_xor(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a ^ b)),
            _ => Err(self.binary_type_error("^", other)),
        }
    }

    pub fn bit_and(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a & b)),
            _ => Err(self.binary_type_error("&", other)),
        }
    }

    /// `==` never raises a type error: values of different types are simply
    /// unequal.
    pub fn equals(&self, other: &Value) -> Value {
        Value::from_bool(self == other)
    }

    pub fn not_equals(&self, other: &Value) -> Value {
        Value::from_bool(self != other)
    }

    pub fn less_than(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::from_bool(a < b)),
            (Value::String(a), Value::String(b)) => Ok(Value::from_bool(a < b)),
            _ => Err(self.binary_type_error("<", other)),
        }
    }

    pub fn less_equal(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::from_bool(a <= b)),
            (Value::String(a), Value::String(b)) => Ok(Value::from_bool(a <= b)),
            _ => Err(self.binary_type_error("<=", other)),
        }
    }

    pub fn greater_than(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::from_bool(a > b)),
            (Value::String(a), Value::String(b)) => Ok(Value::from_bool(a > b)),
            _ => Err(self.binary_type_error(">", other)),
        }
    }

    pub fn greater_equal(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::from_bool(a >= b)),
            (Value::String(a), Value::String(b)) => Ok(Value::from_bool(a >= b)),
            _ => Err(self.binary_type_error(">=", other)),
        }
    }

    /// `<<`. A negative count shifts in the opposite direction.
    pub fn shift_left(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                let count = b.to_i64().ok_or(ValueError::ShiftOverflow)?;
                Ok(Value::Integer(shift(a, count)))
            }
            _ => Err(self.binary_type_error("<<", other)),
        }
    }

    /// `>>` is an arithmetic shift: it floors, so `-1 >> 1 == -1`.
    pub fn shift_right(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                let count = b.to_i64().ok_or(ValueError::ShiftOverflow)?;
                Ok(Value::Integer(shift(a, -count)))
            }
            _ => Err(self.binary_type_error(">>", other)),
        }
    }

    /// `+` is addition for integers and concatenation for strings.
    pub fn add(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a + b)),
            (Value::String(a), Value::String(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Ok(Value::String(s))
            }
            _ => Err(self.binary_type_error("+", other)),
        }
    }

    pub fn sub(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a - b)),
            _ => Err(self.binary_type_error("-", other)),
        }
    }

    pub fn mul(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a * b)),
            _ => Err(self.binary_type_error("*", other)),
        }
    }

    /// `/` truncates toward zero.
    pub fn div(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                if b.is_zero() {
                    Err(ValueError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a / b))
                }
            }
            _ => Err(self.binary_type_error("/", other)),
        }
    }

    /// `%` takes the sign of the dividend.
    pub fn rem(&self, other: &Value) -> Result<Value, ValueError> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => {
                if b.is_zero() {
                    Err(ValueError::DivisionByZero)
                } else {
                    Ok(Value::Integer(a % b))
                }
            }
            _ => Err(self.binary_type_error("%", other)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Unary operators
    // ═══════════════════════════════════════════════════════════════════

    pub fn pos(&self) -> Result<Value, ValueError> {
        match self {
            Value::Integer(_) => Ok(self.clone()),
            _ => Err(self.unary_type_error("+")),
        }
    }

    pub fn neg(&self) -> Result<Value, ValueError> {
        match self {
            Value::Integer(n) => Ok(Value::Integer(-n)),
            _ => Err(self.unary_type_error("-")),
        }
    }

    /// `~x` is `-(x + 1)`, as for two's complement of any width.
    pub fn invert(&self) -> Result<Value, ValueError> {
        match self {
            Value::Integer(n) => Ok(Value::Integer(-(n + BigInt::from(1)))),
            _ => Err(self.unary_type_error("~")),
        }
    }

    /// `!x` works on any type via truthiness.
    pub fn not(&self) -> Value {
        Value::from_bool(!self.is_truthy())
    }
}

fn shift(n: &BigInt, count: i64) -> BigInt {
    if count >= 0 {
        n << count as u64
    } else {
        n >> count.unsigned_abs()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Value {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

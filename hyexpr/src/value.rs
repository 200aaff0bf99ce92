//! Native values: what a field holds on a loaded instance, and what a literal
//! expression evaluates to.
//!
//! Arithmetic follows SQL conventions where they are unambiguous: `Null`
//! absorbs every operator, integers promote to floats when mixed, and
//! concatenation renders both operands as text.
use std::fmt;

use enum_map::Enum;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::error::{ExprError, ExprResult};
use crate::expr::Operator;

/// A plain, non-symbolic value.
#[derive(Debug, Clone, PartialEq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Discriminant of [`Value`], used as a type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Enum)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
        })
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Evaluate `self <op> rhs`.
    ///
    /// ```
    /// # use hyexpr::{Value, expr::Operator};
    /// assert_eq!(Value::Int(1).apply(Operator::Add, &Value::Int(20)), Ok(Value::Int(21)));
    /// assert_eq!(Value::Int(1).apply(Operator::Add, &Value::Null), Ok(Value::Null));
    /// assert_eq!(
    ///     Value::from("a").apply(Operator::Concat, &Value::Int(1)),
    ///     Ok(Value::from("a1"))
    /// );
    /// ```
    pub fn apply(&self, op: Operator, rhs: &Value) -> ExprResult<Value> {
        use Value::*;

        let incompatible = || ExprError::IncompatibleOperands {
            op,
            lhs: self.kind(),
            rhs: rhs.kind(),
        };

        match (self, rhs) {
            (Null, _) | (_, Null) => Ok(Null),
            (lhs, rhs) if op == Operator::Concat => Ok(Text(format!(
                "{}{}",
                lhs.to_text(),
                rhs.to_text()
            ))),
            (Int(a), Int(b)) => Self::apply_int(op, *a, *b),
            (Int(_) | Float(_), Int(_) | Float(_)) => {
                // Both sides have a float view at this point.
                let (a, b) = match (self.as_float(), rhs.as_float()) {
                    (Some(a), Some(b)) => (a, b),
                    _ => return Err(incompatible()),
                };
                Self::apply_float(op, a, b)
            }
            _ => Err(incompatible()),
        }
    }

    fn apply_int(op: Operator, a: i64, b: i64) -> ExprResult<Value> {
        let overflow = ExprError::Overflow { op };
        let result = match op {
            Operator::Add => a.checked_add(b),
            Operator::Sub => a.checked_sub(b),
            Operator::Mul => a.checked_mul(b),
            Operator::Div | Operator::Mod if b == 0 => return Err(ExprError::DivisionByZero),
            Operator::Div => a.checked_div(b),
            Operator::Mod => a.checked_rem(b),
            Operator::Concat => unreachable!("concatenation is handled before numeric dispatch"),
        };
        result.map(Value::Int).ok_or(overflow)
    }

    fn apply_float(op: Operator, a: f64, b: f64) -> ExprResult<Value> {
        let result = match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div | Operator::Mod if b == 0.0 => return Err(ExprError::DivisionByZero),
            Operator::Div => a / b,
            Operator::Mod => a % b,
            Operator::Concat => unreachable!("concatenation is handled before numeric dispatch"),
        };
        Ok(Value::Float(result))
    }

    /// Arithmetic negation. `Null` stays `Null`.
    pub fn negate(&self) -> ExprResult<Value> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Int(v) => v
                .checked_neg()
                .map(Value::Int)
                .ok_or(ExprError::Overflow { op: Operator::Sub }),
            Value::Float(v) => Ok(Value::Float(-v)),
            other => Err(ExprError::NotNegatable { kind: other.kind() }),
        }
    }

    /// Unquoted textual rendering, used by concatenation.
    fn to_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Text(v) => write!(f, "'{}'", v.replace('\'', "''")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_numeric_promotes_to_float() {
        assert_eq!(
            Value::Int(3).apply(Operator::Mul, &Value::Float(0.5)),
            Ok(Value::Float(1.5))
        );
    }

    #[test]
    fn integer_division_checks_zero_and_overflow() {
        assert_eq!(
            Value::Int(3).apply(Operator::Div, &Value::Int(0)),
            Err(ExprError::DivisionByZero)
        );
        assert_eq!(
            Value::Int(i64::MIN).apply(Operator::Div, &Value::Int(-1)),
            Err(ExprError::Overflow { op: Operator::Div })
        );
        assert_eq!(
            Value::Int(i64::MAX).apply(Operator::Add, &Value::Int(1)),
            Err(ExprError::Overflow { op: Operator::Add })
        );
    }

    #[test]
    fn text_arithmetic_is_rejected() {
        let err = Value::from("hello")
            .apply(Operator::Add, &Value::Int(1))
            .unwrap_err();
        assert_eq!(
            err,
            ExprError::IncompatibleOperands {
                op: Operator::Add,
                lhs: ValueKind::Text,
                rhs: ValueKind::Int,
            }
        );
    }

    #[test]
    fn display_quotes_text() {
        assert_eq!(Value::from("it's").to_string(), "'it''s'");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::from(None::<i64>).to_string(), "NULL");
    }

    #[test]
    fn negate_bool_fails() {
        assert!(Value::Bool(true).negate().unwrap_err().is_not_negatable());
        assert_eq!(Value::Int(4).negate(), Ok(Value::Int(-4)));
    }
}

use strum::EnumIs;
use thiserror::Error;

use crate::expr::Operator;
use crate::value::ValueKind;

/// Errors raised while evaluating expressions over native values.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum ExprError {
    /// The operator is not defined for the given operand kinds.
    #[error("Operator `{op}` is not defined between `{lhs}` and `{rhs}` values.")]
    IncompatibleOperands {
        op: Operator,
        lhs: ValueKind,
        rhs: ValueKind,
    },

    /// Negation of a value that has no numeric representation.
    #[error("Cannot negate a `{kind}` value.")]
    NotNegatable { kind: ValueKind },

    #[error("Division by zero.")]
    DivisionByZero,

    /// Integer arithmetic left the `i64` range.
    #[error("Integer overflow while evaluating `{op}`.")]
    Overflow { op: Operator },
}

pub type ExprResult<T> = Result<T, ExprError>;

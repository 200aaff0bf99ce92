//! Values produced by hybrid functions.
//!
//! A hybrid function returns a native [`Value`] when evaluated on an instance and a
//! symbolic [`QueryExpr`] when evaluated on the class. [`Term`] is the closed set of both,
//! and arithmetic on terms picks the right side: native operands are computed right away,
//! anything symbolic yields a larger expression.
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

use enum_map::Enum;
use hyexpr::{ExprKind, Operator, QueryExpr, Value, ValueKind, expr::lit};
use strum::{EnumIs, EnumIter, IntoStaticStr};

use crate::utils::error::HyResult;

/// Result of a hybrid function.
#[derive(Debug, Clone, PartialEq, EnumIs)]
pub enum Term {
    /// A plain value, already computed.
    Native(Value),
    /// A query fragment to be evaluated by the database.
    Symbolic(QueryExpr),
}

/// Runtime type tag of a [`Term`].
///
/// One tag per [`Value`] variant and per [`QueryExpr`] variant; this is the key the
/// [`WrapperRegistry`](crate::registry::WrapperRegistry) dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, EnumIter, IntoStaticStr)]
pub enum TermKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Field,
    Literal,
    Combined,
    Negate,
    Func,
}

impl TermKind {
    pub fn is_symbolic(self) -> bool {
        matches!(
            self,
            TermKind::Field
                | TermKind::Literal
                | TermKind::Combined
                | TermKind::Negate
                | TermKind::Func
        )
    }
}

impl From<ValueKind> for TermKind {
    fn from(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Null => TermKind::Null,
            ValueKind::Bool => TermKind::Bool,
            ValueKind::Int => TermKind::Int,
            ValueKind::Float => TermKind::Float,
            ValueKind::Text => TermKind::Text,
        }
    }
}

impl From<ExprKind> for TermKind {
    fn from(kind: ExprKind) -> Self {
        match kind {
            ExprKind::Field => TermKind::Field,
            ExprKind::Literal => TermKind::Literal,
            ExprKind::Combined => TermKind::Combined,
            ExprKind::Negate => TermKind::Negate,
            ExprKind::Func => TermKind::Func,
        }
    }
}

impl std::fmt::Display for TermKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = (*self).into();
        f.write_str(name)
    }
}

impl Term {
    pub fn kind(&self) -> TermKind {
        match self {
            Term::Native(value) => value.kind().into(),
            Term::Symbolic(expr) => expr.kind().into(),
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Term::Native(value) => Some(value),
            Term::Symbolic(_) => None,
        }
    }

    pub fn as_expr(&self) -> Option<&QueryExpr> {
        match self {
            Term::Native(_) => None,
            Term::Symbolic(expr) => Some(expr),
        }
    }

    /// Lift the term into the expression language; native values become literals.
    pub fn into_expr(self) -> QueryExpr {
        match self {
            Term::Native(value) => lit(value),
            Term::Symbolic(expr) => expr,
        }
    }

    /// Apply a binary operator.
    ///
    /// Two native operands are computed immediately (and may fail, e.g. on division by
    /// zero); otherwise the result is the combined expression.
    ///
    /// ```
    /// # use hyprop::{Term, hyexpr::{Operator, Value, expr::F}};
    /// let native = Term::from(1).combine(Operator::Add, 20).unwrap();
    /// assert_eq!(native, Term::Native(Value::Int(21)));
    ///
    /// let symbolic = Term::from(F("a")).combine(Operator::Add, 20).unwrap();
    /// assert_eq!(symbolic, Term::Symbolic(F("a") + 20));
    /// ```
    pub fn combine(self, op: Operator, rhs: impl Into<Term>) -> HyResult<Term> {
        Ok(match (self, rhs.into()) {
            (Term::Native(a), Term::Native(b)) => Term::Native(a.apply(op, &b)?),
            (a, b) => Term::Symbolic(a.into_expr().combine(op, b.into_expr())),
        })
    }

    /// String concatenation (`||`).
    pub fn concat(self, rhs: impl Into<Term>) -> HyResult<Term> {
        self.combine(Operator::Concat, rhs)
    }

    pub fn negate(self) -> HyResult<Term> {
        Ok(match self {
            Term::Native(value) => Term::Native(value.negate()?),
            Term::Symbolic(expr) => Term::Symbolic(-expr),
        })
    }

    /// Call a query function.
    ///
    /// When every argument is native and the function is one the expression language
    /// evaluates itself (`LOWER`, `UPPER`, `COALESCE`, ...), the call is computed; in any
    /// other case the call is kept symbolic.
    pub fn call(name: impl AsRef<str>, args: impl IntoIterator<Item = Term>) -> HyResult<Term> {
        let args: Vec<Term> = args.into_iter().collect();
        let all_native = args.iter().all(Term::is_native);
        let call = hyexpr::expr::func(name, args.into_iter().map(Term::into_expr));

        if all_native {
            if let Some(value) = call.evaluate(&mut |_| None)? {
                return Ok(Term::Native(value));
            }
        }
        Ok(Term::Symbolic(call))
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Native(value) => std::fmt::Display::fmt(value, f),
            Term::Symbolic(expr) => std::fmt::Display::fmt(expr, f),
        }
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        Term::Native(value)
    }
}

impl From<QueryExpr> for Term {
    fn from(expr: QueryExpr) -> Self {
        Term::Symbolic(expr)
    }
}

macro_rules! impl_native_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Term {
                fn from(value: $ty) -> Self {
                    Term::Native(Value::from(value))
                }
            }
        )*
    };
}

impl_native_from!(bool, i32, i64, u32, f64, &str, String);

macro_rules! impl_term_op {
    ($($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl<R: Into<Term>> $trait<R> for Term {
                type Output = HyResult<Term>;

                fn $method(self, rhs: R) -> Self::Output {
                    self.combine($op, rhs)
                }
            }
        )*
    };
}

impl_term_op!(
    Add::add => Operator::Add,
    Sub::sub => Operator::Sub,
    Mul::mul => Operator::Mul,
    Div::div => Operator::Div,
    Rem::rem => Operator::Mod,
);

impl Neg for Term {
    type Output = HyResult<Term>;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

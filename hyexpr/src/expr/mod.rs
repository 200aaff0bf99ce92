//! Query expressions: field references, literals, arithmetic and function calls.
//!
//! Role
//! - [`QueryExpr`] is the symbolic counterpart of a [`Value`]: where an instance holds
//!   `int_field = 1`, the class-level view of the same attribute is `F(int_field)`.
//! - Builders ([`F`], [`lit`], [`func`]) and operator overloads (`+`, `-`, `*`, `/`, `%`,
//!   unary `-`) compose expressions the way query-building code reads.
//!
//! Example
//! ```
//! use hyexpr::expr::*;
//!
//! let e = F("int_field") + 20;
//! assert_eq!(e.to_string(), "F(int_field) + 20");
//! assert_eq!(e.kind(), ExprKind::Combined);
//! ```
pub mod pretty;
pub mod variant;

use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::EnumIs;

use crate::error::ExprResult;
use crate::value::Value;
pub use variant::ExprKind;

/// Binary operators of [`QueryExpr::Combined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl Operator {
    /// Connector used when rendering the expression.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Concat => "||",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Concat => 1,
            Operator::Add | Operator::Sub => 2,
            Operator::Mul | Operator::Div | Operator::Mod => 3,
        }
    }

    /// Whether `a op (b op c)` equals `(a op b) op c`, allowing the printer to drop
    /// parentheses on the right-hand side.
    pub fn is_associative(self) -> bool {
        matches!(self, Operator::Add | Operator::Mul | Operator::Concat)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A symbolic query expression.
///
/// Equality is structural: two independently built trees with the same nodes compare
/// equal.
///
/// Dropping is iterative, as are the traversals in [`crate::walker`]. `Clone`, equality,
/// [`QueryExpr::evaluate`] and rendering recurse on the depth of the tree.
#[derive(Debug, Clone, PartialEq, EnumIs)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QueryExpr {
    /// Reference to a named column or annotation, `F(name)`.
    Field(String),

    /// A constant.
    Literal(Value),

    /// `lhs <op> rhs`.
    Combined {
        op: Operator,
        lhs: Box<QueryExpr>,
        rhs: Box<QueryExpr>,
    },

    /// Arithmetic negation.
    Negate(Box<QueryExpr>),

    /// Database function call, e.g. `LOWER(F(name))`.
    Func { name: String, args: Vec<QueryExpr> },
}

/// Reference a field (or annotation) by name.
#[allow(non_snake_case)]
#[inline]
pub fn F(name: impl Into<String>) -> QueryExpr {
    QueryExpr::Field(name.into())
}

/// Wrap a constant.
#[inline]
pub fn lit(value: impl Into<Value>) -> QueryExpr {
    QueryExpr::Literal(value.into())
}

/// Database function call. The name is upper-cased.
pub fn func(name: impl AsRef<str>, args: impl IntoIterator<Item = QueryExpr>) -> QueryExpr {
    QueryExpr::Func {
        name: name.as_ref().to_ascii_uppercase(),
        args: args.into_iter().collect(),
    }
}

impl QueryExpr {
    /// Type tag of the outermost node.
    pub fn kind(&self) -> ExprKind {
        match self {
            QueryExpr::Field(_) => ExprKind::Field,
            QueryExpr::Literal(_) => ExprKind::Literal,
            QueryExpr::Combined { .. } => ExprKind::Combined,
            QueryExpr::Negate(_) => ExprKind::Negate,
            QueryExpr::Func { .. } => ExprKind::Func,
        }
    }

    /// Combine with another expression.
    pub fn combine(self, op: Operator, rhs: impl Into<QueryExpr>) -> QueryExpr {
        QueryExpr::Combined {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    /// String concatenation, `self || rhs`.
    pub fn concat(self, rhs: impl Into<QueryExpr>) -> QueryExpr {
        self.combine(Operator::Concat, rhs)
    }

    /// Name of the referenced field if this node is a [`QueryExpr::Field`].
    pub fn as_field(&self) -> Option<&str> {
        match self {
            QueryExpr::Field(name) => Some(name),
            _ => None,
        }
    }

    /// The constant if this node is a [`QueryExpr::Literal`].
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            QueryExpr::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Direct children, left to right.
    pub fn children(&self) -> Children<'_> {
        let empty: &[QueryExpr] = &[];
        let (pair, rest) = match self {
            QueryExpr::Field(_) | QueryExpr::Literal(_) => ([None, None], empty),
            QueryExpr::Combined { lhs, rhs, .. } => ([Some(&**lhs), Some(&**rhs)], empty),
            QueryExpr::Negate(inner) => ([Some(&**inner), None], empty),
            QueryExpr::Func { args, .. } => ([None, None], args.as_slice()),
        };
        Children {
            pair: pair.into_iter(),
            rest: rest.iter(),
        }
    }

    /// Evaluate the expression, reading field references through `resolve`.
    ///
    /// ```
    /// # use hyexpr::{Value, expr::*};
    /// let e = (F("a") + 2) * 3;
    /// let v = e.evaluate(&mut |name| match name {
    ///     "a" => Some(Value::Int(1)),
    ///     _ => None,
    /// });
    /// assert_eq!(v, Ok(Some(Value::Int(9))));
    /// ```
    ///
    /// Returns `Ok(None)` if a field cannot be resolved or a function is not one of the
    /// few evaluated natively (`LOWER`, `UPPER`, `COALESCE`, `LENGTH`, `ABS`).
    pub fn evaluate(
        &self,
        resolve: &mut dyn FnMut(&str) -> Option<Value>,
    ) -> ExprResult<Option<Value>> {
        Ok(match self {
            QueryExpr::Field(name) => resolve(name),
            QueryExpr::Literal(value) => Some(value.clone()),
            QueryExpr::Combined { op, lhs, rhs } => {
                match (lhs.evaluate(resolve)?, rhs.evaluate(resolve)?) {
                    (Some(a), Some(b)) => Some(a.apply(*op, &b)?),
                    _ => None,
                }
            }
            QueryExpr::Negate(inner) => match inner.evaluate(resolve)? {
                Some(v) => Some(v.negate()?),
                None => None,
            },
            QueryExpr::Func { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    match arg.evaluate(resolve)? {
                        Some(v) => values.push(v),
                        None => return Ok(None),
                    }
                }
                evaluate_func(name, values)
            }
        })
    }
}

fn evaluate_func(name: &str, args: Vec<Value>) -> Option<Value> {
    if name == "COALESCE" {
        return Some(
            args.into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
        );
    }

    match (name, args.as_slice()) {
        ("LOWER", [Value::Text(s)]) => Some(Value::Text(s.to_lowercase())),
        ("UPPER", [Value::Text(s)]) => Some(Value::Text(s.to_uppercase())),
        ("LENGTH", [Value::Text(s)]) => Some(Value::Int(s.chars().count() as i64)),
        ("ABS", [Value::Int(v)]) => v.checked_abs().map(Value::Int),
        ("ABS", [Value::Float(v)]) => Some(Value::Float(v.abs())),
        ("LOWER" | "UPPER" | "LENGTH" | "ABS", [Value::Null]) => Some(Value::Null),
        _ => None,
    }
}

/// Iterator over the direct children of a [`QueryExpr`].
pub struct Children<'a> {
    pair: std::array::IntoIter<Option<&'a QueryExpr>, 2>,
    rest: std::slice::Iter<'a, QueryExpr>,
}

impl<'a> Iterator for Children<'a> {
    type Item = &'a QueryExpr;

    fn next(&mut self) -> Option<Self::Item> {
        self.pair.by_ref().flatten().next().or_else(|| self.rest.next())
    }
}

impl From<Value> for QueryExpr {
    fn from(value: Value) -> Self {
        QueryExpr::Literal(value)
    }
}

macro_rules! impl_from_literal {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for QueryExpr {
                #[inline]
                fn from(value: $t) -> Self {
                    QueryExpr::Literal(Value::from(value))
                }
            }
        )*
    };
}

impl_from_literal!(bool, i32, i64, u32, f64, &str, String);

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<QueryExpr>> $trait<R> for QueryExpr {
            type Output = QueryExpr;

            #[inline]
            fn $method(self, rhs: R) -> QueryExpr {
                self.combine($op, rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, Operator::Add);
impl_binary_op!(Sub, sub, Operator::Sub);
impl_binary_op!(Mul, mul, Operator::Mul);
impl_binary_op!(Div, div, Operator::Div);
impl_binary_op!(Rem, rem, Operator::Mod);

impl Neg for QueryExpr {
    type Output = QueryExpr;

    fn neg(self) -> QueryExpr {
        QueryExpr::Negate(Box::new(self))
    }
}

impl Drop for QueryExpr {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        detach_children(self, &mut stack);
        while let Some(mut node) = stack.pop() {
            // Left childless, so its own drop ends here.
            detach_children(&mut node, &mut stack);
        }
    }
}

/// Move the composite children of `node` onto `stack`. Leaf children stay in place.
fn detach_children(node: &mut QueryExpr, stack: &mut Vec<QueryExpr>) {
    fn take(child: &mut QueryExpr, stack: &mut Vec<QueryExpr>) {
        if child.kind().is_composite() {
            stack.push(std::mem::replace(child, QueryExpr::Literal(Value::Null)));
        }
    }

    match node {
        QueryExpr::Field(_) | QueryExpr::Literal(_) => {}
        QueryExpr::Combined { lhs, rhs, .. } => {
            take(lhs, stack);
            take(rhs, stack);
        }
        QueryExpr::Negate(inner) => take(inner, stack),
        QueryExpr::Func { args, .. } => {
            for arg in args.iter_mut() {
                take(arg, stack);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_left_to_right() {
        let e = func("coalesce", [F("a"), F("b"), lit(0)]);
        let names: Vec<_> = e.children().map(|c| c.to_string()).collect();
        assert_eq!(names, ["F(a)", "F(b)", "0"]);

        let e = F("x") - F("y");
        let names: Vec<_> = e.children().filter_map(QueryExpr::as_field).collect();
        assert_eq!(names, ["x", "y"]);

        assert_eq!(F("x").children().count(), 0);
        assert_eq!((-F("x")).children().count(), 1);
    }

    #[test]
    fn evaluate_unknown_field_is_none() {
        let e = F("missing") + 1;
        assert_eq!(e.evaluate(&mut |_| None), Ok(None));
    }

    #[test]
    fn evaluate_functions() {
        let e = func("lower", [F("name")]);
        let v = e.evaluate(&mut |_| Some(Value::from("HeLLo")));
        assert_eq!(v, Ok(Some(Value::from("hello"))));

        let e = func("coalesce", [F("a"), lit(7)]);
        let v = e.evaluate(&mut |_| Some(Value::Null));
        assert_eq!(v, Ok(Some(Value::Int(7))));
    }

    #[test]
    fn structural_equality_across_builds() {
        assert_eq!(F("int_field") + 20, F("int_field") + 20);
        assert_ne!(F("int_field") + 20, F("int_field") + 21);
        assert_ne!(F("int_field"), lit("int_field"));
    }
}

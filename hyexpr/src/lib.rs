//! Hyexpr: a small symbolic query-expression language.
//!
//! An attribute of a data model can be read in two worlds: on a loaded row it is a plain
//! [`Value`], on the model class it is a [`QueryExpr`] that a database can compute. This
//! crate provides the second world: field references (`F("name")`), literals,
//! arithmetic and function calls, along with the traversals needed to inspect and
//! rewrite them.
//!
//! Example
//! ```
//! use hyexpr::prelude::*;
//!
//! let alias = F("int_field");
//! let add_20 = alias.clone() + 20;
//! assert_eq!(add_20.to_string(), "F(int_field) + 20");
//! assert_eq!(field_references(&add_20), ["int_field"]);
//!
//! // Evaluate against a row
//! let row = |name: &str| (name == "int_field").then_some(Value::Int(1));
//! assert_eq!(add_20.evaluate(&mut |n| row(n)), Ok(Some(Value::Int(21))));
//! ```

/// Errors raised while evaluating expressions.
pub mod error;
/// Expressions API: node types, builders and operators, pretty-printing.
pub mod expr;
/// Native values and their arithmetic.
pub mod value;
/// Tree walker for traversing and rewriting expressions.
pub mod walker;

pub use error::{ExprError, ExprResult};
pub use expr::{ExprKind, Operator, QueryExpr};
pub use value::{Value, ValueKind};

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::error::{ExprError, ExprResult};
    pub use crate::expr::{
        ExprKind, F, Operator, QueryExpr, func, lit, pretty::PrettyExpr,
    };
    pub use crate::value::{Value, ValueKind};
    pub use crate::walker::{
        WalkerHandle, WalkerNodeHandle, field_references, references_field, substitute_fields,
        walk, walk_no_input,
    };
}

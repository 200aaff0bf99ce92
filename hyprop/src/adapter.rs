//! Default [`ExpressionWrapper`] for the `hyexpr` expression language.
use hyexpr::{QueryExpr, walker::field_references};

use crate::registry::{DependencyNames, ExpressionWrapper};
use crate::term::Term;

/// Wraps every non-literal [`QueryExpr`]; its dependencies are the field names it reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryExprWrapper;

impl ExpressionWrapper for QueryExprWrapper {
    fn is_native(&self, term: &Term) -> bool {
        match term {
            Term::Native(_) => true,
            Term::Symbolic(expr) => expr.is_literal(),
        }
    }

    fn dependency_names(&self, expr: &QueryExpr) -> DependencyNames {
        field_references(expr)
            .into_iter()
            .map(str::to_string)
            .collect()
    }
}

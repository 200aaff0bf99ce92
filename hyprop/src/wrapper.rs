//! Class-level value of a hybrid attribute.
use std::collections::HashSet;
use std::sync::Arc;

use hyexpr::{QueryExpr, expr::lit, walker::substitute_fields};

use crate::model::{ClassId, ModelClass};
use crate::term::Term;

/// A hybrid this wrapper's expression refers to by name.
#[derive(Debug, Clone)]
pub struct Dependency {
    name: String,
    wrapper: Arc<HybridWrapper>,
}

impl Dependency {
    pub fn new(name: impl Into<String>, wrapper: Arc<HybridWrapper>) -> Self {
        Self {
            name: name.into(),
            wrapper,
        }
    }

    /// Name the expression uses for the hybrid.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn wrapper(&self) -> &Arc<HybridWrapper> {
        &self.wrapper
    }
}

/// Result of reading a hybrid attribute on a class.
///
/// Holds the expression the hybrid function built, the hybrid's name, the class it was
/// read on, and the wrappers of the sibling hybrids the expression refers to by name.
/// Equality ignores the dependencies: two wrappers are equal when their expression, name
/// and class are.
///
/// ```
/// # use hyprop::prelude::*;
/// fn total(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("price")? * scope.field("quantity")?
/// }
/// fn total_with_tax(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.reference("total") * 2
/// }
///
/// let class = ModelClass::builder("Line")
///     .fields(["price", "quantity"])
///     .hybrid(hybrid_property(total).unwrap())
///     .hybrid(hybrid_property(total_with_tax).unwrap())
///     .build()
///     .unwrap();
///
/// let taxed = class.get("total_with_tax").unwrap();
/// let names: Vec<_> = taxed.with_dependencies().iter().map(|w| w.name().to_string()).collect();
/// assert_eq!(names, ["total_with_tax", "total"]);
/// assert_eq!(taxed.inline(), Term::from((F("price") * F("quantity")) * 2));
/// ```
#[derive(Debug)]
pub struct HybridWrapper {
    expression: Term,
    name: String,
    owner: ClassId,
    owner_name: String,
    dependencies: Vec<Dependency>,
}

impl HybridWrapper {
    /// A wrapper without dependencies, e.g. to compare against a class read.
    pub fn new(expression: impl Into<Term>, name: impl Into<String>, owner: &ModelClass) -> Self {
        Self::from_parts(expression.into(), name.into(), owner, Vec::new())
    }

    pub(crate) fn from_parts(
        expression: Term,
        name: String,
        owner: &ModelClass,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            expression,
            name,
            owner: owner.id(),
            owner_name: owner.name().to_string(),
            dependencies,
        }
    }

    pub fn expression(&self) -> &Term {
        &self.expression
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> ClassId {
        self.owner
    }

    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    /// Direct dependencies, in reference order.
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// This wrapper followed by the transitive dependencies, depth first in reference
    /// order. A hybrid reached along several paths appears once per path.
    pub fn with_dependencies(self: &Arc<Self>) -> Vec<Arc<HybridWrapper>> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(wrapper) = stack.pop() {
            stack.extend(wrapper.dependencies.iter().rev().map(|d| d.wrapper.clone()));
            out.push(wrapper);
        }
        out
    }

    /// Every hybrid this one depends on, itself last, each once, dependencies before their
    /// dependents.
    pub fn annotation_order(self: &Arc<Self>) -> Vec<Arc<HybridWrapper>> {
        let mut out = Vec::new();
        let mut seen: HashSet<*const HybridWrapper> = HashSet::new();
        let mut stack = vec![(self.clone(), false)];

        while let Some((wrapper, expanded)) = stack.pop() {
            if expanded {
                out.push(wrapper);
                continue;
            }
            if !seen.insert(Arc::as_ptr(&wrapper)) {
                continue;
            }
            stack.push((wrapper.clone(), true));
            for dependency in wrapper.dependencies.iter().rev() {
                if !seen.contains(&Arc::as_ptr(&dependency.wrapper)) {
                    stack.push((dependency.wrapper.clone(), false));
                }
            }
        }
        out
    }

    /// The expression with every hybrid reference replaced by that hybrid's own inlined
    /// expression, leaving only field references.
    pub fn inline(&self) -> Term {
        match &self.expression {
            Term::Native(_) => self.expression.clone(),
            Term::Symbolic(expr) => Term::Symbolic(self.inline_expr(expr)),
        }
    }

    fn inline_expr(&self, expr: &QueryExpr) -> QueryExpr {
        if self.dependencies.is_empty() {
            return expr.clone();
        }
        substitute_fields(expr, &mut |name| {
            self.dependencies
                .iter()
                .find(|d| d.name == name)
                .map(|d| match d.wrapper.inline() {
                    Term::Native(value) => lit(value),
                    Term::Symbolic(expr) => expr,
                })
        })
    }
}

impl PartialEq for HybridWrapper {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner && self.name == other.name && self.expression == other.expression
    }
}

impl std::fmt::Display for HybridWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} = {}", self.owner_name, self.name, self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyexpr::expr::F;

    fn class() -> ModelClass {
        ModelClass::builder("T").field("x").build().unwrap()
    }

    fn node(
        class: &ModelClass,
        name: &str,
        expr: QueryExpr,
        deps: &[(&str, &Arc<HybridWrapper>)],
    ) -> Arc<HybridWrapper> {
        let deps = deps
            .iter()
            .map(|(n, w)| Dependency::new(*n, Arc::clone(w)))
            .collect();
        Arc::new(HybridWrapper::from_parts(expr.into(), name.to_string(), class, deps))
    }

    fn names(list: &[Arc<HybridWrapper>]) -> Vec<&str> {
        list.iter().map(|w| w.name()).collect()
    }

    #[test]
    fn diamond_orders() {
        let class = class();
        let base = node(&class, "base", F("x") + 1, &[]);
        let left = node(&class, "left", F("base") * 2, &[("base", &base)]);
        let right = node(&class, "right", F("base") - 3, &[("base", &base)]);
        let top = node(
            &class,
            "top",
            F("left") + F("right"),
            &[("left", &left), ("right", &right)],
        );

        assert_eq!(
            names(&top.with_dependencies()),
            ["top", "left", "base", "right", "base"]
        );
        assert_eq!(names(&top.annotation_order()), ["base", "left", "right", "top"]);
        assert_eq!(
            top.inline(),
            Term::from(((F("x") + 1) * 2) + ((F("x") + 1) - 3))
        );
    }

    #[test]
    fn equality_ignores_dependencies() {
        let class = class();
        let base = node(&class, "base", F("x"), &[]);
        let with = node(&class, "alias", F("base"), &[("base", &base)]);
        let without = HybridWrapper::new(F("base"), "alias", &class);
        assert_eq!(*with, without);

        let other_class = ModelClass::builder("T").field("x").build().unwrap();
        assert_ne!(without, HybridWrapper::new(F("base"), "alias", &other_class));
    }

    #[test]
    fn display_names_owner() {
        let class = class();
        let w = HybridWrapper::new(F("x") + 20, "add_20", &class);
        assert_eq!(w.to_string(), "T.add_20 = F(x) + 20");
    }
}

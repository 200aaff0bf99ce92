//! Expression wrapper registry and [`wrap`].
//!
//! The registry maps the runtime kind of a [`Term`] to a wrapper capability. A capability
//! decides whether a term is already a plain value, and otherwise bundles it into a
//! [`WrappedExpression`] that knows which names it references. The dependency resolver only
//! ever sees those names, so a host integration can plug its own expression types in by
//! registering capabilities.
use std::sync::Arc;

use enum_map::EnumMap;
use hyexpr::QueryExpr;
use hyexpr::expr::lit;
use log::debug;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use smallvec::SmallVec;
use strum::IntoEnumIterator;

use crate::adapter::QueryExprWrapper;
use crate::term::{Term, TermKind};

/// Names referenced by an expression, in first-reference order.
pub type DependencyNames = SmallVec<String, 4>;

/// Capability attached to one or more [`TermKind`]s.
pub trait ExpressionWrapper: Send + Sync {
    /// Whether `term` should be returned as is rather than wrapped.
    fn is_native(&self, term: &Term) -> bool;

    /// Names of the attributes `expr` refers to.
    fn dependency_names(&self, expr: &QueryExpr) -> DependencyNames;

    fn wrap(&self, expr: QueryExpr) -> WrappedExpression {
        let names = self.dependency_names(&expr);
        WrappedExpression::new(expr, names)
    }
}

/// A symbolic expression together with the names it depends on.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedExpression {
    expression: QueryExpr,
    dependencies: DependencyNames,
}

impl WrappedExpression {
    /// Bundle `expression` with its dependency names. Repeated names are kept once.
    pub fn new(expression: QueryExpr, names: impl IntoIterator<Item = String>) -> Self {
        let mut dependencies = DependencyNames::new();
        for name in names {
            if !dependencies.contains(&name) {
                dependencies.push(name);
            }
        }
        Self {
            expression,
            dependencies,
        }
    }

    pub fn expression(&self) -> &QueryExpr {
        &self.expression
    }

    pub fn into_expression(self) -> QueryExpr {
        self.expression
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependencies
    }
}

/// Outcome of [`WrapperRegistry::wrap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Wrapped {
    /// No capability, or the capability reported a native value.
    Plain(Term),
    Expression(WrappedExpression),
}

impl Wrapped {
    pub fn dependency_names(&self) -> &[String] {
        match self {
            Wrapped::Plain(_) => &[],
            Wrapped::Expression(wrapped) => wrapped.dependency_names(),
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(self, Wrapped::Expression(_))
    }

    /// The original term, whichever way it was wrapped.
    pub fn into_term(self) -> Term {
        match self {
            Wrapped::Plain(term) => term,
            Wrapped::Expression(wrapped) => Term::Symbolic(wrapped.into_expression()),
        }
    }
}

/// Capabilities indexed by [`TermKind`].
///
/// Lookups are by exact kind: registering for [`TermKind::Combined`] says nothing about
/// [`TermKind::Field`].
///
/// ```
/// # use hyprop::{registry::{Wrapped, WrapperRegistry}, Term, hyexpr::expr::F};
/// let registry = WrapperRegistry::with_defaults();
/// let wrapped = registry.wrap(Term::from(F("a") + F("b")));
/// assert_eq!(wrapped.dependency_names(), ["a", "b"]);
///
/// // Unregistered kinds pass through untouched.
/// let empty = WrapperRegistry::new();
/// assert_eq!(empty.wrap(Term::from(F("a"))), Wrapped::Plain(Term::from(F("a"))));
/// ```
pub struct WrapperRegistry {
    table: RwLock<EnumMap<TermKind, Option<Arc<dyn ExpressionWrapper>>>>,
}

static GLOBAL: Lazy<Arc<WrapperRegistry>> = Lazy::new(|| Arc::new(WrapperRegistry::with_defaults()));

impl WrapperRegistry {
    /// An empty registry; every term passes through [`Self::wrap`] unchanged.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(EnumMap::default()),
        }
    }

    /// A registry handling every symbolic kind with [`QueryExprWrapper`].
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let wrapper: Arc<dyn ExpressionWrapper> = Arc::new(QueryExprWrapper);
        {
            let mut table = registry.table.write();
            for kind in TermKind::iter().filter(|k| k.is_symbolic()) {
                table[kind] = Some(wrapper.clone());
            }
        }
        registry
    }

    /// Process-wide registry used by classes that do not bring their own.
    pub fn global() -> &'static Arc<WrapperRegistry> {
        &GLOBAL
    }

    /// Install `wrapper` for `kind`, returning the capability it replaces.
    pub fn register(
        &self,
        kind: TermKind,
        wrapper: Arc<dyn ExpressionWrapper>,
    ) -> Option<Arc<dyn ExpressionWrapper>> {
        let previous = self.table.write()[kind].replace(wrapper);
        if previous.is_some() {
            debug!("Replaced expression wrapper for kind {kind}");
        }
        previous
    }

    pub fn unregister(&self, kind: TermKind) -> Option<Arc<dyn ExpressionWrapper>> {
        self.table.write()[kind].take()
    }

    pub fn lookup(&self, kind: TermKind) -> Option<Arc<dyn ExpressionWrapper>> {
        self.table.read()[kind].clone()
    }

    pub fn is_registered(&self, kind: TermKind) -> bool {
        self.table.read()[kind].is_some()
    }

    /// Wrap `term` with the capability registered for its kind.
    ///
    /// The capability runs without the table lock held, so it may consult the registry.
    pub fn wrap(&self, term: Term) -> Wrapped {
        let Some(wrapper) = self.lookup(term.kind()) else {
            return Wrapped::Plain(term);
        };

        if wrapper.is_native(&term) {
            return Wrapped::Plain(term);
        }

        match term {
            Term::Symbolic(expr) => Wrapped::Expression(wrapper.wrap(expr)),
            // A value the capability refuses as native is bundled as a literal.
            Term::Native(value) => Wrapped::Expression(wrapper.wrap(lit(value))),
        }
    }
}

impl Default for WrapperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WrapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_set()
            .entries(TermKind::iter().filter(|k| table[*k].is_some()))
            .finish()
    }
}

/// Wrap `term` with the [global](WrapperRegistry::global) registry.
pub fn wrap(term: Term) -> Wrapped {
    WrapperRegistry::global().wrap(term)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyexpr::expr::F;

    struct NeverNative;

    impl ExpressionWrapper for NeverNative {
        fn is_native(&self, _: &Term) -> bool {
            false
        }

        fn dependency_names(&self, _: &QueryExpr) -> DependencyNames {
            DependencyNames::new()
        }
    }

    #[test]
    fn defaults_cover_symbolic_kinds_only() {
        let registry = WrapperRegistry::with_defaults();
        for kind in TermKind::iter() {
            assert_eq!(registry.is_registered(kind), kind.is_symbolic(), "{kind}");
        }
    }

    #[test]
    fn literal_expressions_are_native() {
        let registry = WrapperRegistry::with_defaults();
        assert_eq!(
            registry.wrap(Term::from(lit(5))),
            Wrapped::Plain(Term::from(lit(5)))
        );
        assert_eq!(registry.wrap(Term::from(5)), Wrapped::Plain(Term::from(5)));
    }

    #[test]
    fn values_refused_as_native_are_bundled() {
        let registry = WrapperRegistry::new();
        registry.register(TermKind::Int, Arc::new(NeverNative));

        let wrapped = registry.wrap(Term::from(5));
        assert_eq!(
            wrapped,
            Wrapped::Expression(WrappedExpression::new(lit(5), []))
        );
        assert!(wrapped.dependency_names().is_empty());

        // Other value kinds still pass through.
        assert_eq!(registry.wrap(Term::from(true)), Wrapped::Plain(Term::from(true)));
    }

    #[test]
    fn register_returns_previous() {
        let registry = WrapperRegistry::new();
        assert!(registry.register(TermKind::Field, Arc::new(QueryExprWrapper)).is_none());
        assert!(registry.register(TermKind::Field, Arc::new(QueryExprWrapper)).is_some());
        assert!(registry.unregister(TermKind::Field).is_some());
        assert!(!registry.is_registered(TermKind::Field));
    }

    #[test]
    fn wrapped_expression_deduplicates_names() {
        let wrapped = WrappedExpression::new(
            F("a") + F("a"),
            ["a".to_string(), "b".to_string(), "a".to_string()],
        );
        assert_eq!(wrapped.dependency_names(), ["a", "b"]);
        assert_eq!(wrapped.expression(), &(F("a") + F("a")));
    }
}

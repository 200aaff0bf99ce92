use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hyprop::hyexpr::QueryExpr;
use hyprop::prelude::*;
use hyprop::registry::DependencyNames;
use hyprop::{ExpressionWrapper, QueryExprWrapper, TermKind, WrappedExpression, wrap};

/// Delegates to [`QueryExprWrapper`] and counts how often it is asked to wrap.
#[derive(Default)]
struct CountingWrapper {
    calls: AtomicUsize,
}

impl ExpressionWrapper for CountingWrapper {
    fn is_native(&self, term: &Term) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        QueryExprWrapper.is_native(term)
    }

    fn dependency_names(&self, expr: &QueryExpr) -> DependencyNames {
        QueryExprWrapper.dependency_names(expr)
    }
}

/// Reports every `Combined` expression as native.
struct NativeCombined;

impl ExpressionWrapper for NativeCombined {
    fn is_native(&self, _: &Term) -> bool {
        true
    }

    fn dependency_names(&self, _: &QueryExpr) -> DependencyNames {
        DependencyNames::new()
    }
}

/// Never reports a term as native.
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
fn unregistered_kinds_pass_through() {
    let registry = WrapperRegistry::new();
    let term = Term::from(F("a") + 1);
    assert_eq!(registry.wrap(term.clone()), Wrapped::Plain(term));
    assert_eq!(registry.wrap(Term::from(3)), Wrapped::Plain(Term::from(3)));
}

#[test]
fn native_kinds_pass_through() {
    let registry = WrapperRegistry::new();
    registry.register(TermKind::Combined, Arc::new(NativeCombined));
    let term = Term::from(F("a") + 1);
    assert_eq!(registry.wrap(term.clone()), Wrapped::Plain(term));
}

#[test]
fn values_on_a_non_native_kind_are_bundled() {
    let registry = Arc::new(WrapperRegistry::new());
    registry.register(TermKind::Int, Arc::new(NeverNative));
    assert_eq!(
        registry.wrap(Term::from(5)),
        Wrapped::Expression(WrappedExpression::new(lit(5), []))
    );

    fn five(_: &Scope<'_>) -> HyResult<Term> {
        Ok(Term::from(5))
    }
    let class = ModelClass::builder("Constant")
        .hybrid(hybrid_property(five).unwrap())
        .registry(registry)
        .build()
        .unwrap();
    let wrapper = class.get("five").unwrap();
    assert_eq!(wrapper.expression(), &Term::Symbolic(lit(5)));
    assert!(wrapper.dependencies().is_empty());
}

#[test]
fn symbolic_terms_are_bundled() {
    let term = Term::from(F("a") * F("b") + F("a"));
    let expected = WrappedExpression::new(
        F("a") * F("b") + F("a"),
        ["a".to_string(), "b".to_string()],
    );
    assert_eq!(wrap(term), Wrapped::Expression(expected));
}

#[test]
fn lookups_are_by_exact_kind() {
    let registry = WrapperRegistry::new();
    registry.register(TermKind::Field, Arc::new(QueryExprWrapper));
    assert!(registry.wrap(Term::from(F("a"))).is_expression());
    assert!(!registry.wrap(Term::from(-F("a"))).is_expression());
}

#[test]
fn one_wrap_per_cache_miss() {
    let counter = Arc::new(CountingWrapper::default());
    let registry = Arc::new(WrapperRegistry::new());
    for kind in [TermKind::Field, TermKind::Combined] {
        registry.register(kind, counter.clone());
    }

    fn alias(scope: &Scope<'_>) -> HyResult<Term> {
        scope.field("value")
    }
    let class = ModelClass::builder("Counted")
        .field("value")
        .hybrid(hybrid_property(alias).unwrap())
        .registry(registry)
        .build()
        .unwrap();

    class.get("alias").unwrap();
    class.get("alias").unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

    // Instance reads never wrap.
    let instance = Arc::new(Record::new().with("value", 4));
    class.get_for(&instance, "alias").unwrap();
    class.get_for(&instance, "alias").unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

    class.reset_caches();
    class.get("alias").unwrap();
    assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn class_without_wrapper_keeps_plain_expression() {
    fn alias(scope: &Scope<'_>) -> HyResult<Term> {
        Ok(scope.reference("missing"))
    }
    let class = ModelClass::builder("Bare")
        .hybrid(hybrid_property(alias).unwrap())
        .registry(Arc::new(WrapperRegistry::new()))
        .build()
        .unwrap();

    // Nothing reports dependencies, so nothing is resolved.
    let wrapper = class.get("alias").unwrap();
    assert_eq!(wrapper.expression(), &Term::from(F("missing")));
    assert!(wrapper.dependencies().is_empty());
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hyprop::prelude::*;

fn price(scope: &Scope<'_>) -> HyResult<Term> {
    scope.field("unit_price")? * scope.field("quantity")?
}

fn discounted(scope: &Scope<'_>) -> HyResult<Term> {
    scope.field("price")? - scope.field("discount")?
}

fn with_shipping(scope: &Scope<'_>) -> HyResult<Term> {
    scope.field("discounted")? + scope.field("price")?
}

fn broken(scope: &Scope<'_>) -> HyResult<Term> {
    scope.field("nonexistent")? + 1
}

fn ping(scope: &Scope<'_>) -> HyResult<Term> {
    scope.attr("pong")
}

fn pong(scope: &Scope<'_>) -> HyResult<Term> {
    scope.attr("ping")
}

fn myself(scope: &Scope<'_>) -> HyResult<Term> {
    scope.reference("myself") + 1
}

fn order_line() -> ModelClass {
    ModelClass::builder("OrderLine")
        .fields(["unit_price", "quantity", "discount"])
        .hybrid(hybrid_property(price).unwrap())
        .hybrid(hybrid_property(discounted).unwrap())
        .hybrid(hybrid_property(with_shipping).unwrap())
        .hybrid(hybrid_property(broken).unwrap())
        .build()
        .unwrap()
}

fn names(wrappers: &[Arc<HybridWrapper>]) -> Vec<String> {
    wrappers.iter().map(|w| w.name().to_string()).collect()
}

#[test]
fn transitive_dependencies_keep_repeats() {
    let class = order_line();
    let top = class.get("with_shipping").unwrap();
    assert_eq!(
        names(&top.with_dependencies()),
        ["with_shipping", "discounted", "price", "price"]
    );
    assert_eq!(
        names(&top.annotation_order()),
        ["price", "discounted", "with_shipping"]
    );
}

#[test]
fn inline_yields_field_only_expression() {
    let class = order_line();
    let top = class.get("with_shipping").unwrap();
    let price = F("unit_price") * F("quantity");
    assert_eq!(
        top.inline(),
        Term::from((price.clone() - F("discount")) + price)
    );
}

#[test]
fn instance_reads_follow_references() {
    let class = order_line();
    let line = Arc::new(
        Record::new()
            .with("unit_price", 5)
            .with("quantity", 3)
            .with("discount", 2),
    );
    assert_eq!(*class.get_for(&line, "price").unwrap(), Term::from(15));
    assert_eq!(*class.get_for(&line, "discounted").unwrap(), Term::from(13));
    assert_eq!(*class.get_for(&line, "with_shipping").unwrap(), Term::from(28));

    // An explicit reference stays symbolic even on an instance.
    let raw = ModelClass::builder("Raw")
        .extends(&class)
        .hybrid(named("raw").decorate(|scope: &Scope<'_>| scope.reference("price") + 30))
        .build()
        .unwrap();
    assert_eq!(*raw.get_for(&line, "raw").unwrap(), Term::from(F("price") + 30));
}

#[test]
fn unresolved_reference_fails_and_is_not_cached() {
    let class = order_line();
    for _ in 0..2 {
        match class.get("broken").unwrap_err() {
            HybridError::UnresolvedReference { hybrid, name, class } => {
                assert_eq!(hybrid, "broken");
                assert_eq!(name, "nonexistent");
                assert_eq!(class, "OrderLine");
            }
            other => panic!("unexpected error {other}"),
        }
    }
    let descriptor = class.attribute("broken").and_then(Attribute::as_hybrid).unwrap();
    assert!(descriptor.cached_wrapper(&class).is_none());
}

#[test]
fn cycles_are_reported() {
    let class = ModelClass::builder("Loop")
        .hybrid(hybrid_property(ping).unwrap())
        .hybrid(hybrid_property(pong).unwrap())
        .hybrid(hybrid_property(myself).unwrap())
        .build()
        .unwrap();

    match class.get("ping").unwrap_err() {
        HybridError::CyclicDependency { chain, .. } => assert_eq!(chain, ["ping", "pong", "ping"]),
        other => panic!("unexpected error {other}"),
    }
    assert!(class.get("myself").unwrap_err().is_cyclic_dependency());

    // Instances loop the same way.
    let instance = Arc::new(Record::new());
    assert!(class.get_for(&instance, "pong").unwrap_err().is_cyclic_dependency());

    // Nothing was left marked as in progress.
    assert!(class.get("ping").unwrap_err().is_cyclic_dependency());
}

#[test]
fn user_errors_propagate_and_are_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let class = ModelClass::builder("Failing")
        .field("x")
        .hybrid(named("ratio").decorate(move |scope: &Scope<'_>| {
            seen.fetch_add(1, Ordering::SeqCst);
            let x = scope.field("x")?;
            if x == Term::from(0) {
                return Err(HybridError::evaluation("x must not be zero"));
            }
            Term::from(100) / x
        }))
        .build()
        .unwrap();

    let zero = Arc::new(Record::new().with("x", 0));
    assert!(class.get_for(&zero, "ratio").unwrap_err().is_evaluation());
    assert!(class.get_for(&zero, "ratio").unwrap_err().is_evaluation());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let four = Arc::new(Record::new().with("x", 4));
    assert_eq!(*class.get_for(&four, "ratio").unwrap(), Term::from(25));

    let missing = Arc::new(Record::new());
    assert!(class.get_for(&missing, "ratio").unwrap_err().is_missing_field());
}

#[test]
fn native_failures_surface_as_expression_errors() {
    let class = ModelClass::builder("Mixed")
        .fields(["a", "b"])
        .hybrid(named("sum").decorate(|scope: &Scope<'_>| {
            scope.field("a")? + scope.field("b")?
        }))
        .build()
        .unwrap();
    let instance = Arc::new(Record::new().with("a", 1).with("b", true));
    assert!(class.get_for(&instance, "sum").unwrap_err().is_expression());
}

#[test]
fn concurrent_class_reads_share_one_wrapper() {
    let class = Arc::new(order_line());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let class = class.clone();
            std::thread::spawn(move || class.get("with_shipping").unwrap())
        })
        .collect();
    let wrappers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = class.get("with_shipping").unwrap();
    assert!(wrappers.iter().all(|w| Arc::ptr_eq(w, &first)));
}

//! Hybrid attributes for data-model classes.
//!
//! A hybrid attribute is written once as a function of a [`Scope`] and read two ways:
//! on an instance it is a plain value computed from the instance's fields, on the class
//! it is a query expression the database can evaluate. Class-level results are wrapped,
//! their references to sibling hybrids resolved, and cached per class; instance-level
//! results are cached per instance.
//!
//! ```
//! use std::sync::Arc;
//! use hyprop::prelude::*;
//!
//! fn int_field_alias(scope: &Scope<'_>) -> HyResult<Term> {
//!     scope.field("int_field")
//! }
//!
//! let class = ModelClass::builder("SomeClass")
//!     .fields(["int_field", "char_field"])
//!     .hybrid(hybrid_property(int_field_alias).unwrap())
//!     .hybrid(hybrid!(fn add_30(scope) { scope.reference("int_field_alias") + 30 }))
//!     .build()
//!     .unwrap();
//!
//! let instance = Arc::new(Record::new().with("int_field", 1).with("char_field", "hello"));
//! assert_eq!(*class.get_for(&instance, "int_field_alias").unwrap(), Term::from(1));
//!
//! let add_30 = class.get("add_30").unwrap();
//! assert_eq!(add_30.expression(), &Term::from(F("int_field_alias") + 30));
//! assert_eq!(add_30.with_dependencies().len(), 2);
//! ```
pub mod adapter;
pub mod model;
pub mod property;
pub mod registry;
mod resolver;
pub mod scope;
pub mod term;
pub mod utils;
pub mod wrapper;

pub use hyexpr;

pub use adapter::QueryExprWrapper;
pub use model::{Attribute, ClassId, Model, ModelClass, ModelClassBuilder, Record};
pub use property::{HybridDecorator, HybridFn, HybridProperty, hybrid_property, named};
pub use registry::{ExpressionWrapper, Wrapped, WrappedExpression, WrapperRegistry, wrap};
pub use scope::Scope;
pub use term::{Term, TermKind};
pub use utils::error::{HyResult, HybridError};
pub use wrapper::{Dependency, HybridWrapper};

/// Alias of [`hybrid_property`].
pub use property::decorator::hybrid_property as property;

/// Declare a hybrid function and decorate it under its own name.
///
/// `hybrid!(fn name(scope) { body })` expands to a function item taking
/// `scope: &Scope<'_>` and returning `HyResult<Term>`, and evaluates to the
/// [`HybridProperty`] named `"name"` wrapping it.
///
/// ```
/// # use hyprop::prelude::*;
/// let hybrid = hybrid!(fn greeting(scope) {
///     Term::from("hello ").concat(scope.field("name")?)
/// });
/// assert_eq!(hybrid.name(), "greeting");
/// ```
#[macro_export]
macro_rules! hybrid {
    (fn $name:ident ($scope:ident) $body:block) => {{
        fn $name($scope: &$crate::Scope<'_>) -> $crate::HyResult<$crate::Term> $body
        $crate::HybridProperty::new(stringify!($name), $name)
    }};
}

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::hybrid;
    pub use crate::model::{Attribute, Model, ModelClass, Record};
    pub use crate::property::{HybridProperty, hybrid_property, named};
    pub use crate::registry::{Wrapped, WrapperRegistry};
    pub use crate::scope::Scope;
    pub use crate::term::Term;
    pub use crate::utils::error::{HyResult, HybridError};
    pub use crate::wrapper::HybridWrapper;
    pub use hyexpr::prelude::{F, Value, func, lit};
}

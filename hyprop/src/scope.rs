use std::sync::Arc;

use hyexpr::expr::F;

use crate::model::{Attribute, Model, ModelClass};
use crate::term::Term;
use crate::utils::error::{HyResult, HybridError};

/// What a hybrid function is evaluated against.
///
/// On [`Scope::Class`] the function builds a query expression; on [`Scope::Instance`] it
/// computes a plain value from the instance's fields. Most hybrid functions are written
/// once against [`Scope::field`] and [`Scope::attr`] and work on both sides unchanged:
///
/// ```
/// # use hyprop::prelude::*;
/// fn full_name(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("first")?.concat(" ")?.concat(scope.field("last")?)
/// }
/// ```
#[derive(Clone, Copy)]
pub enum Scope<'a> {
    Class(&'a ModelClass),
    Instance {
        class: &'a ModelClass,
        instance: &'a Arc<dyn Model>,
    },
}

impl<'a> Scope<'a> {
    pub fn class(&self) -> &'a ModelClass {
        match *self {
            Scope::Class(class) => class,
            Scope::Instance { class, .. } => class,
        }
    }

    pub fn instance(&self) -> Option<&'a Arc<dyn Model>> {
        match *self {
            Scope::Class(_) => None,
            Scope::Instance { instance, .. } => Some(instance),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Scope::Class(_))
    }

    pub fn is_instance(&self) -> bool {
        !self.is_class()
    }

    /// A named reference, `F(name)`, on either side.
    ///
    /// The name is not checked here: on the class it becomes a dependency of the hybrid
    /// being built and is resolved (or rejected) with the rest.
    pub fn reference(&self, name: impl Into<String>) -> Term {
        Term::Symbolic(F(name))
    }

    /// Read an attribute by name.
    ///
    /// On the class this is `F(name)`, so a hybrid referenced this way stays a named
    /// dependency. On an instance it is the field's value, or the hybrid's value for that
    /// instance.
    pub fn field(&self, name: &str) -> HyResult<Term> {
        match *self {
            Scope::Class(_) => Ok(self.reference(name)),
            Scope::Instance { class, instance } => read_instance(class, instance, name),
        }
    }

    /// Read an attribute by value.
    ///
    /// On the class a hybrid is replaced by its own expression, so the result carries no
    /// reference to it; a field is `F(name)`. On an instance this is the same as
    /// [`Scope::field`].
    pub fn attr(&self, name: &str) -> HyResult<Term> {
        match *self {
            Scope::Class(class) => match class.attribute(name) {
                Some(Attribute::Field) => Ok(self.reference(name)),
                Some(Attribute::Hybrid(hybrid)) => {
                    Ok(hybrid.get_class(class)?.expression().clone())
                }
                None => Err(HybridError::UnknownAttribute {
                    class: class.name().to_string(),
                    name: name.to_string(),
                }),
            },
            Scope::Instance { class, instance } => read_instance(class, instance, name),
        }
    }
}

fn read_instance(class: &ModelClass, instance: &Arc<dyn Model>, name: &str) -> HyResult<Term> {
    match class.attribute(name) {
        Some(Attribute::Field) => instance.field(name).map(Term::Native).ok_or_else(|| {
            HybridError::MissingField {
                class: class.name().to_string(),
                field: name.to_string(),
            }
        }),
        Some(Attribute::Hybrid(hybrid)) => {
            let value = hybrid.get_instance_dyn(class, instance)?;
            Ok(Term::clone(&*value))
        }
        None => Err(HybridError::UnknownAttribute {
            class: class.name().to_string(),
            name: name.to_string(),
        }),
    }
}

impl std::fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Class(class) => f.debug_tuple("Class").field(&class.name()).finish(),
            Scope::Instance { class, instance } => f
                .debug_struct("Instance")
                .field("class", &class.name())
                .field("instance", &Arc::as_ptr(instance))
                .finish(),
        }
    }
}

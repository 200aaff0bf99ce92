use crate::property::HybridProperty;
use crate::scope::Scope;
use crate::term::Term;
use crate::utils::error::{HyResult, HybridError};

/// Turn `fget` into a hybrid attribute named after the function.
///
/// The name is the identifier of the function item. Closures have none and are rejected;
/// use [`named`] for them.
///
/// ```
/// # use hyprop::prelude::*;
/// fn int_field_alias(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("int_field")
/// }
///
/// let hybrid = hybrid_property(int_field_alias).unwrap();
/// assert_eq!(hybrid.name(), "int_field_alias");
///
/// let err = hybrid_property(|scope: &Scope<'_>| scope.field("int_field")).unwrap_err();
/// assert!(err.is_anonymous_function());
/// ```
///
/// A name cannot be passed positionally alongside the function:
///
/// ```compile_fail
/// # use hyprop::prelude::*;
/// fn int_field_alias(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("int_field")
/// }
///
/// let hybrid = hybrid_property(int_field_alias, "x");
/// ```
pub fn hybrid_property<F>(fget: F) -> HyResult<HybridProperty>
where
    F: Fn(&Scope<'_>) -> HyResult<Term> + Send + Sync + 'static,
{
    let name = function_name::<F>()?;
    Ok(HybridProperty::new(name, fget))
}

/// Decorator that names the hybrid explicitly.
///
/// ```
/// # use hyprop::prelude::*;
/// let hybrid = named("shout").decorate(|scope: &Scope<'_>| {
///     Term::call("upper", [scope.field("char_field")?])
/// });
/// assert_eq!(hybrid.name(), "shout");
/// ```
///
/// `named` takes the name only; the function goes to [`HybridDecorator::decorate`]:
///
/// ```compile_fail
/// # use hyprop::prelude::*;
/// fn int_field_alias(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("int_field")
/// }
///
/// let hybrid = named(int_field_alias);
/// ```
pub fn named(name: impl Into<String>) -> HybridDecorator {
    HybridDecorator { name: name.into() }
}

#[derive(Debug, Clone)]
pub struct HybridDecorator {
    name: String,
}

impl HybridDecorator {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decorate<F>(self, fget: F) -> HybridProperty
    where
        F: Fn(&Scope<'_>) -> HyResult<Term> + Send + Sync + 'static,
    {
        HybridProperty::new(self.name, fget)
    }
}

fn function_name<F>() -> HyResult<String> {
    let type_name = std::any::type_name::<F>();
    identifier_of(type_name)
        .map(str::to_string)
        .ok_or_else(|| HybridError::AnonymousFunction {
            type_name: type_name.to_string(),
        })
}

/// Last path segment of a function item's type name, e.g. `int_field_alias` for
/// `my_crate::models::int_field_alias<T>`. `None` for closures and fn pointers.
///
/// Only the last segment is checked, so a function item declared inside a closure body
/// (`outer::{{closure}}::inner`) keeps its name.
fn identifier_of(type_name: &str) -> Option<&str> {
    if type_name.starts_with("fn(") || type_name.starts_with("for<") {
        return None;
    }

    let path = strip_generics(type_name)?;
    let ident = path.rsplit("::").next()?;

    let mut chars = ident.chars();
    let head = chars.next()?;
    let valid = (head == '_' || head.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && ident != "_";
    valid.then_some(ident)
}

/// `path` without its trailing generic argument list, if any.
fn strip_generics(path: &str) -> Option<&str> {
    if !path.ends_with('>') {
        return Some(path);
    }
    let mut depth = 0usize;
    for (i, c) in path.char_indices().rev() {
        match c {
            // `->` in a fn-type argument is not a bracket.
            '>' if !path[..i].ends_with('-') => depth += 1,
            '<' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&path[..i]);
                }
            }
            _ => {}
        }
    }
    None
}

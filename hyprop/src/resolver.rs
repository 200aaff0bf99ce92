//! Resolution of the names a class-level expression refers to.
use std::cell::RefCell;

use log::trace;

use crate::model::{Attribute, ClassId, ModelClass};
use crate::registry::Wrapped;
use crate::utils::error::{HyResult, HybridError};
use crate::utils::identity::InstanceKey;
use crate::wrapper::Dependency;

/// Resolve every dependency name of `wrapped` against `class`.
///
/// Hybrids are built (recursively, through their class cache) and returned in reference
/// order; fields are leaves and are skipped. Any other name fails the build of `hybrid`.
pub(crate) fn resolve(
    wrapped: &Wrapped,
    class: &ModelClass,
    hybrid: &str,
) -> HyResult<Vec<Dependency>> {
    let mut dependencies = Vec::new();
    for name in wrapped.dependency_names() {
        match class.attribute(name) {
            Some(Attribute::Hybrid(property)) => {
                let wrapper = property.get_class(class)?;
                dependencies.push(Dependency::new(name.clone(), wrapper));
            }
            Some(Attribute::Field) => {
                trace!("`{}.{hybrid}` reads field `{name}`", class.name());
            }
            None => {
                return Err(HybridError::UnresolvedReference {
                    hybrid: hybrid.to_string(),
                    name: name.clone(),
                    class: class.name().to_string(),
                });
            }
        }
    }
    Ok(dependencies)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildKey {
    class: ClassId,
    instance: Option<InstanceKey>,
    name: String,
}

thread_local! {
    static BUILDING: RefCell<Vec<BuildKey>> = const { RefCell::new(Vec::new()) };
}

/// Marks a hybrid as being evaluated on this thread until dropped.
///
/// Entering a hybrid that is already being evaluated for the same class (and instance)
/// means its function depends on itself, which is reported instead of recursing forever.
#[derive(Debug)]
pub(crate) struct BuildGuard {
    depth: usize,
}

impl BuildGuard {
    pub(crate) fn enter(
        class: &ModelClass,
        instance: Option<InstanceKey>,
        name: &str,
    ) -> HyResult<Self> {
        let key = BuildKey {
            class: class.id(),
            instance,
            name: name.to_string(),
        };

        BUILDING.with(|building| {
            let mut building = building.borrow_mut();
            if let Some(start) = building.iter().position(|k| *k == key) {
                let chain = building[start..]
                    .iter()
                    .filter(|k| k.class == key.class && k.instance == key.instance)
                    .map(|k| k.name.clone())
                    .chain(std::iter::once(key.name))
                    .collect();
                return Err(HybridError::CyclicDependency {
                    class: class.name().to_string(),
                    chain,
                });
            }
            building.push(key);
            Ok(BuildGuard {
                depth: building.len(),
            })
        })
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|building| {
            let mut building = building.borrow_mut();
            debug_assert_eq!(building.len(), self.depth, "build guards dropped out of order");
            building.truncate(self.depth - 1);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_is_reported_with_chain() {
        let class = ModelClass::builder("A").build().unwrap();
        let _a = BuildGuard::enter(&class, None, "a").unwrap();
        let _b = BuildGuard::enter(&class, None, "b").unwrap();
        match BuildGuard::enter(&class, None, "a") {
            Err(HybridError::CyclicDependency { chain, .. }) => {
                assert_eq!(chain, ["a", "b", "a"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn guards_release_on_drop() {
        let class = ModelClass::builder("A").build().unwrap();
        {
            let _a = BuildGuard::enter(&class, None, "a").unwrap();
        }
        assert!(BuildGuard::enter(&class, None, "a").is_ok());
    }

    #[test]
    fn instances_are_tracked_apart_from_the_class() {
        let class = ModelClass::builder("A").build().unwrap();
        let instance = std::sync::Arc::new(1u8);
        let _class = BuildGuard::enter(&class, None, "a").unwrap();
        let _instance = BuildGuard::enter(&class, Some(InstanceKey::of(&instance)), "a").unwrap();
    }
}

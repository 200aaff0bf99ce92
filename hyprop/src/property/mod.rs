//! The hybrid attribute descriptor.
//!
//! A [`HybridProperty`] owns the user function and two caches: one [`HybridWrapper`] per
//! class it is read on, and one value per instance. Class reads go through the class's
//! wrapper registry and the dependency resolver; instance reads call the function and
//! keep whatever it returns.
pub mod cache;
pub mod decorator;

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::RwLock;

use crate::model::{ClassId, Model, ModelClass};
use crate::resolver::{self, BuildGuard};
use crate::scope::Scope;
use crate::term::Term;
use crate::utils::error::HyResult;
use crate::utils::identity::InstanceKey;
use crate::wrapper::HybridWrapper;
use cache::InstanceCache;

pub use decorator::{HybridDecorator, hybrid_property, named};

/// Signature of a hybrid function.
pub type HybridFn = dyn Fn(&Scope<'_>) -> HyResult<Term> + Send + Sync;

pub struct HybridProperty {
    name: String,
    fget: Box<HybridFn>,
    class_cache: RwLock<HashMap<ClassId, Arc<HybridWrapper>>>,
    instance_cache: RwLock<Arc<InstanceCache>>,
}

impl HybridProperty {
    pub fn new<F>(name: impl Into<String>, fget: F) -> Self
    where
        F: Fn(&Scope<'_>) -> HyResult<Term> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fget: Box::new(fget),
            class_cache: RwLock::new(HashMap::new()),
            instance_cache: RwLock::new(Arc::new(InstanceCache::new())),
        }
    }

    /// Same as [`decorator::named`].
    pub fn named(name: impl Into<String>) -> HybridDecorator {
        named(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the underlying function directly, bypassing both caches.
    pub fn call(&self, scope: &Scope<'_>) -> HyResult<Term> {
        (self.fget)(scope)
    }

    /// Class-level read.
    ///
    /// Returns the cached wrapper for `class` if there is one. Otherwise the function is
    /// called on the class, its result wrapped with the class's registry, the referenced
    /// names resolved, and the new wrapper cached. Errors are returned as is and leave
    /// nothing cached.
    pub fn get_class(&self, class: &ModelClass) -> HyResult<Arc<HybridWrapper>> {
        let cached = self.class_cache.read().get(&class.id()).cloned();
        if let Some(wrapper) = cached {
            trace!("Class cache hit for `{}.{}`", class.name(), self.name);
            return Ok(wrapper);
        }

        let _guard = BuildGuard::enter(class, None, &self.name)?;
        let term = (self.fget)(&Scope::Class(class))?;
        let wrapped = class.registry().wrap(term);
        let dependencies = resolver::resolve(&wrapped, class, &self.name)?;
        let wrapper = Arc::new(HybridWrapper::from_parts(
            wrapped.into_term(),
            self.name.clone(),
            class,
            dependencies,
        ));
        debug!(
            "Built hybrid `{}.{}` = {} ({} direct dependencies)",
            class.name(),
            self.name,
            wrapper.expression(),
            wrapper.dependencies().len()
        );

        Ok(self
            .class_cache
            .write()
            .entry(class.id())
            .or_insert(wrapper)
            .clone())
    }

    /// Instance-level read.
    ///
    /// The function is called on the instance at most once between resets (barring
    /// concurrent first reads) and its result is returned without wrapping.
    pub fn get_instance<M: Model>(
        &self,
        class: &ModelClass,
        instance: &Arc<M>,
    ) -> HyResult<Arc<Term>> {
        let instance: Arc<dyn Model> = instance.clone();
        self.get_instance_dyn(class, &instance)
    }

    pub fn get_instance_dyn(
        &self,
        class: &ModelClass,
        instance: &Arc<dyn Model>,
    ) -> HyResult<Arc<Term>> {
        let cache = self.instance_cache();
        if let Some(value) = cache.get(instance) {
            trace!("Instance cache hit for `{}.{}`", class.name(), self.name);
            return Ok(value);
        }

        let _guard = BuildGuard::enter(class, Some(InstanceKey::of(instance)), &self.name)?;
        let value = Arc::new((self.fget)(&Scope::Instance { class, instance })?);
        trace!("Evaluated `{}.{}` on an instance: {}", class.name(), self.name, value);
        Ok(cache.insert(instance, value))
    }

    /// Current instance cache. Replaced, not cleared, by [`Self::reset_cache`].
    pub fn instance_cache(&self) -> Arc<InstanceCache> {
        self.instance_cache.read().clone()
    }

    pub fn cached_wrapper(&self, class: &ModelClass) -> Option<Arc<HybridWrapper>> {
        self.class_cache.read().get(&class.id()).cloned()
    }

    /// Forget every cached wrapper and instance value.
    pub fn reset_cache(&self) {
        let dropped = {
            let mut classes = self.class_cache.write();
            let n = classes.len();
            classes.clear();
            n
        };
        *self.instance_cache.write() = Arc::new(InstanceCache::new());
        debug!("Reset caches of hybrid `{}` ({} class wrappers dropped)", self.name, dropped);
    }
}

impl std::fmt::Debug for HybridProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridProperty")
            .field("name", &self.name)
            .field("classes", &self.class_cache.read().len())
            .field("instances", &self.instance_cache.read().len())
            .finish_non_exhaustive()
    }
}

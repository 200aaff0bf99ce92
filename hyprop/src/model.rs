//! Model classes: the runtime objects hybrid attributes are declared on.
//!
//! A [`ModelClass`] lists the plain fields and hybrid attributes of a model and owns the
//! [`WrapperRegistry`] its hybrids are wrapped with. Instances are any `Arc` of a type
//! implementing [`Model`].
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use hyexpr::Value;
use log::debug;
use uuid::Uuid;

use crate::property::HybridProperty;
use crate::registry::WrapperRegistry;
use crate::term::Term;
use crate::utils::error::{HyResult, HybridError};
use crate::wrapper::HybridWrapper;

/// An instance of a model class.
pub trait Model: Send + Sync + 'static {
    /// Value of the plain field `name`, if the instance holds one.
    fn field(&self, name: &str) -> Option<Value>;
}

/// A [`Model`] backed by a map of field values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(name.into(), value.into())
    }
}

impl Model for Record {
    fn field(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Unique identity of a built [`ModelClass`]; no two classes share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(Uuid);

impl ClassId {
    fn next() -> Self {
        ClassId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// An attribute declared on a class.
#[derive(Debug, Clone)]
pub enum Attribute {
    Field,
    Hybrid(Arc<HybridProperty>),
}

impl Attribute {
    pub fn as_hybrid(&self) -> Option<&Arc<HybridProperty>> {
        match self {
            Attribute::Field => None,
            Attribute::Hybrid(hybrid) => Some(hybrid),
        }
    }
}

pub struct ModelClass {
    id: ClassId,
    name: String,
    attributes: Vec<(String, Attribute)>,
    index: HashMap<String, usize>,
    registry: Arc<WrapperRegistry>,
}

impl ModelClass {
    pub fn builder(name: impl Into<String>) -> ModelClassBuilder {
        ModelClassBuilder::new(name)
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<WrapperRegistry> {
        &self.registry
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.index.get(name).map(|&i| &self.attributes[i].1)
    }

    /// Attributes in declaration order, inherited ones first.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes
            .iter()
            .map(|(name, attribute)| (name.as_str(), attribute))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.attributes()
            .filter(|(_, attribute)| matches!(attribute, Attribute::Field))
            .map(|(name, _)| name)
    }

    pub fn hybrids(&self) -> impl Iterator<Item = (&str, &Arc<HybridProperty>)> {
        self.attributes()
            .filter_map(|(name, attribute)| attribute.as_hybrid().map(|h| (name, h)))
    }

    fn lookup(&self, name: &str) -> HyResult<&Attribute> {
        self.attribute(name)
            .ok_or_else(|| HybridError::UnknownAttribute {
                class: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Class-level read of the hybrid attribute `name`.
    pub fn get(&self, name: &str) -> HyResult<Arc<HybridWrapper>> {
        match self.lookup(name)? {
            Attribute::Hybrid(hybrid) => hybrid.get_class(self),
            Attribute::Field => Err(HybridError::NotAHybrid {
                class: self.name.clone(),
                name: name.to_string(),
            }),
        }
    }

    /// Instance-level read of the attribute `name`, field or hybrid.
    pub fn get_for<M: Model>(&self, instance: &Arc<M>, name: &str) -> HyResult<Arc<Term>> {
        let instance: Arc<dyn Model> = instance.clone();
        self.get_for_dyn(&instance, name)
    }

    pub fn get_for_dyn(&self, instance: &Arc<dyn Model>, name: &str) -> HyResult<Arc<Term>> {
        match self.lookup(name)? {
            Attribute::Hybrid(hybrid) => hybrid.get_instance_dyn(self, instance),
            Attribute::Field => instance
                .field(name)
                .map(|value| Arc::new(Term::Native(value)))
                .ok_or_else(|| HybridError::MissingField {
                    class: self.name.clone(),
                    field: name.to_string(),
                }),
        }
    }

    /// Reset the caches of every hybrid declared on this class.
    ///
    /// A hybrid shared with other classes loses their cached entries too.
    pub fn reset_caches(&self) {
        for (_, hybrid) in self.hybrids() {
            hybrid.reset_cache();
        }
    }
}

impl std::fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClass")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("attributes", &self.attributes.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`ModelClass`].
///
/// ```
/// # use hyprop::prelude::*;
/// fn doubled(scope: &Scope<'_>) -> HyResult<Term> {
///     scope.field("value")? * 2
/// }
///
/// let class = ModelClass::builder("Counter")
///     .field("value")
///     .hybrid(hybrid_property(doubled).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(class.get("doubled").unwrap().expression(), &Term::from(F("value") * 2));
/// ```
pub struct ModelClassBuilder {
    name: String,
    inherited: Vec<(String, Attribute)>,
    declared: Vec<(String, Attribute)>,
    registry: Option<Arc<WrapperRegistry>>,
}

impl ModelClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherited: Vec::new(),
            declared: Vec::new(),
            registry: None,
        }
    }

    /// Inherit every attribute of `base`.
    ///
    /// Hybrids are shared with the base class but cache per class. Attributes declared on
    /// this builder override inherited ones of the same name.
    pub fn extends(mut self, base: &ModelClass) -> Self {
        self.inherited = base.attributes.clone();
        if self.registry.is_none() {
            self.registry = Some(base.registry.clone());
        }
        self
    }

    pub fn field(mut self, name: impl Into<String>) -> Self {
        self.declared.push((name.into(), Attribute::Field));
        self
    }

    pub fn fields<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.declared
            .extend(names.into_iter().map(|n| (n.into(), Attribute::Field)));
        self
    }

    /// Declare a hybrid under its own name.
    pub fn hybrid(self, hybrid: impl Into<Arc<HybridProperty>>) -> Self {
        let hybrid = hybrid.into();
        let name = hybrid.name().to_string();
        self.attribute(name, Attribute::Hybrid(hybrid))
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.declared.push((name.into(), attribute));
        self
    }

    /// Wrapper registry used to wrap class-level results. Defaults to the base class's
    /// registry, or [`WrapperRegistry::global`].
    pub fn registry(mut self, registry: Arc<WrapperRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> HyResult<ModelClass> {
        let mut attributes = self.inherited;
        let mut index: HashMap<String, usize> = attributes
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (name.clone(), i))
            .collect();
        let mut declared = HashSet::new();

        for (name, attribute) in self.declared {
            if !declared.insert(name.clone()) {
                return Err(HybridError::DuplicateAttribute {
                    class: self.name,
                    name,
                });
            }
            match index.get(&name) {
                Some(&i) => attributes[i].1 = attribute,
                None => {
                    index.insert(name.clone(), attributes.len());
                    attributes.push((name, attribute));
                }
            }
        }

        let class = ModelClass {
            id: ClassId::next(),
            name: self.name,
            attributes,
            index,
            registry: self
                .registry
                .unwrap_or_else(|| WrapperRegistry::global().clone()),
        };
        debug!(
            "Built model class `{}` ({}) with {} attributes",
            class.name,
            class.id,
            class.attributes.len()
        );
        Ok(class)
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::RwLock;

use crate::model::Model;
use crate::term::Term;
use crate::utils::identity::InstanceKey;

struct Entry {
    instance: Weak<dyn Model>,
    value: Arc<Term>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.instance.strong_count() > 0
    }
}

/// Entry count below which [`InstanceCache::insert`] never purges.
const MIN_PURGE_AT: usize = 32;

#[derive(Default)]
struct Entries {
    map: HashMap<InstanceKey, Entry>,
    purge_at: usize,
}

impl Entries {
    /// Drop dead entries once the map has doubled since the last purge.
    fn purge_if_due(&mut self) {
        if self.map.len() < self.purge_at.max(MIN_PURGE_AT) {
            return;
        }
        let before = self.map.len();
        self.map.retain(|_, entry| entry.is_live());
        self.purge_at = (2 * self.map.len()).max(MIN_PURGE_AT);
        trace!(
            "Purged {} dead instance entries, {} left",
            before - self.map.len(),
            self.map.len()
        );
    }
}

/// Per-instance values of one hybrid attribute.
///
/// Entries are keyed by the address of the instance's allocation and hold a weak handle
/// on it. The weak handle keeps the allocation itself alive, so its address is not reused
/// while the entry exists; a dropped instance's value is simply never served again.
/// Dead entries are purged by [`InstanceCache::insert`] each time the number of entries
/// doubles, and on demand by [`InstanceCache::purge_dead`].
#[derive(Default)]
pub struct InstanceCache {
    entries: RwLock<Entries>,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, instance: &Arc<dyn Model>) -> Option<Arc<Term>> {
        let entries = self.entries.read();
        entries
            .map
            .get(&InstanceKey::of(instance))
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone())
    }

    /// Store `value` for `instance` unless a value is already there; returns the value the
    /// cache holds afterwards.
    pub fn insert(&self, instance: &Arc<dyn Model>, value: Arc<Term>) -> Arc<Term> {
        let mut entries = self.entries.write();
        entries.purge_if_due();
        entries
            .map
            .entry(InstanceKey::of(instance))
            .or_insert_with(|| Entry {
                instance: Arc::downgrade(instance),
                value,
            })
            .value
            .clone()
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.read().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().map.is_empty()
    }

    /// Drop the entries of instances that no longer exist; returns how many were removed.
    pub fn purge_dead(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.map.len();
        entries.map.retain(|_, entry| entry.is_live());
        before - entries.map.len()
    }

    fn live_values(&self) -> HashMap<InstanceKey, Arc<Term>> {
        self.entries
            .read()
            .map
            .iter()
            .filter(|(_, entry)| entry.is_live())
            .map(|(key, entry)| (*key, entry.value.clone()))
            .collect()
    }
}

/// Structural: the same live instances mapped to equal values.
impl PartialEq for InstanceCache {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || self.live_values() == other.live_values()
    }
}

impl std::fmt::Debug for InstanceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read();
        f.debug_map()
            .entries(entries.map.iter().map(|(key, entry)| (key, &entry.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;

    fn instance() -> Arc<dyn Model> {
        Arc::new(Record::new().with("x", 1))
    }

    #[test]
    fn first_insert_wins() {
        let cache = InstanceCache::new();
        let a = instance();
        let first = cache.insert(&a, Arc::new(Term::from(1)));
        let second = cache.insert(&a, Arc::new(Term::from(2)));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&cache.get(&a).unwrap(), &first));
    }

    #[test]
    fn dead_instances_are_not_served() {
        let cache = InstanceCache::new();
        let a = instance();
        cache.insert(&a, Arc::new(Term::from(1)));
        let weak = Arc::downgrade(&a);
        drop(a);
        assert!(weak.upgrade().is_none());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_dead(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn dropped_instances_are_purged_on_insert() {
        let cache = InstanceCache::new();
        for i in 0..1000 {
            let short_lived = instance();
            cache.insert(&short_lived, Arc::new(Term::from(i)));
        }
        assert!(cache.len() <= MIN_PURGE_AT, "{} entries", cache.len());
    }

    #[test]
    fn live_instances_survive_purges() {
        let cache = InstanceCache::new();
        let kept: Vec<_> = (0..100).map(|_| instance()).collect();
        for (i, a) in kept.iter().enumerate() {
            cache.insert(a, Arc::new(Term::from(i as i64)));
            cache.insert(&instance(), Arc::new(Term::from(-1)));
        }
        assert!(cache.len() < 2 * kept.len());
        for (i, a) in kept.iter().enumerate() {
            assert_eq!(*cache.get(a).unwrap(), Term::from(i as i64));
        }
    }

    #[test]
    fn equality_is_structural() {
        let a = instance();
        let left = InstanceCache::new();
        let right = InstanceCache::new();
        left.insert(&a, Arc::new(Term::from(1)));
        assert_ne!(left, right);
        right.insert(&a, Arc::new(Term::from(1)));
        assert_eq!(left, right);
    }
}

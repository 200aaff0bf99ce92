use std::sync::Arc;

/// Identity of a shared allocation, compared and hashed by address.
///
/// Two keys are equal iff they were taken from `Arc`s pointing to the same allocation.
/// The key does not keep the allocation alive: once every `Arc` is dropped the address
/// may be reused, so holders must pair the key with a liveness check (see
/// [`InstanceCache`](crate::property::cache::InstanceCache)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey(usize);

impl InstanceKey {
    pub fn of<T: ?Sized>(value: &Arc<T>) -> Self {
        InstanceKey(Arc::as_ptr(value) as *const () as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_allocation_not_content() {
        let a = Arc::new(1u32);
        let b = Arc::new(1u32);
        assert_eq!(InstanceKey::of(&a), InstanceKey::of(&Arc::clone(&a)));
        assert_ne!(InstanceKey::of(&a), InstanceKey::of(&b));
    }

    #[test]
    fn unsized_views_share_the_key() {
        let a: Arc<[u8; 3]> = Arc::new([1, 2, 3]);
        let s: Arc<[u8]> = a.clone();
        assert_eq!(InstanceKey::of(&a), InstanceKey::of(&s));
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Concurrency-safe handle registries for live native resources.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

/// Maps caller-visible handles to live resources.
///
/// Safe to share between channels calling from different threads. Each
/// operation is atomic on its own; nothing spans several handles.
pub struct HandleRegistry<K, V: ?Sized> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash, V: ?Sized> Default for HandleRegistry<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V: ?Sized> HandleRegistry<K, V> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Strict insert: returns false and changes nothing if `handle` is live.
    pub fn create(&self, handle: K, resource: Arc<V>) -> bool {
        self.create_with(handle, || resource)
    }

    /// Strict insert that only builds the resource once `handle` is known to
    /// be free. The check and the insert happen under one write lock.
    pub fn create_with(&self, handle: K, build: impl FnOnce() -> Arc<V>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(&handle) {
            return false;
        }
        entries.insert(handle, build());
        true
    }

    /// Insert or overwrite.
    pub fn create_or_replace(&self, handle: K, resource: Arc<V>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(handle, resource);
    }

    /// `None` for unknown handles; callers treat that as a silent no-op.
    pub fn get(&self, handle: &K) -> Option<Arc<V>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
    }

    /// Remove if present. Idempotent.
    pub fn remove(&self, handle: &K) -> Option<Arc<V>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    struct Resource(&'static str);

    impl Named for Resource {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn strict_create_keeps_the_first_resource() {
        let registry: HandleRegistry<i64, dyn Named> = HandleRegistry::new();
        assert!(registry.create(1, Arc::new(Resource("first"))));
        assert!(!registry.create(1, Arc::new(Resource("second"))));
        assert_eq!(registry.get(&1).expect("live").name(), "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn replace_returns_the_newest_resource() {
        let registry: HandleRegistry<String, dyn Named> = HandleRegistry::new();
        registry.create_or_replace("h".into(), Arc::new(Resource("first")));
        registry.create_or_replace("h".into(), Arc::new(Resource("second")));
        assert_eq!(registry.get(&"h".to_owned()).expect("live").name(), "second");
    }

    #[test]
    fn unknown_and_removed_handles_resolve_to_none() {
        let registry: HandleRegistry<i64, dyn Named> = HandleRegistry::new();
        assert!(registry.get(&9).is_none());

        registry.create(9, Arc::new(Resource("span")));
        assert!(registry.remove(&9).is_some());
        assert!(registry.remove(&9).is_none());
        assert!(registry.get(&9).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn create_with_skips_the_builder_for_a_live_handle() {
        let registry: HandleRegistry<i64, dyn Named> = HandleRegistry::new();
        assert!(registry.create_with(3, || Arc::new(Resource("first"))));
        assert!(!registry.create_with(3, || panic!("builder must not run for a live handle")));
        assert_eq!(registry.get(&3).expect("live").name(), "first");
    }

    #[test]
    fn poisoned_lock_is_recovered_by_len_and_clear() {
        let registry: Arc<HandleRegistry<i64, dyn Named>> = Arc::new(HandleRegistry::new());
        registry.create(1, Arc::new(Resource("span")));

        let poisoner = Arc::clone(&registry);
        let joined = thread::spawn(move || {
            let _guard = poisoner.entries.write().expect("lock");
            panic!("poison the registry");
        })
        .join();
        assert!(joined.is_err());
        assert!(registry.entries.is_poisoned());

        assert_eq!(registry.len(), 1);
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.get(&1).is_none());
    }

    #[test]
    fn concurrent_strict_creates_admit_exactly_one_winner() {
        let registry: Arc<HandleRegistry<i64, dyn Named>> = Arc::new(HandleRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.create(42, Arc::new(Resource("racer"))))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }
}

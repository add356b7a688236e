use crate::{Action, Permission};

use lru::LruCache;
use std::{
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

/// Number of permission sets kept before the least recently used one is
/// evicted.
const DEFAULT_CAPACITY: usize = 256;

/// Short lived cache of fetched permission rules.
///
/// Entries hold the rules as stored, before dynamic variables are
/// resolved, so one entry serves every caller sharing the same policies.
/// An entry is dropped once it outlives the TTL, once the store's
/// generation moves past the one it was fetched at, or once the cache is
/// full and it is the least recently used.
#[derive(Debug)]
pub(crate) struct PermissionCache {
    ttl: Duration,
    entries: Mutex<LruCache<CacheKey, Entry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CacheKey {
    policies: Vec<String>,
    action: Action,
    collections: Option<Vec<String>>,
}

#[derive(Debug)]
struct Entry {
    generation: u64,
    inserted: Instant,
    permissions: Arc<Vec<Permission>>,
}

impl CacheKey {
    pub(crate) fn new(policies: &[String], action: Action, collections: Option<&[String]>) -> Self {
        let mut policies = policies.to_vec();
        policies.sort();
        policies.dedup();

        let collections = collections.map(|collections| {
            let mut collections = collections.to_vec();
            collections.sort();
            collections.dedup();
            collections
        });

        CacheKey {
            policies,
            action,
            collections,
        }
    }
}

impl Entry {
    fn is_fresh(&self, generation: u64, ttl: Duration) -> bool {
        self.generation == generation && self.inserted.elapsed() < ttl
    }
}

impl PermissionCache {
    pub(crate) fn new(ttl: Duration) -> PermissionCache {
        PermissionCache::with_capacity(ttl, DEFAULT_CAPACITY)
    }

    pub(crate) fn with_capacity(ttl: Duration, capacity: usize) -> PermissionCache {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        PermissionCache {
            ttl,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    pub(crate) fn get(&self, key: &CacheKey, generation: u64) -> Option<Arc<Vec<Permission>>> {
        if !self.is_enabled() {
            return None;
        }

        let mut entries = self.lock();
        let fresh = entries
            .peek(key)
            .map(|entry| entry.is_fresh(generation, self.ttl))?;

        if fresh {
            entries.get(key).map(|entry| entry.permissions.clone())
        } else {
            entries.pop(key);
            None
        }
    }

    pub(crate) fn insert(
        &self,
        key: CacheKey,
        generation: u64,
        permissions: Arc<Vec<Permission>>,
    ) {
        if !self.is_enabled() {
            return;
        }

        let mut entries = self.lock();

        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_fresh(generation, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }

        entries.put(
            key,
            Entry {
                generation,
                inserted: Instant::now(),
                permissions,
            },
        );
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Arc<Vec<Permission>> {
        Arc::new(vec![Permission::new("p", "articles", Action::Read)])
    }

    fn key() -> CacheKey {
        CacheKey::new(&["p".to_string()], Action::Read, None)
    }

    #[test]
    fn key_ignores_order() {
        let names = |items: &[&str]| -> Vec<String> {
            items.iter().map(|item| item.to_string()).collect()
        };

        let a = CacheKey::new(
            &names(&["b", "a"]),
            Action::Read,
            Some(&names(&["y", "x"])[..]),
        );
        let b = CacheKey::new(
            &names(&["a", "b"]),
            Action::Read,
            Some(&names(&["x", "y"])[..]),
        );
        assert_eq!(a, b);

        let all = CacheKey::new(&names(&["a", "b"]), Action::Read, None);
        assert_ne!(a, all);
    }

    #[test]
    fn hit_until_generation_changes() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        cache.insert(key(), 1, rules());

        assert!(cache.get(&key(), 1).is_some());
        assert!(cache.get(&key(), 2).is_none());
        // The stale entry is evicted on the miss.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn expires_after_ttl() {
        let cache = PermissionCache::new(Duration::from_millis(1));
        cache.insert(key(), 0, rules());
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get(&key(), 0).is_none());
    }

    #[test]
    fn zero_ttl_disables() {
        let cache = PermissionCache::new(Duration::ZERO);
        cache.insert(key(), 0, rules());
        assert!(cache.get(&key(), 0).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = PermissionCache::with_capacity(Duration::from_secs(60), 2);
        let keys: Vec<CacheKey> = ["a", "b", "c"]
            .iter()
            .map(|policy| CacheKey::new(&[policy.to_string()], Action::Read, None))
            .collect();

        cache.insert(keys[0].clone(), 0, rules());
        cache.insert(keys[1].clone(), 0, rules());
        assert!(cache.get(&keys[0], 0).is_some());

        cache.insert(keys[2].clone(), 0, rules());
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&keys[1], 0).is_none());
        assert!(cache.get(&keys[0], 0).is_some());
        assert!(cache.get(&keys[2], 0).is_some());
    }

    #[test]
    fn insert_drops_expired_entries() {
        let cache = PermissionCache::new(Duration::from_millis(1));
        cache.insert(key(), 0, rules());
        std::thread::sleep(Duration::from_millis(10));

        let other = CacheKey::new(&["q".to_string()], Action::Read, None);
        cache.insert(other, 0, rules());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear() {
        let cache = PermissionCache::new(Duration::from_secs(60));
        cache.insert(key(), 0, rules());
        cache.clear();
        assert!(cache.get(&key(), 0).is_none());
    }
}

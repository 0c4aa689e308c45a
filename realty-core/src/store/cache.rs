//! In-process table cache keyed by producer fingerprint.
//!
//! Entries live until `invalidate` / `clear`; there is no automatic expiry.

use crate::domain::{CacheKey, IndexTable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache of loaded tables.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: Mutex<HashMap<CacheKey, Arc<IndexTable>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached table for `key`, if present.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<IndexTable>> {
        self.lock().get(key).cloned()
    }

    /// Store a table and return the shared handle.
    pub fn put(&self, key: CacheKey, table: IndexTable) -> Arc<IndexTable> {
        let table = Arc::new(table);
        self.lock().insert(key, Arc::clone(&table));
        table
    }

    /// Drop the entry for `key`. Returns whether anything was removed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<IndexTable>>> {
        // Poisoning leaves the map intact
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_invalidate() {
        let cache = TableCache::new();
        let key = CacheKey::from_bytes(b"registry-v1");

        assert!(cache.get(&key).is_none());
        let stored = cache.put(key.clone(), IndexTable::empty());
        let fetched = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));

        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_independent() {
        let cache = TableCache::new();
        cache.put(CacheKey::from_bytes(b"a"), IndexTable::empty());
        cache.put(CacheKey::from_bytes(b"b"), IndexTable::empty());
        assert_eq!(cache.len(), 2);

        cache.invalidate(&CacheKey::from_bytes(b"a"));
        assert!(cache.get(&CacheKey::from_bytes(b"b")).is_some());

        cache.clear();
        assert!(cache.is_empty());
    }
}

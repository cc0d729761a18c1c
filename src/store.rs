//! Minimal in-memory stand-in for the document store the fabric treats as
//! an external collaborator (§1): consumed only through "fetch by primary
//! key" / "write by primary key". Used by [`crate::services`]'s reference
//! collaborators to exercise cache-aside end to end; not a durability
//! story of its own (§1 non-goals).

use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::Hash;

pub struct InMemoryStore<K, V> {
    rows: Mutex<HashMap<K, V>>,
}

impl<K, V> InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
        }
    }

    pub fn fetch(&self, key: &K) -> Option<V> {
        self.rows.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) {
        self.rows.lock().insert(key, value);
    }

    /// Applies `update` to the row for `key`, inserting `default()` first
    /// if it's absent (an upsert, grounded on `timeline/server.go`'s
    /// `UpdateOne(... SetUpsert(true))`).
    pub fn upsert_with(&self, key: K, default: impl FnOnce() -> V, update: impl FnOnce(&mut V)) {
        let mut rows = self.rows.lock();
        let row = rows.entry(key).or_insert_with(default);
        update(row);
    }
}

impl<K, V> Default for InMemoryStore<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_is_none_before_insert() {
        let store: InMemoryStore<i64, String> = InMemoryStore::new();
        assert_eq!(store.fetch(&1), None);
        store.insert(1, "hi".to_string());
        assert_eq!(store.fetch(&1), Some("hi".to_string()));
    }

    #[test]
    fn upsert_with_creates_then_updates() {
        let store: InMemoryStore<i64, Vec<i32>> = InMemoryStore::new();
        store.upsert_with(1, Vec::new, |rows| rows.push(1));
        store.upsert_with(1, Vec::new, |rows| rows.push(2));
        assert_eq!(store.fetch(&1), Some(vec![1, 2]));
    }
}

//! One fine-grained lock partition inside a shard (C1).
//!
//! Grounded on `cached/server.go`'s `cache{sync.Mutex; cache map[string][]byte}`:
//! a mutex paired with a plain map, one per bin. Gets never fail, Sets never
//! fail, Deletes are idempotent — there is no error path inside a bin.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
pub struct Bin {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl Bin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().get(key).cloned()
    }

    pub fn set(&self, key: String, value: Vec<u8>) {
        self.entries.lock().insert(key, value);
    }

    pub fn delete(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let bin = Bin::new();
        assert_eq!(bin.get("a"), None);
        bin.set("a".to_string(), b"1".to_vec());
        assert_eq!(bin.get("a"), Some(b"1".to_vec()));
    }

    #[test]
    fn delete_is_idempotent() {
        let bin = Bin::new();
        bin.set("a".to_string(), b"1".to_vec());
        bin.delete("a");
        bin.delete("a");
        assert_eq!(bin.get("a"), None);
        assert_eq!(bin.len(), 0);
    }
}

//! Bin-sharded in-memory KV store (C1): a fixed `B=1009` array of
//! [`Bin`](crate::cache::bin::Bin)s, routed by `fnv32a(key) mod B`.
//!
//! Grounded on `cached/server.go`'s `NBIN`/`key2bin`/`bins []cache`.

use crate::cache::bin::Bin;
use crate::config::BIN_COUNT;
use crate::hash::fnv1a32;

pub struct CacheShard {
    bins: Vec<Bin>,
}

impl CacheShard {
    pub fn new() -> Self {
        Self {
            bins: (0..BIN_COUNT).map(|_| Bin::new()).collect(),
        }
    }

    fn bin_index(key: &str) -> usize {
        (fnv1a32(key) % BIN_COUNT) as usize
    }

    /// `(value, hit)`.
    pub fn get(&self, key: &str) -> (Vec<u8>, bool) {
        match self.bins[Self::bin_index(key)].get(key) {
            Some(value) => (value, true),
            None => (Vec::new(), false),
        }
    }

    pub fn set(&self, key: &str, value: Vec<u8>) -> bool {
        self.bins[Self::bin_index(key)].set(key.to_string(), value);
        true
    }

    pub fn delete(&self, key: &str) -> bool {
        self.bins[Self::bin_index(key)].delete(key);
        true
    }
}

impl Default for CacheShard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_routing_is_deterministic() {
        for key in ["post_1", "timeline_7", "followers_5", ""] {
            assert_eq!(CacheShard::bin_index(key), CacheShard::bin_index(key));
        }
    }

    #[test]
    fn round_trip_hit_and_miss() {
        let shard = CacheShard::new();
        let (_, hit) = shard.get("a");
        assert!(!hit);

        assert!(shard.set("a", b"1".to_vec()));
        let (value, hit) = shard.get("a");
        assert!(hit);
        assert_eq!(value, b"1");

        assert!(shard.delete("a"));
        let (_, hit) = shard.get("a");
        assert!(!hit);
    }

    #[test]
    fn delete_twice_is_ok() {
        let shard = CacheShard::new();
        assert!(shard.delete("missing"));
        assert!(shard.delete("missing"));
    }
}

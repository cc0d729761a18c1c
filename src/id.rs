//! Process-local monotonically increasing 64-bit ID allocator (C5).
//!
//! Grounded on `compose/server.go`'s `sid`/`incCountSafe`/`getNextPostId`:
//! a random session prefix drawn at startup, combined with an in-process
//! counter, so IDs are unique within a process and unique with high
//! probability across a small cluster.

use rand::Rng;
use std::sync::atomic::{AtomicI32, Ordering};

/// Upper bound (exclusive) on the random session id: 2^29.
const SESSION_ID_BOUND: u32 = 1 << 29;

pub struct IdAllocator {
    session_id: u32,
    counter: AtomicI32,
}

impl IdAllocator {
    /// Draws a fresh random session id. Call once per process.
    pub fn new() -> Self {
        let session_id = rand::rng().random_range(0..SESSION_ID_BOUND);
        Self::with_session_id(session_id)
    }

    /// Construct with an explicit session id, mainly for deterministic tests.
    pub fn with_session_id(session_id: u32) -> Self {
        Self {
            session_id,
            counter: AtomicI32::new(0),
        }
    }

    /// Next strictly-increasing id: `session_id * 1e10 + counter`.
    ///
    /// The counter wraps after ~2^31 allocations; this is a hard ceiling per
    /// process lifetime per §4.5, not handled here.
    pub fn next_id(&self) -> i64 {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        self.session_id as i64 * 10_000_000_000 + counter as i64
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_strictly_increase_within_a_process() {
        let alloc = IdAllocator::with_session_id(7);
        let first = alloc.next_id();
        let second = alloc.next_id();
        let third = alloc.next_id();
        assert!(second > first);
        assert!(third > second);
    }

    #[test]
    fn encodes_session_id_in_high_order_bits() {
        let alloc = IdAllocator::with_session_id(42);
        let id = alloc.next_id();
        assert_eq!(id, 42 * 10_000_000_000 + 1);
    }

    #[test]
    fn distinct_session_ids_cannot_collide_for_small_counters() {
        let a = IdAllocator::with_session_id(1);
        let b = IdAllocator::with_session_id(2);
        assert_ne!(a.next_id(), b.next_id());
    }
}

//! Owner timeline service (§3.1, §4.4.1): write-invalidate on write,
//! read-through on read. Grounded on `timeline/server.go`'s
//! `WriteTimeline`/`ReadTimeline`/`getUserTimeline`.

use crate::aside::{read_through, write_invalidate};
use crate::client::CacheClient;
use crate::error::Result;
use crate::scope::Scope;
use crate::store::InMemoryStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimelineEntry {
    pub post_id: i64,
    pub timestamp: i64,
}

pub struct TimelineService {
    /// Insertion-ordered (oldest first) per user; `read_timeline` reverses.
    store: InMemoryStore<i64, Vec<TimelineEntry>>,
}

impl TimelineService {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    fn key(user_id: i64) -> String {
        format!("timeline_{user_id}")
    }

    pub async fn write_timeline(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        user_id: i64,
        post_id: i64,
        timestamp: i64,
    ) -> Result<()> {
        write_invalidate(cache, scope, &Self::key(user_id), || async {
            self.store.upsert_with(
                user_id,
                Vec::new,
                |entries| entries.push(TimelineEntry { post_id, timestamp }),
            );
            Ok(())
        })
        .await
    }

    /// Returns post ids for `[start, stop)` in reverse-timestamp order,
    /// backfilling the cache window on a miss.
    pub async fn read_timeline(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        user_id: i64,
        start: usize,
        stop: usize,
    ) -> Result<Vec<i64>> {
        let entries = read_through(cache, scope, &Self::key(user_id), || async {
            Ok(Some(self.store.fetch(&user_id).unwrap_or_default()))
        })
        .await?
        .unwrap_or_default();

        let mut reversed: Vec<TimelineEntry> = entries;
        reversed.reverse();
        let stop = stop.min(reversed.len());
        if start >= reversed.len() || start >= stop {
            return Ok(Vec::new());
        }
        Ok(reversed[start..stop].iter().map(|e| e.post_id).collect())
    }
}

impl Default for TimelineService {
    fn default() -> Self {
        Self::new()
    }
}


// See tests/scenarios.rs (S5) for the cache-invalidation behavior itself,
// exercised over a real CacheServer + InternalCacheClient pair.

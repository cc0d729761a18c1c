//! Home timeline service (§3.1, §4.4.1): write-through-append fan-out to
//! followers, cache-only reads. Grounded on `home/server.go`'s
//! `WriteHomeTimeline`/`ReadHomeTimeline`/`getHomeTimeline`.
//!
//! Durability decision (see DESIGN.md): cache-only. There is no document
//! store backing this service; a cold miss builds an empty timeline rather
//! than falling through to a store read, matching `getHomeTimeline`'s
//! miss branch, which never queries Mongo.

use crate::aside::write_through_append;
use crate::client::{CacheClient, CacheLookup};
use crate::error::Result;
use crate::scope::Scope;
use crate::services::timeline::TimelineEntry;
use crate::services::post::{Post, PostService};

pub struct HomeTimelineService;

impl HomeTimelineService {
    pub fn new() -> Self {
        Self
    }

    fn key(user_id: i64) -> String {
        format!("home_{user_id}")
    }

    /// Appends `post_id` to the home timeline of every follower and every
    /// mentioned user (§4.4.1): read-or-build, append, write back. No
    /// store write in this path.
    pub async fn write_home_timeline(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        post_id: i64,
        timestamp: i64,
        recipient_ids: &[i64],
    ) -> Result<()> {
        for recipient_id in recipient_ids {
            write_through_append(
                cache,
                scope,
                &Self::key(*recipient_id),
                Vec::new,
                TimelineEntry { post_id, timestamp },
            )
            .await?;
        }
        Ok(())
    }

    /// Cache-only read: a miss yields an empty timeline rather than a store
    /// fallback (see the durability decision above).
    async fn home_entries(&self, cache: &dyn CacheClient, scope: &Scope, user_id: i64) -> Result<Vec<TimelineEntry>> {
        match cache.get(scope, &Self::key(user_id)).await {
            Ok(CacheLookup::Hit(bytes)) => Ok(serde_json::from_slice(&bytes)?),
            Ok(CacheLookup::Miss) => Ok(Vec::new()),
            Err(crate::error::FabricError::NoCachesRegistered) => Ok(Vec::new()),
            Err(crate::error::FabricError::Transport(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn read_home_timeline(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        posts: &PostService,
        user_id: i64,
        start: usize,
        stop: usize,
    ) -> Result<Vec<Post>> {
        let mut entries = self.home_entries(cache, scope, user_id).await?;
        entries.reverse();
        let stop = stop.min(entries.len());
        if start >= entries.len() || start >= stop {
            return Ok(Vec::new());
        }
        let post_ids: Vec<i64> = entries[start..stop].iter().map(|e| e.post_id).collect();
        posts.read_posts(cache, scope, &post_ids).await
    }
}

impl Default for HomeTimelineService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InternalCacheClient;

    #[tokio::test]
    async fn read_without_any_write_is_empty() {
        let cache = InternalCacheClient::new();
        let scope = Scope::unbounded();
        let posts = PostService::new();
        let home = HomeTimelineService::new();

        let result = home.read_home_timeline(cache.as_ref(), &scope, &posts, 1, 0, 5).await.unwrap();
        assert!(result.is_empty());
    }
}

//! Compose service (§4.4.1's "explicit join" note): fans a new post out to
//! storage, the owner timeline, and the home timelines of its recipients
//! concurrently, succeeding only if every leg succeeds. Grounded on
//! `compose/server.go`'s `ComposePost`/`getNextPostId`.

use crate::error::{FabricError, Result};
use crate::id::IdAllocator;
use crate::scope::Scope;
use crate::client::CacheClient;
use crate::services::home::HomeTimelineService;
use crate::services::post::{Post, PostService};
use crate::services::timeline::TimelineService;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct ComposeService {
    ids: IdAllocator,
}

impl ComposeService {
    pub fn new() -> Self {
        Self {
            ids: IdAllocator::new(),
        }
    }

    fn now_nanos() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or(0)
    }

    /// Composes and fans out a post. `recipient_ids` is the set of users
    /// whose home timeline gets the new post (the mentioned users plus the
    /// creator's followers in the source; left to the caller to assemble
    /// since graph/mention resolution is an external collaborator here).
    pub async fn compose_post(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        posts: &PostService,
        timelines: &TimelineService,
        home: &HomeTimelineService,
        creator_id: i64,
        text: String,
        recipient_ids: &[i64],
    ) -> Result<Post> {
        if text.is_empty() {
            return Err(FabricError::Config("cannot compose an empty post".to_string()));
        }

        let post_id = self.ids.next_id();
        let timestamp = Self::now_nanos();
        let post = Post {
            post_id,
            creator_id,
            text,
            timestamp,
        };

        let store_post = async {
            posts.store_post(post.clone());
            Ok::<(), FabricError>(())
        };
        let write_timeline = timelines.write_timeline(cache, scope, creator_id, post_id, timestamp);
        let write_home_timeline = home.write_home_timeline(cache, scope, post_id, timestamp, recipient_ids);

        let (store_result, timeline_result, home_result) =
            tokio::join!(store_post, write_timeline, write_home_timeline);
        store_result?;
        timeline_result?;
        home_result?;

        Ok(post)
    }
}

impl Default for ComposeService {
    fn default() -> Self {
        Self::new()
    }
}

//! Social graph service (§3.1, §4.4.1): follow/unfollow edge updates with a
//! write-invalidate-many across both edge directions. Grounded on
//! `graph/server.go`'s `updateGraph`/`clearCache`/`getFollowers`/
//! `getFollowees`.

use crate::aside::{read_through, write_invalidate_many};
use crate::client::CacheClient;
use crate::error::{FabricError, Result};
use crate::scope::Scope;
use crate::store::InMemoryStore;

pub struct GraphService {
    followers: InMemoryStore<i64, Vec<i64>>,
    followees: InMemoryStore<i64, Vec<i64>>,
}

impl GraphService {
    pub fn new() -> Self {
        Self {
            followers: InMemoryStore::new(),
            followees: InMemoryStore::new(),
        }
    }

    fn followers_key(user_id: i64) -> String {
        format!("followers_{user_id}")
    }

    fn followees_key(user_id: i64) -> String {
        format!("followees_{user_id}")
    }

    /// Adds `follower_id -> followee_id` to both edge lists and invalidates
    /// the two affected cache entries. Self-follows are rejected, matching
    /// `updateGraph`'s explicit guard.
    pub async fn follow(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<()> {
        self.update_graph(cache, scope, follower_id, followee_id, true).await
    }

    pub async fn unfollow(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        follower_id: i64,
        followee_id: i64,
    ) -> Result<()> {
        self.update_graph(cache, scope, follower_id, followee_id, false).await
    }

    async fn update_graph(
        &self,
        cache: &dyn CacheClient,
        scope: &Scope,
        follower_id: i64,
        followee_id: i64,
        is_follow: bool,
    ) -> Result<()> {
        if follower_id == followee_id {
            return Err(FabricError::Config("cannot follow or unfollow self".to_string()));
        }

        let keys = vec![
            Self::followers_key(followee_id),
            Self::followees_key(follower_id),
        ];

        write_invalidate_many(cache, scope, &keys, || async {
            if is_follow {
                self.followers.upsert_with(followee_id, Vec::new, |edges| {
                    if !edges.contains(&follower_id) {
                        edges.push(follower_id);
                    }
                });
                self.followees.upsert_with(follower_id, Vec::new, |edges| {
                    if !edges.contains(&followee_id) {
                        edges.push(followee_id);
                    }
                });
            } else {
                self.followers.upsert_with(followee_id, Vec::new, |edges| {
                    edges.retain(|&id| id != follower_id);
                });
                self.followees.upsert_with(follower_id, Vec::new, |edges| {
                    edges.retain(|&id| id != followee_id);
                });
            }
            Ok(())
        })
        .await
    }

    pub async fn get_followers(&self, cache: &dyn CacheClient, scope: &Scope, user_id: i64) -> Result<Vec<i64>> {
        let key = Self::followers_key(user_id);
        Ok(read_through(cache, scope, &key, || async {
            Ok(Some(self.followers.fetch(&user_id).unwrap_or_default()))
        })
        .await?
        .unwrap_or_default())
    }

    pub async fn get_followees(&self, cache: &dyn CacheClient, scope: &Scope, user_id: i64) -> Result<Vec<i64>> {
        let key = Self::followees_key(user_id);
        Ok(read_through(cache, scope, &key, || async {
            Ok(Some(self.followees.fetch(&user_id).unwrap_or_default()))
        })
        .await?
        .unwrap_or_default())
    }
}

impl Default for GraphService {
    fn default() -> Self {
        Self::new()
    }
}

//! Post service (§3.1, §4.4.1 reference collaborator): insert-only writes,
//! read-through reads. Grounded on `post/server.go`'s `StorePost`/
//! `ReadPosts`.

use crate::aside::read_through;
use crate::client::CacheClient;
use crate::error::Result;
use crate::scope::Scope;
use crate::store::InMemoryStore;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub post_id: i64,
    pub creator_id: i64,
    pub text: String,
    pub timestamp: i64,
}

pub struct PostService {
    store: InMemoryStore<i64, Post>,
}

impl PostService {
    pub fn new() -> Self {
        Self {
            store: InMemoryStore::new(),
        }
    }

    fn key(post_id: i64) -> String {
        format!("post_{post_id}")
    }

    /// Insert-only (§4.4c): write to the store, don't prefill the cache.
    /// The first reader fills it via `read_post`.
    pub fn store_post(&self, post: Post) {
        self.store.insert(post.post_id, post);
    }

    pub async fn read_post(&self, cache: &dyn CacheClient, scope: &Scope, post_id: i64) -> Result<Option<Post>> {
        read_through(cache, scope, &Self::key(post_id), || async {
            Ok(self.store.fetch(&post_id))
        })
        .await
    }

    pub async fn read_posts(&self, cache: &dyn CacheClient, scope: &Scope, post_ids: &[i64]) -> Result<Vec<Post>> {
        let mut posts = Vec::with_capacity(post_ids.len());
        for post_id in post_ids {
            if let Some(post) = self.read_post(cache, scope, *post_id).await? {
                posts.push(post);
            }
        }
        Ok(posts)
    }
}

impl Default for PostService {
    fn default() -> Self {
        Self::new()
    }
}

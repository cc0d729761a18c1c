//! Cache client (C3): the capability every application service embeds.
//!
//! One trait, two implementations (§4.3.1, grounded in §9's duck-typed-
//! interface note): [`InternalCacheClient`] routes to the in-tree sharded
//! server; [`MemcachedClient`] is a thin pass-through to an external
//! memcached. Every cache-aside call site in [`crate::aside`] and
//! [`crate::services`] consumes the trait object, never either variant
//! directly.

pub mod internal;
pub mod memcached;
pub mod routing;

use crate::error::Result;
use crate::scope::Scope;
use async_trait::async_trait;
use bytes::Bytes;

pub use internal::{InternalCacheClient, RegistrationListener};
pub use memcached::MemcachedClient;

/// The value half of a cache entry. The key is opaque outside this struct;
/// the cache never interprets `value`.
#[derive(Debug, Clone)]
pub struct CacheItem {
    pub key: String,
    pub value: Bytes,
}

impl CacheItem {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Result of a `Get`. `Miss` is a normal return (§7 kind 1), not an error.
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Bytes),
    Miss,
}

impl CacheLookup {
    pub fn into_hit(self) -> Option<Bytes> {
        match self {
            CacheLookup::Hit(b) => Some(b),
            CacheLookup::Miss => None,
        }
    }
}

#[async_trait]
pub trait CacheClient: Send + Sync {
    async fn get(&self, scope: &Scope, key: &str) -> Result<CacheLookup>;
    async fn set(&self, scope: &Scope, item: CacheItem) -> Result<()>;
    async fn delete(&self, scope: &Scope, key: &str) -> Result<()>;
}

//! Cache-aside orchestration (C4): the read-through, write-invalidate, and
//! readiness-retry recipes every reference collaborator in
//! [`crate::services`] builds on. Treated as a policy enforced by
//! discipline (§4.4), not a single library call each caller must use, but
//! the read/write rules here are contractual.

use crate::client::{CacheClient, CacheItem, CacheLookup};
use crate::error::{FabricError, Result};
use crate::scope::Scope;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Read-through (§4.4 `readE(pk)`): on a hit, decode and return; on a miss,
/// call `fetch_from_store`, and if the store has it, backfill the cache and
/// return it; if the store doesn't, return `Ok(None)` without backfilling a
/// negative.
///
/// Any cache error other than a miss is treated the same as a miss for
/// reads (§7: "allowed to treat MISS and TRANSPORT identically for reads")
/// — correctness depends on the store, not the cache, so a degraded cache
/// must not fail the read.
pub async fn read_through<T, F, Fut>(
    cache: &dyn CacheClient,
    scope: &Scope,
    key: &str,
    fetch_from_store: F,
) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let from_cache = match cache.get(scope, key).await {
        Ok(CacheLookup::Hit(bytes)) => Some(bytes),
        Ok(CacheLookup::Miss) => None,
        Err(FabricError::NoCachesRegistered) | Err(FabricError::Transport(_)) => None,
        Err(e) => return Err(e),
    };

    if let Some(bytes) = from_cache {
        return Ok(Some(serde_json::from_slice(&bytes)?));
    }

    match fetch_from_store().await? {
        None => Ok(None),
        Some(value) => {
            let encoded = serde_json::to_vec(&value)?;
            if let Err(e) = cache.set(scope, CacheItem::new(key.to_string(), encoded)).await {
                tracing::warn!(key, error = %e, "cache-aside backfill failed after store read");
            }
            Ok(Some(value))
        }
    }
}

/// Write-invalidate (§4.4a): write to the document store, then delete the
/// affected key. Unlike reads, a failed invalidate must be surfaced, never
/// swallowed (§7), since silently leaving the stale entry in place is the
/// one failure mode this discipline exists to prevent.
pub async fn write_invalidate<F, Fut>(
    cache: &dyn CacheClient,
    scope: &Scope,
    key: &str,
    write_to_store: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    write_to_store().await?;
    cache.delete(scope, key).await
}

/// Write-invalidate over several keys, e.g. a follow/unfollow touching both
/// `followers_<to>` and `followees_<from>` (§3.1). All keys are deleted;
/// the first delete error is returned after every key has been attempted,
/// so one bad key doesn't leave a later one stale.
pub async fn write_invalidate_many<F, Fut>(
    cache: &dyn CacheClient,
    scope: &Scope,
    keys: &[String],
    write_to_store: F,
) -> Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    write_to_store().await?;
    let mut first_error = None;
    for key in keys {
        if let Err(e) = cache.delete(scope, key).await {
            tracing::error!(key, error = %e, "write-invalidate delete failed");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Read-or-build-then-append write-through for append-only aggregates
/// (§4.4b, the home timeline): read the cached list (or start empty on a
/// miss), append `item`, write the whole list back. There is no
/// corresponding store write in this pattern — see DESIGN.md's recorded
/// decision on home-timeline durability.
pub async fn write_through_append<T>(
    cache: &dyn CacheClient,
    scope: &Scope,
    key: &str,
    build_on_miss: impl FnOnce() -> Vec<T>,
    item: T,
) -> Result<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut list: Vec<T> = match cache.get(scope, key).await {
        Ok(CacheLookup::Hit(bytes)) => serde_json::from_slice(&bytes)?,
        Ok(CacheLookup::Miss) => build_on_miss(),
        Err(FabricError::NoCachesRegistered) | Err(FabricError::Transport(_)) => build_on_miss(),
        Err(e) => return Err(e),
    };
    list.push(item);
    let encoded = serde_json::to_vec(&list)?;
    cache.set(scope, CacheItem::new(key.to_string(), encoded)).await
}

/// Retries a cache-aside call a bounded number of times while the client is
/// still in its `NO_CACHES_REGISTERED` startup window (§9's "startup
/// ordering" open question — resolved here rather than inside the client,
/// so the client's own per-call latency stays predictable).
pub async fn with_readiness_retry<T, F, Fut>(mut call: F, attempts: usize, backoff: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = FabricError::NoCachesRegistered;
    for attempt in 0..attempts {
        match call().await {
            Ok(value) => return Ok(value),
            Err(FabricError::NoCachesRegistered) => {
                last_error = FabricError::NoCachesRegistered;
                if attempt + 1 < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InternalCacheClient;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn read_through_falls_through_to_the_store_before_any_cache_registers() {
        let client = InternalCacheClient::new();
        let scope = Scope::unbounded();
        let store_reads = AtomicUsize::new(0);

        let result: Result<Option<String>> = read_through(client.as_ref(), &scope, "post_1", || async {
            store_reads.fetch_add(1, Ordering::SeqCst);
            Ok(Some("hi".to_string()))
        })
        .await;

        assert_eq!(result.unwrap(), Some("hi".to_string()));
        assert_eq!(store_reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn read_through_returns_none_without_backfill_on_store_miss() {
        let client = InternalCacheClient::new();
        let scope = Scope::unbounded();

        let result: Result<Option<String>> =
            read_through(client.as_ref(), &scope, "post_missing", || async { Ok(None) }).await;

        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn readiness_retry_gives_up_after_its_attempt_budget() {
        let client = InternalCacheClient::new();
        let scope = Scope::unbounded();
        let result: Result<CacheLookup> =
            with_readiness_retry(|| client.get(&scope, "x"), 2, Duration::from_millis(1)).await;
        assert!(matches!(result, Err(FabricError::NoCachesRegistered)));
    }
}

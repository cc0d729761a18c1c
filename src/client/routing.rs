//! The client-local routing table (§4.3, the "subtle part"): a copy-on-write
//! sequence of [`ShardEntry`]s plus an atomically-published count, and the
//! per-shard session pool each entry owns.
//!
//! Grounded on `cacheclnt.go`'s `Selector`/`ccs [][]cached.CachedClient`/
//! `RegisterCache`: the Go source copies the whole `[][]CachedClient` slice
//! under a mutex and swaps it in, then bumps `ncs` with a separate atomic
//! add. This expansion collapses that two-step publish into one
//! `ArcSwap<Vec<Arc<ShardEntry>>>` snapshot swap followed by one
//! `AtomicUsize` store, published snapshot-first — see `dc8a529f_hdds-team-
//! hdds__crates-hdds-src-config.rs.rs` for the `ArcSwap` publication shape
//! this follows.

use crate::config::SESSIONS_PER_SHARD;
use crate::error::{FabricError, Result};
use crate::protocol::framing::{read_message, write_message};
use crate::protocol::messages::{CacheRequest, CacheResponse};
use crate::scope::Scope;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::Mutex as AsyncMutex;

/// One independent RPC channel to a shard. Serialized by its own mutex: a
/// session carries one in-flight request/response pair at a time, so
/// parallelism comes from holding several sessions per shard, not from
/// sharing one.
pub struct Session {
    stream: AsyncMutex<TcpStream>,
}

impl Session {
    async fn dial(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| FabricError::Transport(format!("dial {addr}: {e}")))?;
        Ok(Self {
            stream: AsyncMutex::new(stream),
        })
    }

    async fn call(&self, scope: &Scope, request: CacheRequest) -> Result<CacheResponse> {
        let mut stream = self.stream.lock().await;
        tokio::time::timeout(scope.remaining(), async {
            write_message(&mut *stream, &request).await?;
            read_message(&mut *stream).await
        })
        .await
        .map_err(|_| FabricError::Transport("deadline".to_string()))?
    }
}

/// Monotonically increasing round-robin counter over a fixed range,
/// grounded on `cacheclnt.go`'s `Selector`.
pub struct Selector {
    next: AtomicUsize,
    limit: usize,
}

impl Selector {
    pub fn new(limit: usize) -> Self {
        Self {
            next: AtomicUsize::new(0),
            limit,
        }
    }

    pub fn next(&self) -> usize {
        self.next.fetch_add(1, Ordering::Relaxed) % self.limit
    }
}

/// One registered shard: its address and its fixed-size session pool.
pub struct ShardEntry {
    pub address: String,
    sessions: Vec<Session>,
    selector: Selector,
}

impl ShardEntry {
    pub async fn dial(address: String) -> Result<Self> {
        let mut sessions = Vec::with_capacity(SESSIONS_PER_SHARD);
        for _ in 0..SESSIONS_PER_SHARD {
            sessions.push(Session::dial(&address).await?);
        }
        Ok(Self {
            address,
            sessions,
            selector: Selector::new(SESSIONS_PER_SHARD),
        })
    }

    pub async fn call(&self, scope: &Scope, request: CacheRequest) -> Result<CacheResponse> {
        let session = &self.sessions[self.selector.next()];
        session.call(scope, request).await
    }
}

/// Append-only, copy-on-write sequence of [`ShardEntry`]s (§3).
///
/// Readers load `count` then the snapshot; they never take a lock. Writers
/// (registrations) hold an external mutex (see
/// [`crate::client::internal::InternalCacheClient`]) that serializes
/// registrations against each other, but never against readers.
pub struct RoutingTable {
    snapshot: ArcSwap<Vec<Arc<ShardEntry>>>,
    count: AtomicUsize,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Vec::new()),
            count: AtomicUsize::new(0),
        }
    }

    /// Current shard count, per the release/acquire protocol in §4.3: a
    /// reader that observes `N = k+1` here is guaranteed the snapshot
    /// loaded afterwards contains at least `k+1` entries, because
    /// `publish` stores the snapshot before bumping this counter.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up the entry already known to own `address`, without going
    /// through the shard-count-indexed path (used to dedupe registrations).
    pub fn find_by_address(&self, address: &str) -> Option<Arc<ShardEntry>> {
        self.snapshot
            .load()
            .iter()
            .find(|entry| entry.address == address)
            .cloned()
    }

    /// `shard(key) = fnv32a(key) mod N`. Returns `None` before any shard has
    /// registered.
    pub fn route(&self, key: &str) -> Option<Arc<ShardEntry>> {
        let n = self.len();
        if n == 0 {
            return None;
        }
        let idx = (crate::hash::fnv1a32(key) as usize) % n;
        self.snapshot.load().get(idx).cloned()
    }

    /// Publishes a new entry: copy-on-write the snapshot to length `N+1`,
    /// publish it, then bump `N`. Callers must already hold the
    /// registration mutex and must have already deduped by address.
    pub fn publish(&self, entry: Arc<ShardEntry>) {
        let mut next: Vec<Arc<ShardEntry>> = (**self.snapshot.load()).clone();
        next.push(entry);
        self.snapshot.store(Arc::new(next));
        self.count.fetch_add(1, Ordering::Release);
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}

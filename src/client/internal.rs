//! [`InternalCacheClient`]: the in-tree sharded cache client, and
//! [`RegistrationListener`], the inbound RPC endpoint that lets cache
//! servers push themselves into its routing table (§4.3).

use crate::client::routing::{RoutingTable, ShardEntry};
use crate::client::{CacheClient, CacheItem, CacheLookup};
use crate::error::{FabricError, Result};
use crate::protocol::framing::{read_message, write_message};
use crate::protocol::messages::{CacheRequest, CacheResponse, RegisterRequest, RegisterResponse};
use crate::scope::Scope;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;

pub struct InternalCacheClient {
    table: RoutingTable,
    /// Serializes registrations against each other. Readers (`get`/`set`/
    /// `delete`) never take this.
    registration_lock: AsyncMutex<()>,
}

impl InternalCacheClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: RoutingTable::new(),
            registration_lock: AsyncMutex::new(()),
        })
    }

    pub fn shard_count(&self) -> usize {
        self.table.len()
    }

    /// Handles an inbound `RegisterCache(addr)`. Idempotent: re-registering
    /// an address already in the table is a no-op (DESIGN.md's fix for the
    /// non-idempotent-reconnect open question), rather than appending a
    /// second entry that would rehash the keyspace.
    pub async fn register(&self, addr: String) -> Result<()> {
        let _guard = self.registration_lock.lock().await;
        if self.table.find_by_address(&addr).is_some() {
            tracing::info!(%addr, "cache already registered, ignoring duplicate");
            return Ok(());
        }
        tracing::info!(%addr, "registering new cache server");
        let entry = ShardEntry::dial(addr.clone()).await?;
        self.table.publish(Arc::new(entry));
        tracing::info!(%addr, shards = self.table.len(), "done registering new cache server");
        Ok(())
    }
}

#[async_trait]
impl CacheClient for InternalCacheClient {
    async fn get(&self, scope: &Scope, key: &str) -> Result<CacheLookup> {
        let entry = self.table.route(key).ok_or(FabricError::NoCachesRegistered)?;
        match entry.call(scope, CacheRequest::Get { key: key.to_string() }).await? {
            CacheResponse::Get { value, ok } => {
                if ok {
                    Ok(CacheLookup::Hit(Bytes::from(value)))
                } else {
                    Ok(CacheLookup::Miss)
                }
            }
            _ => Err(FabricError::Transport("unexpected response to Get".to_string())),
        }
    }

    async fn set(&self, scope: &Scope, item: CacheItem) -> Result<()> {
        let entry = self.table.route(&item.key).ok_or(FabricError::NoCachesRegistered)?;
        let request = CacheRequest::Set {
            key: item.key,
            value: item.value.to_vec(),
        };
        match entry.call(scope, request).await? {
            CacheResponse::Set { ok: true } => Ok(()),
            CacheResponse::Set { ok: false } => Err(FabricError::ShardServerInternal),
            _ => Err(FabricError::Transport("unexpected response to Set".to_string())),
        }
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<()> {
        let entry = self.table.route(key).ok_or(FabricError::NoCachesRegistered)?;
        match entry.call(scope, CacheRequest::Delete { key: key.to_string() }).await? {
            CacheResponse::Delete { ok: true } => Ok(()),
            CacheResponse::Delete { ok: false } => Err(FabricError::ShardServerInternal),
            _ => Err(FabricError::Transport("unexpected response to Delete".to_string())),
        }
    }
}

/// The inbound registration RPC endpoint (§6): binds port 9999 and, for
/// each connection, reads one `RegisterRequest` and dispatches it to
/// [`InternalCacheClient::register`].
pub struct RegistrationListener {
    client: Arc<InternalCacheClient>,
}

impl RegistrationListener {
    pub fn new(client: Arc<InternalCacheClient>) -> Self {
        Self { client }
    }

    pub async fn run(&self, bind_addr: &str) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| FabricError::Config(format!("bind {bind_addr}: {e}")))?;
        tracing::info!(%bind_addr, "registration listener bound");

        loop {
            let (socket, peer_addr) = listener.accept().await?;
            let client = self.client.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_registration(socket, client).await {
                    tracing::warn!(%peer_addr, error = %e, "registration connection failed");
                }
            });
        }
    }
}

async fn handle_registration(mut socket: TcpStream, client: Arc<InternalCacheClient>) -> Result<()> {
    let request: RegisterRequest = read_message(&mut socket).await?;
    let ok = match client.register(request.addr.clone()).await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(addr = %request.addr, error = %e, "failed to register cache shard");
            false
        }
    };
    write_message(&mut socket, &RegisterResponse { ok }).await
}

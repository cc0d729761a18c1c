//! [`MemcachedClient`]: a thin pass-through to an external memcached,
//! selected by `CACHE_TYPE=memcached` (§6, §4.3.1). No client-side
//! sharding — routing is the memcached deployment's job in this mode.
//!
//! Speaks the memcached ASCII protocol directly over one pooled connection,
//! grounded in the same request/response-over-a-socket shape as
//! `InternalCacheClient`'s sessions, since the source's own `CacheClnt.Get`
//! returns a `memcache.Item` from the `bradfitz/gomemcache` client this
//! mirrors at the wire level.

use crate::client::{CacheClient, CacheItem, CacheLookup};
use crate::error::{FabricError, Result};
use crate::scope::Scope;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

pub struct MemcachedClient {
    addr: String,
    conn: Mutex<Option<BufReader<TcpStream>>>,
}

impl MemcachedClient {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            conn: Mutex::new(None),
        }
    }

    async fn ensure_connected<'a>(
        &self,
        guard: &'a mut Option<BufReader<TcpStream>>,
    ) -> Result<&'a mut BufReader<TcpStream>> {
        if guard.is_none() {
            let stream = TcpStream::connect(&self.addr)
                .await
                .map_err(|e| FabricError::Transport(format!("dial memcached {}: {e}", self.addr)))?;
            *guard = Some(BufReader::new(stream));
        }
        Ok(guard.as_mut().unwrap())
    }

    async fn read_line(reader: &mut BufReader<TcpStream>) -> Result<String> {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
impl CacheClient for MemcachedClient {
    async fn get(&self, scope: &Scope, key: &str) -> Result<CacheLookup> {
        let mut guard = self.conn.lock().await;
        let result: Result<CacheLookup> = tokio::time::timeout(scope.remaining(), async {
            let conn = self.ensure_connected(&mut guard).await?;
            conn.get_mut().write_all(format!("get {key}\r\n").as_bytes()).await?;
            conn.get_mut().flush().await?;

            let header = Self::read_line(conn).await?;
            if header == "END" {
                return Ok(CacheLookup::Miss);
            }
            let mut parts = header.split_ascii_whitespace();
            let _value_tag = parts.next();
            let _key = parts.next();
            let _flags = parts.next();
            let len: usize = parts
                .next()
                .ok_or_else(|| FabricError::Transport("malformed memcached VALUE line".to_string()))?
                .parse()
                .map_err(|_| FabricError::Transport("malformed memcached length".to_string()))?;

            let mut data = vec![0u8; len + 2]; // payload + trailing CRLF
            tokio::io::AsyncReadExt::read_exact(conn, &mut data).await?;
            data.truncate(len);

            let _end = Self::read_line(conn).await?; // consumes "END"
            Ok(CacheLookup::Hit(Bytes::from(data)))
        })
        .await
        .unwrap_or(Err(FabricError::Transport("deadline".to_string())));
        if result.is_err() {
            *guard = None; // force a fresh connection next call
        }
        result
    }

    async fn set(&self, scope: &Scope, item: CacheItem) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let result: Result<()> = tokio::time::timeout(scope.remaining(), async {
            let conn = self.ensure_connected(&mut guard).await?;
            let header = format!("set {} 0 0 {}\r\n", item.key, item.value.len());
            conn.get_mut().write_all(header.as_bytes()).await?;
            conn.get_mut().write_all(&item.value).await?;
            conn.get_mut().write_all(b"\r\n").await?;
            conn.get_mut().flush().await?;

            let reply = Self::read_line(conn).await?;
            if reply == "STORED" {
                Ok(())
            } else {
                Err(FabricError::ShardServerInternal)
            }
        })
        .await
        .unwrap_or(Err(FabricError::Transport("deadline".to_string())));
        if result.is_err() {
            *guard = None;
        }
        result
    }

    async fn delete(&self, scope: &Scope, key: &str) -> Result<()> {
        let mut guard = self.conn.lock().await;
        let result: Result<()> = tokio::time::timeout(scope.remaining(), async {
            let conn = self.ensure_connected(&mut guard).await?;
            conn.get_mut().write_all(format!("delete {key}\r\n").as_bytes()).await?;
            conn.get_mut().flush().await?;
            let reply = Self::read_line(conn).await?;
            if reply == "DELETED" || reply == "NOT_FOUND" {
                Ok(())
            } else {
                Err(FabricError::ShardServerInternal)
            }
        })
        .await
        .unwrap_or(Err(FabricError::Transport("deadline".to_string())));
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

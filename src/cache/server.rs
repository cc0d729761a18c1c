//! Cache shard server (C2): serves Get/Set/Delete over a [`CacheShard`],
//! and pushes its own registration to every configured peer at startup.
//!
//! Grounded on `network/server.rs` (bind-then-accept-loop shape,
//! spawn-per-connection) and `cached/server.go`'s `registerWithServers`
//! (dial-retry-register loop, fatal on an explicit rejection).

use crate::cache::shard::CacheShard;
use crate::config::REGISTRATION_PORT;
use crate::error::{FabricError, Result};
use crate::protocol::framing::{read_message, write_message};
use crate::protocol::messages::{CacheRequest, CacheResponse, RegisterRequest, RegisterResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

pub struct CacheServer {
    shard: Arc<CacheShard>,
    /// Address this server advertises to peers when it registers, e.g.
    /// `10.0.0.4:11211`.
    advertise_addr: String,
}

impl CacheServer {
    pub fn new(advertise_addr: impl Into<String>) -> Self {
        Self {
            shard: Arc::new(CacheShard::new()),
            advertise_addr: advertise_addr.into(),
        }
    }

    /// Binds `bind_addr`, registers with every peer in `peer_services`
    /// (each reachable at `<peer>:9999`), then serves RPCs forever.
    ///
    /// Per §4.2: the listener is bound before registration so the port is
    /// reserved, but no connection is accepted until every peer has
    /// acknowledged registration.
    pub async fn run(&self, bind_addr: &str, peer_services: &[String]) -> Result<()> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| FabricError::Config(format!("bind {bind_addr}: {e}")))?;
        tracing::info!(%bind_addr, "cache server listening");

        self.register_with_peers(peer_services).await?;

        loop {
            let (socket, peer_addr) = listener.accept().await?;
            let shard = self.shard.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(socket, shard).await {
                    tracing::warn!(%peer_addr, error = %e, "cache connection ended");
                }
            });
        }
    }

    async fn register_with_peers(&self, peer_services: &[String]) -> Result<()> {
        for service in peer_services {
            let registration_addr = format!("{service}:{REGISTRATION_PORT}");
            loop {
                match TcpStream::connect(&registration_addr).await {
                    Ok(mut stream) => {
                        tracing::info!(%registration_addr, "connected to peer for registration");
                        let request = RegisterRequest {
                            addr: self.advertise_addr.clone(),
                        };
                        write_message(&mut stream, &request).await?;
                        let response: RegisterResponse = read_message(&mut stream).await?;
                        if !response.ok {
                            return Err(FabricError::RegistrationFailed {
                                peer: registration_addr,
                                reason: "peer rejected registration".to_string(),
                            });
                        }
                        tracing::info!(%registration_addr, "registered with peer");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(%registration_addr, error = %e, "peer unreachable, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }
        Ok(())
    }
}

async fn serve_connection(mut socket: TcpStream, shard: Arc<CacheShard>) -> Result<()> {
    loop {
        let request: CacheRequest = match read_message(&mut socket).await {
            Ok(req) => req,
            Err(FabricError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let response = match request {
            CacheRequest::Get { key } => {
                let (value, ok) = shard.get(&key);
                CacheResponse::Get { value, ok }
            }
            CacheRequest::Set { key, value } => CacheResponse::Set {
                ok: shard.set(&key, value),
            },
            CacheRequest::Delete { key } => CacheResponse::Delete {
                ok: shard.delete(&key),
            },
        };

        write_message(&mut socket, &response).await?;
    }
}

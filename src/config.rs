//! Layered configuration: a JSON file (§6's "string-to-string map"),
//! overlaid by environment variables, overlaid finally by struct defaults.
//! Grounded on the teacher's own `Config`/`Default` pair in `lib.rs`; this
//! expansion replaces the database-page/buffer-pool fields with the fabric's
//! own settings.

use crate::error::{FabricError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Fixed bin count per shard (§3, §4.1): a prime chosen to spread FNV-1a
/// residues.
pub const BIN_COUNT: u32 = 1009;

/// Sessions held open per shard by a client (§4.3).
pub const SESSIONS_PER_SHARD: usize = 10;

/// Well-known port every application service listens on for inbound
/// `RegisterCache` (§6).
pub const REGISTRATION_PORT: u16 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheType {
    Cached,
    Memcached,
}

impl Default for CacheType {
    fn default() -> Self {
        CacheType::Cached
    }
}

/// The core's view of the deployment config: the `<Service>Port` and cache
/// ports the fabric consumes, plus the raw map so an embedder can read
/// collaborator-only keys (`consulAddress`, `jaegerAddress`, `MongoAddress`,
/// ...) without the core needing to model them.
#[derive(Debug, Clone)]
pub struct Config {
    pub service_port: u16,
    pub cached_port: u16,
    pub pod_ip_addr: String,
    pub cache_type: CacheType,
    pub nogc: bool,
    pub cache_peers: Vec<String>,
    pub raw: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_port: 8080,
            cached_port: 11211,
            pod_ip_addr: "127.0.0.1".to_string(),
            cache_type: CacheType::Cached,
            nogc: false,
            cache_peers: Vec::new(),
            raw: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads the JSON config map from `path`, then overlays `POD_IP_ADDR`,
    /// `CACHE_TYPE`, and `NOGC` from the environment, in that precedence
    /// order (env overrides file, file overrides default).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: HashMap<String, String> = serde_json::from_str(&contents)?;
        Ok(Self::from_map(raw).overlay_env())
    }

    pub fn from_map(raw: HashMap<String, String>) -> Self {
        let mut config = Self {
            raw: raw.clone(),
            ..Self::default()
        };
        if let Some(port) = raw.get("ServicePort").and_then(|v| v.parse().ok()) {
            config.service_port = port;
        }
        if let Some(port) = raw.get("CachedPort").and_then(|v| v.parse().ok()) {
            config.cached_port = port;
        }
        if let Some(peers) = raw.get("CachePeers") {
            config.cache_peers = peers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        config
    }

    fn overlay_env(mut self) -> Self {
        if let Ok(addr) = std::env::var("POD_IP_ADDR") {
            self.pod_ip_addr = addr;
        }
        if let Ok(cache_type) = std::env::var("CACHE_TYPE") {
            self.cache_type = match cache_type.as_str() {
                "memcached" => CacheType::Memcached,
                _ => CacheType::Cached,
            };
        }
        if let Ok(nogc) = std::env::var("NOGC") {
            self.nogc = nogc.eq_ignore_ascii_case("true");
        }
        self
    }

    /// The `host:port` this process should advertise when it registers
    /// with a peer, per §4.2 step 3.
    pub fn advertise_addr(&self, port: u16) -> String {
        format!("{}:{}", self.pod_ip_addr, port)
    }
}

/// Validates startup-time config invariants; a failure here is a `CONFIG`
/// error per §7, fatal at process start.
pub fn require_port(name: &str, port: u16) -> Result<u16> {
    if port == 0 {
        return Err(FabricError::Config(format!("{name} must be set")));
    }
    Ok(port)
}

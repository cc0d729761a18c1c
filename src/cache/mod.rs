//! The shard side of the fabric: bins (C1), the shard itself, and the RPC
//! server that exposes it and pushes registration to application services.

pub mod bin;
pub mod server;
pub mod shard;

pub use server::CacheServer;
pub use shard::CacheShard;

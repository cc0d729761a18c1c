use serde::{Deserialize, Serialize};

/// Largest value the wire framing accepts before refusing to decode, a guard
/// against an unbounded length prefix rather than a product requirement.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum CacheRequest {
    Get { key: String },
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub enum CacheResponse {
    Get { value: Vec<u8>, ok: bool },
    Set { ok: bool },
    Delete { ok: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct RegisterRequest {
    pub addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct RegisterResponse {
    pub ok: bool,
}

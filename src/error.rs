use thiserror::Error;

/// The six error kinds the fabric emits or propagates. `MISS` is deliberately
/// not a variant here: a miss is a normal return, not an error.
#[derive(Error, Debug)]
pub enum FabricError {
    #[error("no cache shards registered yet")]
    NoCachesRegistered,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("shard server returned ok=false")]
    ShardServerInternal,

    #[error("config error: {0}")]
    Config(String),

    #[error("registration failed with peer {peer}: {reason}")]
    RegistrationFailed { peer: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FabricError>;

impl From<bincode::error::EncodeError> for FabricError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FabricError::Transport(format!("encode: {e}"))
    }
}

impl From<bincode::error::DecodeError> for FabricError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FabricError::Transport(format!("decode: {e}"))
    }
}

impl From<serde_json::Error> for FabricError {
    fn from(e: serde_json::Error) -> Self {
        FabricError::Config(format!("json: {e}"))
    }
}

impl From<tokio::time::error::Elapsed> for FabricError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        FabricError::Transport("deadline".to_string())
    }
}

//! Length-prefixed bincode framing shared by the cache RPC and the
//! cache-registration RPC (§6: "wire framing is the same ... so a single
//! framing module serves both").
//!
//! Each frame is a big-endian `u32` byte length followed by that many bytes
//! of `bincode::config::standard()`-encoded payload.

use crate::error::{FabricError, Result};
use crate::protocol::messages::MAX_FRAME_SIZE;
use bincode::{Decode, Encode};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub async fn write_message<T, W>(writer: &mut W, message: &T) -> Result<()>
where
    T: Encode,
    W: AsyncWrite + Unpin,
{
    let payload = bincode::encode_to_vec(message, bincode::config::standard())?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(FabricError::Transport(format!(
            "encoded frame too large: {} bytes (max {})",
            payload.len(),
            MAX_FRAME_SIZE
        )));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_message<T, R>(reader: &mut R) -> Result<T>
where
    T: Decode<()>,
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FabricError::Transport(format!(
            "incoming frame too large: {} bytes (max {})",
            len, MAX_FRAME_SIZE
        )));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let (message, _) = bincode::decode_from_slice(&buf, bincode::config::standard())?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{CacheRequest, CacheResponse};

    #[tokio::test]
    async fn round_trips_a_request_over_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let req = CacheRequest::Set {
            key: "post_42".to_string(),
            value: b"hi".to_vec(),
        };
        write_message(&mut client, &req).await.unwrap();
        let decoded: CacheRequest = read_message(&mut server).await.unwrap();
        match decoded {
            CacheRequest::Set { key, value } => {
                assert_eq!(key, "post_42");
                assert_eq!(value, b"hi");
            }
            _ => panic!("wrong variant"),
        }

        let resp = CacheResponse::Set { ok: true };
        write_message(&mut server, &resp).await.unwrap();
        let decoded: CacheResponse = read_message(&mut client).await.unwrap();
        matches!(decoded, CacheResponse::Set { ok: true });
    }

    #[tokio::test]
    async fn rejects_an_oversized_length_prefix() {
        let (mut client, mut server) = tokio::io::duplex(16);
        client.write_u32(MAX_FRAME_SIZE as u32 + 1).await.unwrap();
        let result: Result<CacheRequest> = read_message(&mut server).await;
        assert!(matches!(result, Err(FabricError::Transport(_))));
    }
}

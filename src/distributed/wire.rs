//! Newline-delimited JSON framing for transports the embedder owns.
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::FleetError;

use super::SampleBatch;

pub const MAX_BATCH_BYTES: usize = 4 * 1024 * 1024;

/// Reads one framed sample batch.
///
/// # Errors
///
/// Returns a [`FleetError`] for I/O faults, a closed connection, an oversized
/// frame, or a malformed payload.
pub async fn read_batch<R>(reader: &mut BufReader<R>) -> Result<SampleBatch, FleetError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut buffer: Vec<u8> = Vec::with_capacity(1024);
    let bytes = reader
        .read_until(b'\n', &mut buffer)
        .await
        .map_err(|err| FleetError::Io {
            context: "read sample batch",
            source: err,
        })?;
    if bytes == 0 {
        return Err(FleetError::ConnectionClosed);
    }
    if buffer.len() > MAX_BATCH_BYTES {
        return Err(FleetError::BatchTooLarge {
            max_bytes: MAX_BATCH_BYTES,
        });
    }
    if buffer.ends_with(b"\n") {
        buffer.pop();
        if buffer.ends_with(b"\r") {
            buffer.pop();
        }
    }
    let line = std::str::from_utf8(&buffer).map_err(|err| FleetError::InvalidUtf8 { source: err })?;
    serde_json::from_str::<SampleBatch>(line).map_err(|err| FleetError::Deserialize {
        context: "sample batch",
        source: err,
    })
}

/// Writes one framed sample batch.
///
/// # Errors
///
/// Returns a [`FleetError`] when serialization or the write fails.
pub async fn send_batch<W>(writer: &mut W, batch: &SampleBatch) -> Result<(), FleetError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut payload = serde_json::to_string(batch).map_err(|err| FleetError::Serialize {
        context: "sample batch",
        source: err,
    })?;
    payload.push('\n');
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|err| FleetError::Io {
            context: "send sample batch",
            source: err,
        })
}

//! Length-prefixed frame I/O: `4-byte big-endian length || payload`, where
//! `payload` is a single tag byte followed by the CBOR encoding of that
//! tag's payload type.
//!
//! A CBOR array already carries its own element count, so encoding a batch
//! payload (`SketchBatchPayload`, `BucketBatchPayload`, `MatchListPayload`)
//! folds the `varint(count) || count × item` shape into the container
//! itself rather than hand-rolling a separate length prefix per item.

use pprl_types::message::FrameTag;
use pprl_types::PprlError;
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected as a protocol violation, on either
/// the read or write side.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Serializes `payload` with `tag` and writes the length-prefixed frame.
pub async fn write_frame<W, P>(stream: &mut W, tag: FrameTag, payload: &P) -> Result<(), PprlError>
where
    W: AsyncWrite + Unpin,
    P: Serialize,
{
    let mut body = vec![tag.to_byte()];
    ciborium::into_writer(payload, &mut body)
        .map_err(|err| PprlError::io_failed(format!("failed to encode frame body: {err}")))?;

    if body.len() > MAX_FRAME_BYTES {
        return Err(PprlError::protocol_violation(format!(
            "outgoing frame of {} bytes exceeds the {}-byte limit",
            body.len(),
            MAX_FRAME_BYTES
        )));
    }

    let len = u32::try_from(body.len())
        .map_err(|_| PprlError::protocol_violation("frame body too large to prefix"))?;
    stream
        .write_all(&len.to_be_bytes())
        .await
        .map_err(|err| PprlError::io_failed(err.to_string()))?;
    stream
        .write_all(&body)
        .await
        .map_err(|err| PprlError::io_failed(err.to_string()))?;
    stream
        .flush()
        .await
        .map_err(|err| PprlError::io_failed(err.to_string()))
}

/// Reads one length-prefixed frame and returns its tag and raw CBOR body
/// (not including the tag byte), for the caller to deserialize with
/// [`decode_payload`].
pub async fn read_frame<R>(stream: &mut R) -> Result<(FrameTag, Vec<u8>), PprlError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|err| PprlError::io_failed(err.to_string()))?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(PprlError::protocol_violation(format!(
            "incoming frame of {len} bytes exceeds the {MAX_FRAME_BYTES}-byte limit"
        )));
    }
    if len == 0 {
        return Err(PprlError::protocol_violation("empty frame has no tag byte"));
    }

    let mut body = vec![0u8; len];
    stream
        .read_exact(&mut body)
        .await
        .map_err(|err| PprlError::io_failed(err.to_string()))?;

    let tag = FrameTag::try_from(body[0])?;
    Ok((tag, body[1..].to_vec()))
}

/// Decodes a frame body (as returned by [`read_frame`]) into a specific
/// payload type.
pub fn decode_payload<P: DeserializeOwned>(body: &[u8]) -> Result<P, PprlError> {
    ciborium::from_reader(body)
        .map_err(|err| PprlError::protocol_violation(format!("malformed frame payload: {err}")))
}

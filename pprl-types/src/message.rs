//! Wire payload shapes exchanged over the framed protocol stream.
//!
//! These are pure data definitions; the byte-level framing (length prefix,
//! tag byte, varint batch counts, ciborium encoding) lives in
//! `pprl-protocol::framing`, which is the only place that touches an
//! `AsyncRead`/`AsyncWrite`.

use pprl_core::blocker::Bucket;
use serde::{Deserialize, Serialize};

use crate::error::PprlError;
use crate::record::SketchRecord;

/// The single-byte tag prefixing every frame's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameTag {
    PubKey,
    SketchBatch,
    BucketBatch,
    MatchList,
    Shutdown,
    Error,
}

impl FrameTag {
    pub fn to_byte(self) -> u8 {
        match self {
            FrameTag::PubKey => 0x01,
            FrameTag::SketchBatch => 0x02,
            FrameTag::BucketBatch => 0x03,
            FrameTag::MatchList => 0x04,
            FrameTag::Shutdown => 0x7F,
            FrameTag::Error => 0xFE,
        }
    }
}

impl TryFrom<u8> for FrameTag {
    type Error = PprlError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(FrameTag::PubKey),
            0x02 => Ok(FrameTag::SketchBatch),
            0x03 => Ok(FrameTag::BucketBatch),
            0x04 => Ok(FrameTag::MatchList),
            0x7F => Ok(FrameTag::Shutdown),
            0xFE => Ok(FrameTag::Error),
            other => Err(PprlError::protocol_violation(format!(
                "unknown frame tag 0x{other:02X}"
            ))),
        }
    }
}

/// `0x01 PUBKEY`: the handshake's 32-byte X25519 public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyPayload {
    pub public_key: [u8; 32],
}

/// `0x02 SKETCH_BATCH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchBatchPayload {
    pub records: Vec<SketchRecord>,
}

/// One bucket in a `0x03 BUCKET_BATCH`, mirroring
/// [`pprl_core::blocker::Bucket`] with base64-string byte fields so it is
/// legible as JSON and identical in shape to the sketch codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketWire {
    pub bucket_id: String,
    pub points: Vec<String>,
    pub record_ids: Vec<String>,
}

impl BucketWire {
    pub fn from_bucket(bucket: &Bucket) -> Self {
        use base64::Engine as _;
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            bucket_id: engine.encode(bucket.bucket_id),
            points: bucket.points.iter().map(|p| engine.encode(p)).collect(),
            record_ids: bucket.record_ids.clone(),
        }
    }

    pub fn to_bucket(&self) -> Result<Bucket, PprlError> {
        use base64::Engine as _;
        let engine = base64::engine::general_purpose::STANDARD;
        let bucket_id = decode_point(&engine.decode(&self.bucket_id).map_err(|err| {
            PprlError::protocol_violation(format!("invalid bucket_id base64: {err}"))
        })?)?;
        let mut points = Vec::with_capacity(self.points.len());
        for p in &self.points {
            let bytes = engine
                .decode(p)
                .map_err(|err| PprlError::protocol_violation(format!("invalid point base64: {err}")))?;
            points.push(decode_point(&bytes)?);
        }
        if points.len() != self.record_ids.len() {
            return Err(PprlError::protocol_violation(format!(
                "bucket has {} points but {} record ids",
                points.len(),
                self.record_ids.len()
            )));
        }
        Ok(Bucket {
            bucket_id,
            points,
            record_ids: self.record_ids.clone(),
        })
    }
}

fn decode_point(bytes: &[u8]) -> Result<[u8; 32], PprlError> {
    <[u8; 32]>::try_from(bytes)
        .map_err(|_| PprlError::protocol_violation(format!("expected 32 bytes, got {}", bytes.len())))
}

/// `0x03 BUCKET_BATCH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketBatchPayload {
    pub buckets: Vec<BucketWire>,
}

/// One entry of a `0x04 MATCH_LIST`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEntry {
    pub local_id: String,
    pub peer_id: String,
}

/// `0x04 MATCH_LIST`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchListPayload {
    pub matches: Vec<MatchEntry>,
}

/// `0x7F SHUTDOWN`: carries no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownPayload;

/// `0xFE ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
    pub phase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[test]
    fn frame_tag_byte_roundtrips() {
        for tag in [
            FrameTag::PubKey,
            FrameTag::SketchBatch,
            FrameTag::BucketBatch,
            FrameTag::MatchList,
            FrameTag::Shutdown,
            FrameTag::Error,
        ] {
            assert_eq!(FrameTag::try_from(tag.to_byte()).unwrap(), tag);
        }
    }

    #[test]
    fn unknown_tag_byte_is_a_protocol_violation() {
        assert!(matches!(
            FrameTag::try_from(0x99),
            Err(PprlError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn bucket_wire_roundtrips() {
        let bucket = Bucket {
            bucket_id: [9u8; 32],
            points: vec![[9u8; 32], [9u8; 32]],
            record_ids: vec!["r1".to_owned(), "r2".to_owned()],
        };
        let wire = BucketWire::from_bucket(&bucket);
        let decoded = wire.to_bucket().unwrap();
        assert_eq!(decoded, bucket);
    }

    #[test]
    fn bucket_wire_rejects_mismatched_lengths() {
        let wire = BucketWire {
            bucket_id: base64::engine::general_purpose::STANDARD.encode([1u8; 32]),
            points: vec![base64::engine::general_purpose::STANDARD.encode([1u8; 32])],
            record_ids: vec!["a".to_owned(), "b".to_owned()],
        };
        assert!(wire.to_bucket().is_err());
    }
}

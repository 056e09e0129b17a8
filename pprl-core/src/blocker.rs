//! Commutative-encryption blocking: turns MinHash signatures into a small
//! number of candidate pairs without either party learning anything about
//! the other's non-matching records.
//!
//! Each signature is split into contiguous bands; a band's slots hash to a
//! single blocking key, which is hashed onto the curve and encrypted with
//! the local party's [`CommutativeKey`]. Because curve scalar
//! multiplication commutes, once both parties have applied their key to
//! both sides' points (in either order), equal blocking keys produce byte
//! identical doubly-encrypted points, while non-matching bands produce
//! effectively random, non-colliding points. This is what lets the
//! intersection be computed locally once both parties hold a
//! doubly-encrypted set, without a further network round trip.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::curve::{decode_point, encode_point, hash_to_point, CommutativeKey};
use crate::error::CoreError;
use crate::sketch::Sketch;

const BUCKET_KEY_DOMAIN: &[u8] = b"PPRL_BLOCK_KEY";

/// LSH banding parameters: a signature of length `s` is split into
/// `s / rows_per_band` contiguous bands (the remainder, if any, is
/// dropped, matching how both parties must agree on `s` up front).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LshParams {
    pub rows_per_band: u32,
}

impl Default for LshParams {
    fn default() -> Self {
        Self { rows_per_band: 4 }
    }
}

/// One record's contribution to one LSH band: its blocking key encrypted
/// once with a commutative key.
///
/// `record_id` travels with the point through both re-encryption passes so
/// the originating party can recover which of its records a surviving
/// candidate pair refers to; it never reveals anything about the other
/// party's records because only that party ever attaches its own ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlock {
    pub record_id: String,
    pub band_index: u32,
    pub point: [u8; 32],
}

/// A candidate pair surfaced by blocking: a local and peer record id whose
/// blocking keys collided in at least one band.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    pub local_id: String,
    pub peer_id: String,
}

/// The wire-level grouping of [`EncryptedBlock`]s that share an encrypted
/// point: a bucket identifier plus the parallel `(point, record_id)` lists
/// routed to it.
///
/// `points` is redundant with `bucket_id` (every point in a bucket equals
/// the id it was grouped under) but kept alongside `record_ids` to match
/// the wire shape both parties exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub bucket_id: [u8; 32],
    pub points: Vec<[u8; 32]>,
    pub record_ids: Vec<String>,
}

/// Groups flat blocks into buckets keyed by their encrypted point.
pub fn into_buckets(blocks: Vec<EncryptedBlock>) -> Vec<Bucket> {
    let mut grouped: std::collections::BTreeMap<[u8; 32], (Vec<[u8; 32]>, Vec<String>)> =
        std::collections::BTreeMap::new();
    for block in blocks {
        let entry = grouped.entry(block.point).or_default();
        entry.0.push(block.point);
        entry.1.push(block.record_id);
    }
    grouped
        .into_iter()
        .map(|(bucket_id, (points, record_ids))| Bucket {
            bucket_id,
            points,
            record_ids,
        })
        .collect()
}

/// Flattens buckets back into blocks, e.g. after receiving a peer's bucket
/// batch and before re-encrypting each point. The resulting blocks' band
/// index is always zero: band information is not needed once blocks are
/// grouped, since it is already folded into the point itself.
pub fn from_buckets(buckets: &[Bucket]) -> Vec<EncryptedBlock> {
    let mut blocks = Vec::new();
    for bucket in buckets {
        for (point, record_id) in bucket.points.iter().zip(bucket.record_ids.iter()) {
            blocks.push(EncryptedBlock {
                record_id: record_id.clone(),
                band_index: 0,
                point: *point,
            });
        }
    }
    blocks
}

/// Computes the blocking key for one band: `"block_" + hex(SHA256(band
/// index LE || band slot values LE)[..16])`.
fn band_blocking_key(band_index: u32, band_slots: &[u32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(BUCKET_KEY_DOMAIN);
    hasher.update(band_index.to_le_bytes());
    for slot in band_slots {
        hasher.update(slot.to_le_bytes());
    }
    let digest = hasher.finalize();
    format!("block_{}", hex::encode(&digest[..16]))
}

/// Splits a MinHash signature's slots into contiguous bands of
/// `params.rows_per_band` slots each, dropping any short trailing remainder.
fn bands(slots: &[u32], params: LshParams) -> impl Iterator<Item = (u32, &[u32])> {
    slots
        .chunks_exact(params.rows_per_band as usize)
        .enumerate()
        .map(|(idx, chunk)| (idx as u32, chunk))
}

/// Builds the once-encrypted blocks to send to the peer: one per
/// `(record, band)` pair.
pub fn build_local_blocks(
    sketches: &[Sketch],
    params: LshParams,
    key: &CommutativeKey,
) -> Vec<EncryptedBlock> {
    let mut blocks = Vec::new();
    for sketch in sketches {
        for (band_index, band_slots) in bands(sketch.minhash.slots(), params) {
            let blocking_key = band_blocking_key(band_index, band_slots);
            let point = key.encrypt(hash_to_point(blocking_key.as_bytes()));
            blocks.push(EncryptedBlock {
                record_id: sketch.id.clone(),
                band_index,
                point: encode_point(&point),
            });
        }
    }
    blocks
}

/// Applies the local key to blocks received from the peer, turning
/// once-encrypted points into doubly-encrypted ones, ready to compare
/// against the other side's doubly-encrypted set.
///
/// # Errors
/// Returns [`CoreError::InvalidEncoding`] if any block carries a point
/// that does not decode to a valid curve point.
pub fn reencrypt(
    key: &CommutativeKey,
    blocks: &[EncryptedBlock],
) -> Result<Vec<EncryptedBlock>, CoreError> {
    blocks
        .iter()
        .map(|block| {
            let point = decode_point(&block.point)?;
            let reencrypted = key.encrypt(point);
            Ok(EncryptedBlock {
                record_id: block.record_id.clone(),
                band_index: block.band_index,
                point: encode_point(&reencrypted),
            })
        })
        .collect()
}

/// Intersects two doubly-encrypted block sets and returns the deduplicated
/// set of candidate pairs whose blocking keys collided in at least one
/// band.
///
/// `own` must be the local records' blocks after the peer has applied
/// their key (received back over the wire); `peer` must be the peer's
/// blocks after this party has applied its own key locally via
/// [`reencrypt`]. Both are then directly comparable because curve scalar
/// multiplication commutes.
pub fn intersect(own: &[EncryptedBlock], peer: &[EncryptedBlock]) -> Vec<CandidatePair> {
    let mut index: HashMap<[u8; 32], Vec<&str>> = HashMap::new();
    for block in own {
        index
            .entry(block.point)
            .or_default()
            .push(block.record_id.as_str());
    }

    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    for block in peer {
        let Some(local_ids) = index.get(&block.point) else {
            continue;
        };
        for &local_id in local_ids {
            let pair = CandidatePair {
                local_id: local_id.to_owned(),
                peer_id: block.record_id.clone(),
            };
            if seen.insert(pair.clone()) {
                pairs.push(pair);
            }
        }
    }
    pairs
}

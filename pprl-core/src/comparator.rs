//! Fuzzy scoring of a candidate pair's sketches, and the deterministic 1:1
//! resolution of the resulting match graph.

use std::collections::{HashMap, HashSet};

use sha2::{Digest, Sha256};

use crate::error::CoreError;
use crate::sketch::Sketch;

/// Thresholds and weights used to turn a sketch pair's Hamming distance and
/// Jaccard similarity into a match decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparatorParams {
    /// A pair matches only if its Bloom filter Hamming distance is at most
    /// this value.
    pub hamming_threshold: u32,
    /// A pair matches only if its MinHash Jaccard similarity is at least
    /// this value.
    pub jaccard_threshold: f64,
    /// Weight given to the Hamming term in [`MatchScore::score`]. Used only
    /// to break ties; it plays no role in the match predicate itself.
    pub hamming_weight: f64,
    /// Weight given to the Jaccard term in [`MatchScore::score`].
    pub jaccard_weight: f64,
}

impl Default for ComparatorParams {
    fn default() -> Self {
        Self {
            hamming_threshold: 0,
            jaccard_threshold: 0.0,
            hamming_weight: 0.5,
            jaccard_weight: 0.5,
        }
    }
}

/// The Hamming/Jaccard measurements and resulting score for one candidate
/// pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub hamming: u32,
    pub jaccard: f64,
    pub is_match: bool,
    pub score: f64,
}

/// Scores a candidate pair's sketches against `params`.
///
/// # Errors
/// Returns [`CoreError::ParameterMismatch`] if the two sketches' Bloom or
/// MinHash parameters are not comparable.
pub fn compare(local: &Sketch, peer: &Sketch, params: ComparatorParams) -> Result<MatchScore, CoreError> {
    let hamming = local.bloom.hamming_distance(&peer.bloom)?;
    let jaccard = local.minhash.jaccard(&peer.minhash)?;
    let is_match = hamming <= params.hamming_threshold && jaccard >= params.jaccard_threshold;
    let m = local.bloom.m().max(1) as f64;
    let score = params.hamming_weight * (1.0 - hamming as f64 / m) + params.jaccard_weight * jaccard;
    Ok(MatchScore {
        hamming,
        jaccard,
        is_match,
        score,
    })
}

/// One edge of the match graph handed to [`resolve_one_to_one`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPair {
    pub local_id: String,
    pub peer_id: String,
    pub score: MatchScore,
}

/// Deterministic priority used to break ties among conflicted edges: the
/// first 8 bytes of `SHA-256(local_id || "|" || peer_id)`, read as a
/// big-endian `u64`.
fn tie_break_priority(local_id: &str, peer_id: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(local_id.as_bytes());
    hasher.update(b"|");
    hasher.update(peer_id.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().unwrap())
}

/// Resolves a match graph into a 1:1 assignment.
///
/// Edges whose `local_id` and `peer_id` each appear exactly once among
/// `pairs` are accepted unconditionally. Edges sharing an endpoint with
/// another edge are sorted by descending [`tie_break_priority`] and
/// greedily accepted as long as both endpoints remain free, so the result
/// is identical regardless of `pairs`' input order.
pub fn resolve_one_to_one(pairs: &[ScoredPair]) -> Vec<ScoredPair> {
    let mut local_counts: HashMap<&str, u32> = HashMap::new();
    let mut peer_counts: HashMap<&str, u32> = HashMap::new();
    for pair in pairs {
        *local_counts.entry(pair.local_id.as_str()).or_default() += 1;
        *peer_counts.entry(pair.peer_id.as_str()).or_default() += 1;
    }

    let mut accepted = Vec::new();
    let mut used_local = HashSet::new();
    let mut used_peer = HashSet::new();
    let mut conflicted = Vec::new();

    for pair in pairs {
        let unique = local_counts[pair.local_id.as_str()] == 1 && peer_counts[pair.peer_id.as_str()] == 1;
        if unique {
            used_local.insert(pair.local_id.clone());
            used_peer.insert(pair.peer_id.clone());
            accepted.push(pair.clone());
        } else {
            conflicted.push(pair.clone());
        }
    }

    conflicted.sort_by(|a, b| {
        let pa = tie_break_priority(&a.local_id, &a.peer_id);
        let pb = tie_break_priority(&b.local_id, &b.peer_id);
        pb.cmp(&pa)
    });

    for pair in conflicted {
        if used_local.contains(&pair.local_id) || used_peer.contains(&pair.peer_id) {
            continue;
        }
        used_local.insert(pair.local_id.clone());
        used_peer.insert(pair.peer_id.clone());
        accepted.push(pair);
    }

    accepted
}

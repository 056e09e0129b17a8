//! The sketch record's on-wire and on-disk shape: CSV header
//! `id,bloom_filter,minhash,timestamp`, or the JSON equivalent.
//!
//! This is deliberately a flat, string-based record distinct from
//! `pprl_core::sketch::Sketch` (which holds parsed [`BloomFilter`] and
//! [`MinHashSignature`] values): the wire type is what gets streamed to
//! disk or across the socket, the core type is what the comparator and
//! blocker operate on.

use chrono::{DateTime, Utc};
use pprl_core::bloom::BloomFilter;
use pprl_core::minhash::MinHashSignature;
use pprl_core::sketch::Sketch;
use serde::{Deserialize, Serialize};

use crate::error::PprlError;

/// A record in its wire/disk shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchRecord {
    pub id: String,
    pub bloom_filter: String,
    pub minhash: String,
    pub timestamp: DateTime<Utc>,
}

impl SketchRecord {
    /// Builds the wire record from a core [`Sketch`], stamping it with
    /// `timestamp`.
    pub fn from_sketch(sketch: &Sketch, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: sketch.id.clone(),
            bloom_filter: sketch.bloom.to_base64(),
            minhash: sketch.minhash.to_base64(),
            timestamp,
        }
    }

    /// Decodes the wire record's base64 payloads into a core [`Sketch`].
    ///
    /// # Errors
    /// Returns [`PprlError::SketchMismatch`] if either payload fails to
    /// decode.
    pub fn to_sketch(&self) -> Result<Sketch, PprlError> {
        let bloom = BloomFilter::from_base64(&self.bloom_filter)?;
        let minhash = MinHashSignature::from_base64(&self.minhash)?;
        Ok(Sketch {
            id: self.id.clone(),
            bloom,
            minhash,
        })
    }
}

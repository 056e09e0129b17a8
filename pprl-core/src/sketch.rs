//! A [`Sketch`] ties a record's identity to the privacy-preserving Bloom
//! and MinHash summaries built from its normalized, q-grammed fields.

use rand::SeedableRng;
use rayon::prelude::*;

use crate::bloom::BloomFilter;
use crate::error::CoreError;
use crate::minhash::{MinHashParams, MinHashSignature};

/// Bloom filter parameters: number of bits and hash functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomParams {
    pub m: u32,
    pub k: u32,
    /// Fraction of bits to flip at random after insertion, `0.0` to
    /// disable. See [`BloomFilter::new_with_noise`].
    pub noise_rate: f64,
}

/// A record's Bloom filter plus its derived MinHash signature, keyed by
/// the record's locally assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sketch {
    pub id: String,
    pub bloom: BloomFilter,
    pub minhash: MinHashSignature,
}

impl Sketch {
    /// Builds a filter from `qgrams`, adds noise if `bloom_params.noise_rate`
    /// is nonzero, then derives the MinHash signature from the resulting
    /// filter.
    pub fn build<R: rand::Rng>(
        id: impl Into<String>,
        qgrams: impl IntoIterator<Item = impl AsRef<[u8]>>,
        bloom_params: BloomParams,
        minhash_params: &MinHashParams,
        rng: &mut R,
    ) -> Self {
        let mut bloom = if bloom_params.noise_rate > 0.0 {
            BloomFilter::new_with_noise(bloom_params.m, bloom_params.k, bloom_params.noise_rate, rng)
        } else {
            BloomFilter::new(bloom_params.m, bloom_params.k)
        };
        for gram in qgrams {
            bloom.add(gram.as_ref());
        }
        let minhash = MinHashSignature::from_bloom(&bloom, minhash_params);
        Self {
            id: id.into(),
            bloom,
            minhash,
        }
    }

    /// Checks the two sketches' Bloom and MinHash parameters are
    /// comparable (not that their contents agree).
    pub fn check_compatible(&self, other: &Self) -> Result<(), CoreError> {
        self.bloom.hamming_distance(&other.bloom).map(|_| ())?;
        self.minhash.agreement(&other.minhash).map(|_| ())?;
        Ok(())
    }
}

/// Builds sketches for many records across Rayon's work-stealing pool.
///
/// Each record's sketch construction is independent CPU-bound work (q-gram
/// hashing, Bloom insertion, MinHash derivation), so this fans out over
/// `records` and combines the results deterministically: a parallel
/// indexed `collect` preserves input order regardless of which thread
/// finishes first, and each record gets its own RNG seeded from `seed` and
/// its index rather than sharing one across threads.
pub fn build_many(
    records: &[(String, Vec<String>)],
    bloom_params: BloomParams,
    minhash_params: &MinHashParams,
    seed: u64,
) -> Vec<Sketch> {
    records
        .par_iter()
        .enumerate()
        .map(|(idx, (id, qgrams))| {
            let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(seed.wrapping_add(idx as u64));
            Sketch::build(
                id.clone(),
                qgrams.iter().map(|g| g.as_bytes()),
                bloom_params,
                minhash_params,
                &mut rng,
            )
        })
        .collect()
}

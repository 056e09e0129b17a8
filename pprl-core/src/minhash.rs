//! MinHash signatures derived from a [`crate::bloom::BloomFilter`]'s set
//! bits.
//!
//! Rather than materializing `s` random permutations of `0..m` (expensive
//! for large `m`), each hash function is a universal hash
//! `(a * idx + b) mod PRIME` over the set bit indices; the signature slot
//! is the minimum value produced. Both parties must derive `MinHashParams`
//! from the same seed for the resulting signatures to be comparable.

use base64::Engine as _;

use crate::bloom::BloomFilter;
use crate::error::CoreError;

/// Mersenne prime 2^61 - 1, large enough that universal-hash collisions
/// across a `u32` bit-index domain are negligible.
const PRIME: u64 = (1u64 << 61) - 1;

/// Compile-time MinHash seed shared by every party.
///
/// Sketches are built before the handshake establishes a shared salt (see
/// `pprl-protocol`'s session driver), so there is nothing session-specific
/// to seed from yet; both parties hard-code this constant instead.
pub const SESSION_SEED: u64 = 0x9E3779B97F4A7C15;

/// The `s` independent `(a, b)` coefficient pairs used to build a
/// [`MinHashSignature`] from a [`BloomFilter`].
///
/// Deterministic given a seed: both parties derive their params the same
/// way so that signature slots line up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashParams {
    coefficients: Vec<(u64, u64)>,
}

impl MinHashParams {
    /// Derives `s` coefficient pairs from `seed`, one independently drawn
    /// pair per slot. Equivalent to [`Self::with_permutations`] with
    /// `permutations >= s`.
    pub fn from_seed(seed: u64, s: u32) -> Self {
        Self::with_permutations(seed, s, s)
    }

    /// Derives `s` coefficient pairs from at most `permutations`
    /// independently drawn base pairs.
    ///
    /// When `permutations >= s` every slot gets its own pair, same as
    /// [`Self::from_seed`]. When `permutations < s`, slots cycle through
    /// the `permutations` base pairs, perturbing each repeat with the same
    /// double-hashing trick [`crate::bloom::BloomFilter`] uses to derive
    /// many bit positions from two base hashes: slot `i` reuses base pair
    /// `i % permutations`, offsetting its `b` coefficient by a multiple of
    /// `i / permutations` so repeated slots still diverge.
    pub fn with_permutations(seed: u64, s: u32, permutations: u32) -> Self {
        let p = permutations.max(1).min(s.max(1));
        let mut state = seed;
        let mut base = Vec::with_capacity(p as usize);
        for _ in 0..p {
            let a = splitmix64(&mut state) % PRIME | 1;
            let b = splitmix64(&mut state) % PRIME;
            base.push((a, b));
        }
        let coefficients = (0..s)
            .map(|i| {
                let (a, b) = base[(i % p) as usize];
                let cycle = (i / p) as u64;
                (a, (b + cycle.wrapping_mul(a)) % PRIME)
            })
            .collect();
        Self { coefficients }
    }

    /// Number of signature slots, `s`.
    pub fn s(&self) -> u32 {
        self.coefficients.len() as u32
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// A MinHash signature: `s` per-hash-function minimum universal-hash
/// values over a Bloom filter's set bit indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHashSignature {
    slots: Vec<u32>,
}

impl MinHashSignature {
    /// Builds a signature from `bloom`'s set bits using `params`.
    ///
    /// A slot for which `bloom` has no set bits (an all-zero filter) is
    /// given the sentinel value `u32::MAX`.
    pub fn from_bloom(bloom: &BloomFilter, params: &MinHashParams) -> Self {
        let indices: Vec<u32> = bloom.set_bit_indices().collect();
        let slots = params
            .coefficients
            .iter()
            .map(|&(a, b)| {
                indices
                    .iter()
                    .map(|&idx| universal_hash(idx, a, b))
                    .min()
                    .map(|v| (v % u32::MAX as u64) as u32)
                    .unwrap_or(u32::MAX)
            })
            .collect();
        Self { slots }
    }

    /// Number of slots, `s`.
    pub fn s(&self) -> u32 {
        self.slots.len() as u32
    }

    /// The raw per-slot minimum values.
    pub fn slots(&self) -> &[u32] {
        &self.slots
    }

    /// The count of slots at which the two signatures agree.
    ///
    /// # Errors
    /// Returns [`CoreError::ParameterMismatch`] if the signatures have
    /// different lengths.
    pub fn agreement(&self, other: &Self) -> Result<usize, CoreError> {
        self.check_compatible(other)?;
        Ok(self
            .slots
            .iter()
            .zip(other.slots.iter())
            .filter(|(a, b)| a == b)
            .count())
    }

    /// The estimated Jaccard similarity, `agreement / s`.
    pub fn jaccard(&self, other: &Self) -> Result<f64, CoreError> {
        let agree = self.agreement(other)?;
        Ok(agree as f64 / self.s() as f64)
    }

    fn check_compatible(&self, other: &Self) -> Result<(), CoreError> {
        if self.slots.len() != other.slots.len() {
            return Err(CoreError::ParameterMismatch(format!(
                "minhash signatures have different lengths: {} vs {}",
                self.slots.len(),
                other.slots.len()
            )));
        }
        Ok(())
    }

    /// Serializes to little-endian `u32` words.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.slots.len() * 4);
        for slot in &self.slots {
            buf.extend_from_slice(&slot.to_le_bytes());
        }
        buf
    }

    /// Deserializes from [`Self::to_bytes`]'s output.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() % 4 != 0 {
            return Err(CoreError::MalformedLayout(format!(
                "minhash signature byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let slots = bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes(chunk.try_into().unwrap()))
            .collect();
        Ok(Self { slots })
    }

    /// Base64-encodes [`Self::to_bytes`].
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    /// Decodes a signature from [`Self::to_base64`]'s output.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|err| CoreError::InvalidBase64(err.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

fn universal_hash(idx: u32, a: u64, b: u64) -> u64 {
    (a.wrapping_mul(idx as u64).wrapping_add(b)) % PRIME
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_from(items: &[&str]) -> BloomFilter {
        let mut bloom = BloomFilter::new(2048, 6);
        for item in items {
            bloom.add(item.as_bytes());
        }
        bloom
    }

    #[test]
    fn same_seed_and_input_produces_identical_signatures() {
        let params = MinHashParams::from_seed(42, 64);
        let a = filter_from(&["jo", "oh", "hn"]);
        let b = filter_from(&["jo", "oh", "hn"]);
        let sig_a = MinHashSignature::from_bloom(&a, &params);
        let sig_b = MinHashSignature::from_bloom(&b, &params);
        assert_eq!(sig_a, sig_b);
    }

    #[test]
    fn similar_sets_agree_on_most_slots() {
        let params = MinHashParams::from_seed(7, 128);
        let a = filter_from(&["jo", "oh", "hn", "n_", "_j"]);
        let b = filter_from(&["jo", "oh", "hn", "n_", "_k"]);
        let sig_a = MinHashSignature::from_bloom(&a, &params);
        let sig_b = MinHashSignature::from_bloom(&b, &params);
        let jaccard = sig_a.jaccard(&sig_b).unwrap();
        assert!(jaccard > 0.5, "expected high similarity, got {jaccard}");
    }

    #[test]
    fn disjoint_sets_agree_rarely() {
        let params = MinHashParams::from_seed(7, 256);
        let a = filter_from(&["aa", "bb", "cc"]);
        let b = filter_from(&["xx", "yy", "zz"]);
        let sig_a = MinHashSignature::from_bloom(&a, &params);
        let sig_b = MinHashSignature::from_bloom(&b, &params);
        let jaccard = sig_a.jaccard(&sig_b).unwrap();
        assert!(jaccard < 0.3, "expected low similarity, got {jaccard}");
    }

    #[test]
    fn fewer_permutations_than_slots_still_derives_s_slots_deterministically() {
        let a = MinHashParams::with_permutations(42, 64, 8);
        let b = MinHashParams::with_permutations(42, 64, 8);
        assert_eq!(a.s(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn permutations_at_or_above_s_matches_from_seed() {
        let wide = MinHashParams::with_permutations(42, 64, 1000);
        let plain = MinHashParams::from_seed(42, 64);
        assert_eq!(wide, plain);
    }

    #[test]
    fn agreement_rejects_mismatched_lengths() {
        let a = MinHashSignature::from_bloom(&filter_from(&["a"]), &MinHashParams::from_seed(1, 16));
        let b = MinHashSignature::from_bloom(&filter_from(&["a"]), &MinHashParams::from_seed(1, 32));
        assert!(a.agreement(&b).is_err());
    }

    #[test]
    fn roundtrip_base64_is_byte_exact() {
        let params = MinHashParams::from_seed(99, 32);
        let sig = MinHashSignature::from_bloom(&filter_from(&["a", "b"]), &params);
        let encoded = sig.to_base64();
        let decoded = MinHashSignature::from_base64(&encoded).unwrap();
        assert_eq!(sig, decoded);
    }
}

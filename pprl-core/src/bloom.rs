//! Fixed-size Bloom filter with a double-hashing insertion scheme.
//!
//! Binary layout (see also [`BloomFilter::to_bytes`]): header `(m: u32 LE,
//! k: u32 LE)` followed by `ceil(m / 8)` bytes of bit storage, bit `i` in
//! byte `i >> 3` at mask `1 << (i & 7)`.

use base64::Engine as _;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::CoreError;

const H1_DOMAIN: &[u8] = b"PPRL_BLOOM_H1";
const H2_DOMAIN: &[u8] = b"PPRL_BLOOM_H2";

/// A fixed-size Bloom filter of `m` bits and `k` hash functions.
///
/// Once built and handed to a peer, a filter is never mutated further — the
/// protocol only ever reads, XORs or serializes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    m: u32,
    k: u32,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Creates an empty filter with the given parameters.
    pub fn new(m: u32, k: u32) -> Self {
        let bytes = (m as usize).div_ceil(8);
        Self {
            m,
            k,
            bits: vec![0u8; bytes],
        }
    }

    /// Creates an empty filter and then sets `floor(p * m)` randomly chosen
    /// bits, masking the filter's true cardinality. `p` is clamped to
    /// `[0, 1]`.
    pub fn new_with_noise<R: Rng>(m: u32, k: u32, p: f64, rng: &mut R) -> Self {
        let mut filter = Self::new(m, k);
        let p = p.clamp(0.0, 1.0);
        let noise_bits = (p * m as f64).floor() as u32;
        for _ in 0..noise_bits {
            let idx = rng.gen_range(0..m);
            filter.set_bit(idx);
        }
        filter
    }

    /// Number of bits, `m`.
    pub fn m(&self) -> u32 {
        self.m
    }

    /// Number of hash functions, `k`.
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Adds `data` to the filter by setting its `k` double-hashed bit
    /// positions.
    pub fn add(&mut self, data: &[u8]) {
        let (h1, h2) = Self::hash_pair(data);
        for i in 0..self.k {
            let idx = Self::bit_index(h1, h2, i, self.m);
            self.set_bit(idx);
        }
    }

    /// Returns `true` iff all of `data`'s `k` bit positions are set (i.e.
    /// `data` may be a member).
    pub fn test(&self, data: &[u8]) -> bool {
        let (h1, h2) = Self::hash_pair(data);
        (0..self.k).all(|i| self.get_bit(Self::bit_index(h1, h2, i, self.m)))
    }

    /// The number of set bits.
    pub fn bit_count(&self) -> u32 {
        self.bits.iter().map(|b| b.count_ones()).sum()
    }

    /// The raw bit-storage bytes (`ceil(m / 8)` of them), without the
    /// `(m, k)` header.
    pub fn bit_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// XORs this filter's bits against `other`'s and returns the popcount
    /// of the result (the Hamming distance between the two filters).
    ///
    /// # Errors
    /// Returns [`CoreError::ParameterMismatch`] if the two filters do not
    /// share `(m, k)`.
    pub fn hamming_distance(&self, other: &Self) -> Result<u32, CoreError> {
        self.check_compatible(other)?;
        Ok(self
            .bits
            .iter()
            .zip(other.bits.iter())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum())
    }

    fn check_compatible(&self, other: &Self) -> Result<(), CoreError> {
        if self.m != other.m || self.k != other.k {
            return Err(CoreError::ParameterMismatch(format!(
                "bloom filters have different parameters: ({}, {}) vs ({}, {})",
                self.m, self.k, other.m, other.k
            )));
        }
        Ok(())
    }

    /// Serializes to the binary layout: `m: u32 LE`, `k: u32 LE`, bit bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.bits.len());
        buf.extend_from_slice(&self.m.to_le_bytes());
        buf.extend_from_slice(&self.k.to_le_bytes());
        buf.extend_from_slice(&self.bits);
        buf
    }

    /// Deserializes from the binary layout produced by [`Self::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() < 8 {
            return Err(CoreError::MalformedLayout(
                "bloom filter header truncated".to_owned(),
            ));
        }
        let m = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let k = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        let expected_len = 8 + (m as usize).div_ceil(8);
        if bytes.len() != expected_len {
            return Err(CoreError::MalformedLayout(format!(
                "expected {expected_len} bytes for m={m}, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            m,
            k,
            bits: bytes[8..].to_vec(),
        })
    }

    /// Base64-encodes [`Self::to_bytes`].
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.to_bytes())
    }

    /// Decodes a filter from [`Self::to_base64`]'s output.
    pub fn from_base64(s: &str) -> Result<Self, CoreError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|err| CoreError::InvalidBase64(err.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Iterates over the indices of set bits, in ascending order.
    pub fn set_bit_indices(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.m).filter(move |&i| self.get_bit(i))
    }

    fn set_bit(&mut self, idx: u32) {
        let idx = idx as usize;
        self.bits[idx >> 3] |= 1 << (idx & 7);
    }

    fn get_bit(&self, idx: u32) -> bool {
        let idx = idx as usize;
        self.bits[idx >> 3] & (1 << (idx & 7)) != 0
    }

    /// Double-hashing per Kirsch-Mitzenmacher: two independent keyed 64-bit
    /// hashes derived from domain-separated SHA-256.
    fn hash_pair(data: &[u8]) -> (u64, u64) {
        let h1 = {
            let mut hasher = Sha256::new();
            hasher.update(H1_DOMAIN);
            hasher.update(data);
            let digest = hasher.finalize();
            u64::from_le_bytes(digest[0..8].try_into().unwrap())
        };
        let h2 = {
            let mut hasher = Sha256::new();
            hasher.update(H2_DOMAIN);
            hasher.update(data);
            let digest = hasher.finalize();
            u64::from_le_bytes(digest[0..8].try_into().unwrap()) | 1
        };
        (h1, h2)
    }

    fn bit_index(h1: u64, h2: u64, i: u32, m: u32) -> u32 {
        let combined = h1.wrapping_add((i as u64).wrapping_mul(h2));
        (combined % m as u64) as u32
    }
}

//! Edwards-25519 group arithmetic, used for the commutative-encryption
//! blocking scheme in [`crate::blocker`].
//!
//! Blocking keys are hashed onto the prime-order Ristretto group built on
//! top of Edwards-25519 (via `curve25519-dalek`), rather than the raw
//! Edwards point group, so that encoding is canonical and there is no
//! cofactor to reason about. Scalar multiplication over an abelian group
//! is commutative by construction: `a * (b * P) == b * (a * P)`, which is
//! exactly the property the blocking scheme relies on.

use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CoreError;

const H2P_DOMAIN_A: &[u8] = b"PPRL_HASH_TO_POINT_A";
const H2P_DOMAIN_B: &[u8] = b"PPRL_HASH_TO_POINT_B";

/// Hashes arbitrary bytes onto a uniformly random point of the Ristretto
/// group.
///
/// Two domain-separated SHA-256 digests are concatenated into the 64
/// uniform bytes `RistrettoPoint::from_uniform_bytes` requires.
pub fn hash_to_point(data: &[u8]) -> RistrettoPoint {
    let mut wide = [0u8; 64];
    let mut h1 = Sha256::new();
    h1.update(H2P_DOMAIN_A);
    h1.update(data);
    wide[..32].copy_from_slice(&h1.finalize());

    let mut h2 = Sha256::new();
    h2.update(H2P_DOMAIN_B);
    h2.update(data);
    wide[32..].copy_from_slice(&h2.finalize());

    RistrettoPoint::from_uniform_bytes(&wide)
}

/// Encodes a point to its 32-byte canonical compressed form.
pub fn encode_point(point: &RistrettoPoint) -> [u8; 32] {
    point.compress().to_bytes()
}

/// Decodes a point from its 32-byte canonical compressed form.
///
/// # Errors
/// Returns [`CoreError::InvalidEncoding`] if the bytes do not decompress
/// to a valid Ristretto point.
pub fn decode_point(bytes: &[u8]) -> Result<RistrettoPoint, CoreError> {
    let compressed = CompressedRistretto::from_slice(bytes)
        .map_err(|_| CoreError::InvalidEncoding("expected 32 bytes".to_owned()))?;
    compressed
        .decompress()
        .ok_or_else(|| CoreError::InvalidEncoding("not a valid ristretto point".to_owned()))
}

/// A party's private commutative-encryption exponent.
///
/// Both parties apply their own `CommutativeKey` to a hashed point, in
/// either order, and arrive at the same doubly-encrypted point; neither
/// ever recovers the other's key or the plaintext point from the result.
#[derive(Clone)]
pub struct CommutativeKey(Scalar);

impl CommutativeKey {
    /// Draws a fresh uniformly random exponent.
    pub fn random<R: RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 64];
        rng.fill_bytes(&mut bytes);
        Self(Scalar::from_bytes_mod_order_wide(&bytes))
    }

    /// Applies this key's exponent to `point`.
    pub fn encrypt(&self, point: RistrettoPoint) -> RistrettoPoint {
        point * self.0
    }
}

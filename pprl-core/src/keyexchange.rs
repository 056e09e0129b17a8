//! X25519 Diffie-Hellman key exchange, used once per session to derive the
//! shared salt that seeds tokenization and q-gram hashing.
//!
//! Only the pure key-agreement math lives here; the socket round-trip that
//! exchanges public keys belongs to the session state machine in
//! `pprl-protocol`.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

/// A party's ephemeral X25519 private key.
pub struct EphemeralSecret(StaticSecret);

impl EphemeralSecret {
    /// Draws a fresh private key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(StaticSecret::random_from_rng(rng))
    }

    /// Loads a private key from its raw 32 clamped-scalar bytes, the
    /// decoded form of a configured hex `private_key`.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// The corresponding public key, sent to the peer.
    pub fn public_key(&self) -> [u8; 32] {
        PublicKey::from(&self.0).to_bytes()
    }

    /// Performs the Diffie-Hellman agreement with `peer_public` and hashes
    /// the resulting shared point into a hex shared salt.
    pub fn compute_shared_salt(&self, peer_public: &[u8; 32]) -> String {
        let peer = PublicKey::from(*peer_public);
        let shared = self.0.diffie_hellman(&peer);
        let digest = Sha256::digest(shared.as_bytes());
        hex::encode(digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn both_sides_derive_the_same_salt() {
        let mut rng_a = rand_chacha::ChaCha20Rng::seed_from_u64(1);
        let mut rng_b = rand_chacha::ChaCha20Rng::seed_from_u64(2);
        let alice = EphemeralSecret::random(&mut rng_a);
        let bob = EphemeralSecret::random(&mut rng_b);

        let alice_pub = alice.public_key();
        let bob_pub = bob.public_key();

        let salt_a = alice.compute_shared_salt(&bob_pub);
        let salt_b = bob.compute_shared_salt(&alice_pub);
        assert_eq!(salt_a, salt_b);
    }

    #[test]
    fn salt_is_64_lowercase_hex_chars() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(3);
        let alice = EphemeralSecret::random(&mut rng);
        let peer_pub = [7u8; 32];
        let salt = alice.compute_shared_salt(&peer_pub);
        assert_eq!(salt.len(), 64);
        assert!(salt.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn from_bytes_is_deterministic_and_usable_for_agreement() {
        let alice = EphemeralSecret::from_bytes([9u8; 32]);
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(5);
        let bob = EphemeralSecret::random(&mut rng);

        let salt_a = alice.compute_shared_salt(&bob.public_key());
        let salt_b = bob.compute_shared_salt(&alice.public_key());
        assert_eq!(salt_a, salt_b);

        let alice_again = EphemeralSecret::from_bytes([9u8; 32]);
        assert_eq!(alice.public_key(), alice_again.public_key());
    }

    #[test]
    fn different_peers_yield_different_salts() {
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(4);
        let alice = EphemeralSecret::random(&mut rng);
        let salt1 = alice.compute_shared_salt(&[1u8; 32]);
        let salt2 = alice.compute_shared_salt(&[2u8; 32]);
        assert_ne!(salt1, salt2);
    }
}

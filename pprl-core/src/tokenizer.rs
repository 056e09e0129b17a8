//! Opaque exact-match tokenization: `HMAC-SHA256(shared_salt, canonical)`,
//! emitted as lowercase hex. Used for the exact-match linkage path, where
//! fields are deterministic enough (an SSN, an email) that fuzzy sketching
//! would only add noise.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the opaque token for `canonical` under `shared_salt`.
///
/// `shared_salt` is typically the hex string produced by
/// [`crate::keyexchange::compute_shared_salt`].
pub fn tokenize(shared_salt: &str, canonical: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(shared_salt.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

//! Low-level failures raised by the sketching and cryptographic primitives.
//!
//! These are intentionally narrow (no notion of "protocol phase" or
//! "configuration" lives down here — see `pprl-types::error::PprlError` for
//! the error type the rest of the workspace surfaces).

use thiserror::Error;

/// Errors raised by [`crate::bloom`], [`crate::minhash`], [`crate::curve`],
/// [`crate::keyexchange`] and [`crate::blocker`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A base64 payload could not be decoded.
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// A decoded binary payload had the wrong length or malformed header.
    #[error("malformed binary layout: {0}")]
    MalformedLayout(String),

    /// Two values that are required to share parameters (Bloom `(m, k)`, a
    /// MinHash signature length `s`, ...) did not match.
    #[error("parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// A 32-byte curve point or scalar encoding was not canonical / not on
    /// the curve / not in the prime-order subgroup.
    #[error("invalid curve encoding: {0}")]
    InvalidEncoding(String),
}

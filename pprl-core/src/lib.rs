//! Pure, synchronous cryptographic and sketching primitives for the PPRL
//! engine.
//!
//! Nothing in this crate touches the network or the filesystem and nothing
//! here knows about protocol phases, sessions or configuration — those
//! concerns live in `pprl-types` and `pprl-protocol`. This crate is the
//! leaf: normalization and q-grams turn a raw field into a canonical
//! string, [`bloom`] and [`minhash`] turn a set of q-grams into a privacy
//! preserving sketch, [`curve`] and [`keyexchange`] provide the Edwards
//! curve arithmetic the blocking scheme is built from, and [`comparator`]
//! scores a pair of sketches once both sides are in hand.

pub mod blocker;
pub mod bloom;
pub mod comparator;
pub mod curve;
pub mod error;
pub mod keyexchange;
pub mod minhash;
pub mod normalize;
pub mod qgram;
pub mod sketch;
pub mod tokenizer;

pub use error::CoreError;

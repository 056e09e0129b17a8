//! Privacy-preserving record linkage: a two-party protocol for finding
//! matching records across two private datasets without either side
//! revealing its non-matching records to the other.
//!
//! This crate is a thin facade over `pprl-core` (sketch/crypto primitives),
//! `pprl-types` (wire and configuration types) and `pprl-protocol` (the
//! session state machine), each re-exported behind its own feature.

#[cfg(feature = "core")]
pub mod core {
    pub use pprl_core::*;
}

#[cfg(feature = "types")]
pub mod types {
    pub use pprl_types::*;
}

#[cfg(feature = "protocol")]
pub mod protocol {
    pub use pprl_protocol::*;
}

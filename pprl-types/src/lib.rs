//! Wire, record, configuration and error types shared across the PPRL
//! engine.
//!
//! This crate knows the *shapes* records and messages take on disk, on the
//! wire, and on the command line; it has no notion of sockets, sessions,
//! or the comparator's math (`pprl-core`) beyond converting to and from
//! those types.

pub mod config;
pub mod error;
pub mod field;
pub mod message;
pub mod phase;
pub mod pipeline;
pub mod record;

pub use error::PprlError;
pub use phase::Phase;

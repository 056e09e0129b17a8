//! Session state machine and framed wire protocol for two-party PPRL.
//!
//! [`framing`] is the only module that touches an `AsyncRead`/`AsyncWrite`
//! directly; [`session`] composes it with [`pprl_core`]'s sketch, blocking
//! and comparison primitives into the full protocol run.

pub mod framing;
pub mod retry;
pub mod session;
pub mod sink;
pub mod state;

pub use session::{Session, SessionOutcome};

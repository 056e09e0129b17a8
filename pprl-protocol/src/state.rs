//! The protocol's phase transition table.
//!
//! The happy-path sequence is strictly linear; [`Session::run`](crate::session::Session::run)
//! advances through it one phase at a time, and any error encountered along
//! the way maps to [`Phase::Abort`] regardless of which phase it occurred
//! in.

use pprl_types::Phase;

/// Returns the phase that follows `current` on the happy path.
///
/// `Phase::Done` and `Phase::Abort` are terminal and have no successor.
pub fn next_phase(current: Phase) -> Option<Phase> {
    match current {
        Phase::Init => Some(Phase::HsPubWait),
        Phase::HsPubWait => Some(Phase::HsPubRecv),
        Phase::HsPubRecv => Some(Phase::SketchExchange),
        Phase::SketchExchange => Some(Phase::BlockExchange),
        Phase::BlockExchange => Some(Phase::Intersect),
        Phase::Intersect => Some(Phase::Resolve),
        Phase::Resolve => Some(Phase::Done),
        Phase::Done | Phase::Abort => None,
    }
}

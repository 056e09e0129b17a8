//! The session's monotonic protocol phase.
//!
//! Shared between `pprl-protocol` (which drives transitions) and
//! `pprl-types::message` (which validates that an incoming frame's tag is
//! legal for the session's current phase).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One state in the protocol state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Init,
    HsPubWait,
    HsPubRecv,
    SketchExchange,
    BlockExchange,
    Intersect,
    Resolve,
    Done,
    Abort,
}

impl Phase {
    /// Whether a frame tagged `tag` (see [`crate::message::FrameTag`]) may
    /// legally arrive while the session is in this phase.
    pub fn accepts(self, tag: crate::message::FrameTag) -> bool {
        use crate::message::FrameTag::*;
        match (self, tag) {
            (_, Shutdown) | (_, Error) => true,
            (Phase::HsPubWait | Phase::HsPubRecv, PubKey) => true,
            (Phase::SketchExchange, SketchBatch) => true,
            (Phase::BlockExchange, BucketBatch) => true,
            (Phase::Resolve, MatchList) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Init => "INIT",
            Phase::HsPubWait => "HS_PUB_WAIT",
            Phase::HsPubRecv => "HS_PUB_RECV",
            Phase::SketchExchange => "SKETCH_EXCHANGE",
            Phase::BlockExchange => "BLOCK_EXCHANGE",
            Phase::Intersect => "INTERSECT",
            Phase::Resolve => "RESOLVE",
            Phase::Done => "DONE",
            Phase::Abort => "ABORT",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FrameTag;

    #[test]
    fn sketch_batch_only_accepted_during_sketch_exchange() {
        assert!(Phase::SketchExchange.accepts(FrameTag::SketchBatch));
        assert!(!Phase::HsPubRecv.accepts(FrameTag::SketchBatch));
        assert!(!Phase::BlockExchange.accepts(FrameTag::SketchBatch));
    }

    #[test]
    fn shutdown_and_error_accepted_in_any_phase() {
        for phase in [Phase::Init, Phase::HsPubWait, Phase::Done, Phase::Abort] {
            assert!(phase.accepts(FrameTag::Shutdown));
            assert!(phase.accepts(FrameTag::Error));
        }
    }

    #[test]
    fn bucket_batch_out_of_phase_is_rejected() {
        assert!(!Phase::HsPubRecv.accepts(FrameTag::BucketBatch));
    }
}

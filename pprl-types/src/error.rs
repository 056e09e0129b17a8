//! The single error type surfaced by every layer above `pprl-core`.
//!
//! Lower layers (`pprl-core::CoreError`) stay narrow and crypto/codec
//! specific; this type adds the phase and configuration context a session
//! needs to report "exactly one terminal failure kind" (see
//! [`PprlError::exit_code`]).

use pprl_core::CoreError;
use thiserror::Error;

use crate::phase::Phase;

/// The PPRL engine's error kinds.
#[derive(Debug, Clone, Error)]
pub enum PprlError {
    /// A configuration option was missing or malformed.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The stream closed, timed out, or a frame could not be read/written.
    #[error("i/o failure: {reason}")]
    IoFailed { reason: String, phase: Option<Phase> },

    /// An unexpected frame kind, length, or state transition was observed.
    #[error("protocol violation: {reason}")]
    ProtocolViolation { reason: String, phase: Option<Phase> },

    /// A scalar or point failed to decode, or a signature had the wrong
    /// length.
    #[error("cryptographic failure: {reason}")]
    CryptoFailed { reason: String, phase: Option<Phase> },

    /// The two parties' sketch parameters (or signature lengths) disagree.
    #[error("sketch mismatch: {reason}")]
    SketchMismatch { reason: String, phase: Option<Phase> },

    /// An external record-source adapter failed.
    #[error("record source failed: {0}")]
    RecordSourceFailed(String),

    /// A lookup against the local record set missed (diagnostics only).
    #[error("record not found: {0}")]
    RecordNotFound(String),
}

impl PprlError {
    pub fn io_failed(reason: impl Into<String>) -> Self {
        PprlError::IoFailed { reason: reason.into(), phase: None }
    }

    pub fn protocol_violation(reason: impl Into<String>) -> Self {
        PprlError::ProtocolViolation { reason: reason.into(), phase: None }
    }

    pub fn crypto_failed(reason: impl Into<String>) -> Self {
        PprlError::CryptoFailed { reason: reason.into(), phase: None }
    }

    pub fn sketch_mismatch(reason: impl Into<String>) -> Self {
        PprlError::SketchMismatch { reason: reason.into(), phase: None }
    }

    /// Attaches `phase` to the variants that carry one; a no-op on
    /// `ConfigInvalid`, `RecordSourceFailed` and `RecordNotFound`, which
    /// occur before or outside any live session.
    pub fn with_phase(mut self, phase: Phase) -> Self {
        match &mut self {
            PprlError::IoFailed { phase: p, .. }
            | PprlError::ProtocolViolation { phase: p, .. }
            | PprlError::CryptoFailed { phase: p, .. }
            | PprlError::SketchMismatch { phase: p, .. } => *p = Some(phase),
            PprlError::ConfigInvalid(_) | PprlError::RecordSourceFailed(_) | PprlError::RecordNotFound(_) => {}
        }
        self
    }

    /// The exit code a diagnostic runner should report for this error. The
    /// core itself never calls `exit`; this only maps a terminal error to
    /// the convention in the external-interfaces surface.
    pub fn exit_code(&self) -> i32 {
        match self {
            PprlError::ConfigInvalid(_) => 1,
            PprlError::IoFailed { .. } => 2,
            PprlError::RecordSourceFailed(_) => 2,
            PprlError::RecordNotFound(_) => 2,
            PprlError::ProtocolViolation { .. } => 3,
            PprlError::SketchMismatch { .. } => 3,
            PprlError::CryptoFailed { .. } => 4,
        }
    }
}

impl From<CoreError> for PprlError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidBase64(msg) => PprlError::sketch_mismatch(msg),
            CoreError::MalformedLayout(msg) => PprlError::sketch_mismatch(msg),
            CoreError::ParameterMismatch(msg) => PprlError::sketch_mismatch(msg),
            CoreError::InvalidEncoding(msg) => PprlError::crypto_failed(msg),
        }
    }
}

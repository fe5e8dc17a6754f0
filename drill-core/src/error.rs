//! # Error Types
//!
//! The error kinds the core surfaces to its caller. None of these is
//! fatal to the process; each one degrades a single session attempt.

use thiserror::Error;

/// Failures the signal engine can report.
#[derive(Debug, Error)]
pub enum DrillError {
    /// Permission was denied or no capture device exists. Surfaced
    /// before a session enters Running; never retried automatically.
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// No usable audio output backend. Synthesis becomes a silent
    /// no-op; detection and scoring continue unaffected.
    #[error("no audio output backend available")]
    NoAudioBackend,
}

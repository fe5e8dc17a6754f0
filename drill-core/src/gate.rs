//! # Note Confirmation Module
//!
//! Debounces the raw per-frame pitch-class stream into stable
//! "confirmed note" events. A candidate pitch class has to survive a
//! continuous 150 ms hold before it counts; the hold rejects
//! single-frame noise spikes and picking/attack transients.

use std::time::{Duration, Instant};

/// How long a pitch class must be held before it is confirmed.
pub const HOLD_THRESHOLD: Duration = Duration::from_millis(150);

/// Correctness state of the in-progress degree, as shown to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    /// No confirmed note yet (or silence after an unconfirmed one).
    Pending,
    /// A confirmed note matched the expected pitch class; sticky for
    /// the remainder of the degree.
    Correct,
    /// The last confirmed note missed; may still flip to correct.
    Incorrect,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    pitch_class: usize,
    since: Instant,
    /// Set once the hold has been reported, so a continuous hold
    /// confirms exactly once.
    reported: bool,
}

/// Tracks the currently held pitch class and emits one confirmation
/// per continuous hold. Owned by the session; reset on every degree
/// change.
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    candidate: Option<Candidate>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self { candidate: None }
    }

    /// Advances the gate by one estimation cycle.
    ///
    /// Silence drops the tracked candidate. A different pitch class
    /// replaces the candidate and restarts its clock. The same pitch
    /// class held for at least [`HOLD_THRESHOLD`] is confirmed — once
    /// per continuous hold.
    ///
    /// # Returns
    /// * `Some(pitch_class)` - A note was confirmed this cycle
    /// * `None` - Nothing confirmed
    pub fn on_estimate(&mut self, pitch_class: Option<usize>, now: Instant) -> Option<usize> {
        let Some(pitch_class) = pitch_class else {
            self.candidate = None;
            return None;
        };

        match &mut self.candidate {
            Some(candidate) if candidate.pitch_class == pitch_class => {
                if !candidate.reported && now.duration_since(candidate.since) >= HOLD_THRESHOLD {
                    candidate.reported = true;
                    return Some(pitch_class);
                }
                None
            }
            _ => {
                self.candidate = Some(Candidate { pitch_class, since: now, reported: false });
                None
            }
        }
    }

    /// Forgets everything; called when the target degree changes.
    pub fn reset(&mut self) {
        self.candidate = None;
    }
}

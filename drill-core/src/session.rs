//! # Session Controller Module
//!
//! The orchestrating state machine of the drill. Owns the current
//! target, the confirmation gate, the outcome sequence and the chord
//! player; advances to a new target on a fixed interval and routes
//! confirmed notes to scoring.
//!
//! The fine-grained estimation loop only submits estimates through
//! [`SessionController::on_estimate`]; all scoring state is owned
//! here. Timestamps are passed in explicitly, which keeps the whole
//! state machine unit-testable without sleeping.

use std::time::{Duration, Instant};

use crate::degree::{ScaleDegree, ScaleDegreeGenerator};
use crate::gate::{ConfirmationGate, NoteStatus};
use crate::synth::ChordPlayer;
use crate::theory::{self, Key, Mode};

/// Allowed range for the target-advancement interval, in seconds.
pub const MIN_INTERVAL_SECONDS: f32 = 1.0;
pub const MAX_INTERVAL_SECONDS: f32 = 5.0;

/// The chord never sounds longer than this, nor longer than the interval.
const MAX_CHORD_SECONDS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Stopped,
    Running,
}

/// The drill session: target generation, chord triggering, note
/// scoring and the running tally.
pub struct SessionController {
    phase: Phase,

    // Settings supplied by the frontend.
    key: Key,
    mode: Mode,
    interval: Duration,
    volume: f32,
    muted: bool,

    generator: ScaleDegreeGenerator,
    gate: ConfirmationGate,
    player: ChordPlayer,

    current: Option<ScaleDegree>,
    next_advance: Option<Instant>,

    /// One entry per completed degree, true when it was found.
    outcomes: Vec<bool>,
    /// Sticky per-degree "found correct" flag; cleared on advance.
    locked_correct: bool,
    /// True once any note has been confirmed this session. Gates
    /// result recording so an untouched microphone scores nothing.
    any_confirmed: bool,

    status: NoteStatus,
    detected_label: String,
}

impl SessionController {
    /// Creates a stopped session with default settings (C major,
    /// 2 second interval, half volume).
    pub fn new(player: ChordPlayer) -> Self {
        Self {
            phase: Phase::Stopped,
            key: Key::new(0),
            mode: Mode::Major,
            interval: Duration::from_secs_f32(2.0),
            volume: 0.5,
            muted: false,
            generator: ScaleDegreeGenerator::new(),
            gate: ConfirmationGate::new(),
            player,
            current: None,
            next_advance: None,
            outcomes: Vec::new(),
            locked_correct: false,
            any_confirmed: false,
            status: NoteStatus::Pending,
            detected_label: String::new(),
        }
    }

    // --- Inputs from the frontend layer ---

    pub fn set_key(&mut self, key: Key) {
        self.key = key;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }

    /// Sets the target-advancement interval, clamped to 1.0-5.0 s.
    pub fn set_interval(&mut self, seconds: f32) {
        let seconds = seconds.clamp(MIN_INTERVAL_SECONDS, MAX_INTERVAL_SECONDS);
        self.interval = Duration::from_secs_f32(seconds);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Discards the running tally.
    pub fn reset_results(&mut self) {
        self.outcomes.clear();
    }

    /// Begins a session: clears the tally and per-degree flags,
    /// installs a fresh target, sounds its chord and arms the
    /// interval deadline.
    ///
    /// The caller acquires the microphone *before* calling this; on a
    /// capture failure the session must never be started.
    pub fn start(&mut self, now: Instant) {
        if self.phase == Phase::Running {
            return;
        }
        self.outcomes.clear();
        self.any_confirmed = false;
        self.current = None;
        self.detected_label.clear();
        self.phase = Phase::Running;
        self.install_next_degree(now);
    }

    /// Ends the session, recording the final degree's outcome first.
    pub fn stop(&mut self, _now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        if self.current.is_some() && self.any_confirmed {
            self.outcomes.push(self.locked_correct);
        }
        self.phase = Phase::Stopped;
        self.current = None;
        self.next_advance = None;
        self.locked_correct = false;
        self.status = NoteStatus::Pending;
        self.detected_label.clear();
        self.gate.reset();
        self.player.stop();
    }

    /// Advances to a new target when the interval deadline has passed.
    /// Call this once per frame tick.
    pub fn poll(&mut self, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }
        if let Some(deadline) = self.next_advance {
            if now >= deadline {
                self.install_next_degree(now);
            }
        }
    }

    /// Submits one pitch estimate from the fine-grained loop.
    ///
    /// Updates the detected label, drives the confirmation gate, and
    /// scores confirmed notes against the current target. The first
    /// confirmed correct note locks the degree green; later wrong
    /// confirmations within the same degree are ignored.
    pub fn on_estimate(&mut self, frequency: Option<f32>, now: Instant) {
        if self.phase != Phase::Running {
            return;
        }

        let pitch_class = frequency.map(theory::frequency_to_pitch_class);
        match pitch_class {
            Some(pc) => {
                self.detected_label = theory::degree_label(pc, self.key, self.mode).to_string();
            }
            None => {
                self.detected_label.clear();
                if !self.locked_correct {
                    self.status = NoteStatus::Pending;
                }
            }
        }

        let Some(confirmed) = self.gate.on_estimate(pitch_class, now) else {
            return;
        };
        self.any_confirmed = true;

        if self.locked_correct {
            return;
        }
        let Some(target) = self.current else {
            return;
        };
        let expected = theory::expected_pitch_class(self.key, target.degree, self.mode);
        if confirmed == expected {
            self.status = NoteStatus::Correct;
            self.locked_correct = true;
        } else {
            self.status = NoteStatus::Incorrect;
        }
    }

    // --- Outputs consumed by the frontend layer ---

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// The target currently being drilled, if a session is running.
    pub fn current_degree(&self) -> Option<ScaleDegree> {
        self.current
    }

    /// Label of the most recently detected pitch class, relative to
    /// the session's key and mode. Empty during silence.
    pub fn detected_label(&self) -> &str {
        &self.detected_label
    }

    pub fn note_status(&self) -> NoteStatus {
        self.status
    }

    /// One boolean per completed degree, in order.
    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    /// Percentage of found degrees, rounded; 0 for an empty tally.
    pub fn accuracy_percent(&self) -> u32 {
        if self.outcomes.is_empty() {
            return 0;
        }
        let correct = self.outcomes.iter().filter(|&&found| found).count();
        (100.0 * correct as f32 / self.outcomes.len() as f32).round() as u32
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Records the finished degree (when one exists and a note has
    /// been confirmed this session), draws the next target, resets
    /// the per-degree state, sounds the chord and re-arms the timer.
    fn install_next_degree(&mut self, now: Instant) {
        if self.current.is_some() && self.any_confirmed {
            self.outcomes.push(self.locked_correct);
        }

        let next = self.generator.next(self.current);
        self.current = Some(next);
        self.gate.reset();
        self.locked_correct = false;
        self.status = NoteStatus::Pending;
        self.next_advance = Some(now + self.interval);

        let chord_seconds = self.interval.as_secs_f32().min(MAX_CHORD_SECONDS);
        self.player.play(self.key, self.mode, self.volume, self.muted, chord_seconds);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> SessionController {
        let mut s = SessionController::new(ChordPlayer::disabled());
        s.set_muted(true);
        s.set_interval(1.0);
        s
    }

    /// Frequency (octave 4) of a pitch-class index.
    fn freq_of(pitch_class: usize) -> f32 {
        440.0 * 2.0_f32.powf((pitch_class as f32 - 9.0) / 12.0)
    }

    fn expected_freq(s: &SessionController) -> f32 {
        let target = s.current_degree().unwrap();
        freq_of(theory::expected_pitch_class(s.key(), target.degree, s.mode()))
    }

    fn wrong_freq(s: &SessionController) -> f32 {
        let target = s.current_degree().unwrap();
        let expected = theory::expected_pitch_class(s.key(), target.degree, s.mode());
        freq_of((expected + 1) % 12)
    }

    /// Holds a frequency long enough for the gate to confirm it.
    fn hold(s: &mut SessionController, freq: f32, from: Instant) -> Instant {
        s.on_estimate(Some(freq), from);
        let t = from + Duration::from_millis(170);
        s.on_estimate(Some(freq), t);
        t
    }

    /// Confirms the current target's expected pitch class.
    fn hold_expected(s: &mut SessionController, from: Instant) -> Instant {
        let freq = expected_freq(s);
        hold(s, freq, from)
    }

    /// Confirms a pitch class one semitone off the expected one.
    fn hold_wrong(s: &mut SessionController, from: Instant) -> Instant {
        let freq = wrong_freq(s);
        hold(s, freq, from)
    }

    #[test]
    fn start_installs_a_target_and_stop_clears_it() {
        let mut s = session();
        let base = Instant::now();
        assert!(s.current_degree().is_none());
        s.start(base);
        assert!(s.is_running());
        assert!(s.current_degree().is_some());
        s.stop(base + Duration::from_millis(100));
        assert!(!s.is_running());
        assert!(s.current_degree().is_none());
    }

    #[test]
    fn correct_note_locks_and_wrong_notes_cannot_unlock() {
        let mut s = session();
        let base = Instant::now();
        s.start(base);

        let t = hold_expected(&mut s, base);
        assert_eq!(s.note_status(), NoteStatus::Correct);

        // A wrong confirmation within the same degree is ignored.
        let wrong = wrong_freq(&s);
        hold(&mut s, wrong, t + Duration::from_millis(10));
        assert_eq!(s.note_status(), NoteStatus::Correct);
    }

    #[test]
    fn wrong_note_reports_incorrect_then_flips_on_correct() {
        let mut s = session();
        let base = Instant::now();
        s.start(base);

        let t = hold_wrong(&mut s, base);
        assert_eq!(s.note_status(), NoteStatus::Incorrect);

        hold_expected(&mut s, t + Duration::from_millis(10));
        assert_eq!(s.note_status(), NoteStatus::Correct);
    }

    #[test]
    fn silence_returns_status_to_pending_unless_locked() {
        let mut s = session();
        let base = Instant::now();
        s.start(base);

        let t = hold_wrong(&mut s, base);
        assert_eq!(s.note_status(), NoteStatus::Incorrect);
        s.on_estimate(None, t + Duration::from_millis(10));
        assert_eq!(s.note_status(), NoteStatus::Pending);
        assert_eq!(s.detected_label(), "");

        let t = hold_expected(&mut s, t + Duration::from_millis(20));
        s.on_estimate(None, t + Duration::from_millis(10));
        assert_eq!(s.note_status(), NoteStatus::Correct);
    }

    #[test]
    fn no_outcomes_before_the_first_confirmed_note() {
        let mut s = session();
        let mut now = Instant::now();
        s.start(now);

        // Several intervals pass without a single confirmed note.
        for _ in 0..3 {
            now += Duration::from_millis(1100);
            s.poll(now);
        }
        assert!(s.outcomes().is_empty());
        assert_eq!(s.accuracy_percent(), 0);
    }

    #[test]
    fn outcomes_track_completed_degrees() {
        let mut s = session();
        let mut now = Instant::now();
        s.start(now);

        // Degree 1: found.
        now = hold_expected(&mut s, now);
        now += Duration::from_millis(1100);
        s.poll(now);
        assert_eq!(s.outcomes(), &[true]);

        // Degree 2: missed.
        now = hold_wrong(&mut s, now);
        now += Duration::from_millis(1100);
        s.poll(now);
        assert_eq!(s.outcomes(), &[true, false]);

        // Degree 3: found, recorded by stop (exactly once).
        now = hold_expected(&mut s, now);
        s.stop(now);
        assert_eq!(s.outcomes(), &[true, false, true]);
        assert_eq!(s.accuracy_percent(), 67);
    }

    #[test]
    fn consecutive_targets_never_repeat() {
        let mut s = session();
        let mut now = Instant::now();
        s.start(now);
        // Gate recording on so every completed degree is appended.
        now = hold_expected(&mut s, now);

        let mut previous = s.current_degree().unwrap();
        for _ in 0..50 {
            now += Duration::from_millis(1100);
            s.poll(now);
            let current = s.current_degree().unwrap();
            assert_ne!(current, previous);
            previous = current;
        }
        assert_eq!(s.outcomes().len(), 50);
    }

    #[test]
    fn detected_label_follows_the_heard_pitch() {
        let mut s = session();
        let base = Instant::now();
        s.start(base);
        // G in C major reads as degree 5 regardless of the target.
        s.on_estimate(Some(392.0), base);
        assert_eq!(s.detected_label(), "5");
    }

    #[test]
    fn accuracy_is_100_when_everything_is_found() {
        let mut s = session();
        let mut now = Instant::now();
        s.start(now);
        for _ in 0..4 {
            now = hold_expected(&mut s, now);
            now += Duration::from_millis(1100);
            s.poll(now);
        }
        assert_eq!(s.outcomes().len(), 4);
        assert_eq!(s.accuracy_percent(), 100);
    }

    #[test]
    fn reset_results_clears_the_tally_mid_session() {
        let mut s = session();
        let mut now = Instant::now();
        s.start(now);
        now = hold_expected(&mut s, now);
        now += Duration::from_millis(1100);
        s.poll(now);
        assert_eq!(s.outcomes().len(), 1);

        s.reset_results();
        assert!(s.outcomes().is_empty());

        // Recording resumes immediately; the session-start gate stays
        // satisfied because a note has already been confirmed.
        now = hold_wrong(&mut s, now);
        now += Duration::from_millis(1100);
        s.poll(now);
        assert_eq!(s.outcomes(), &[false]);
    }

    #[test]
    fn interval_and_volume_are_clamped() {
        let mut s = session();
        s.set_interval(0.2);
        assert_eq!(s.interval, Duration::from_secs_f32(1.0));
        s.set_interval(9.0);
        assert_eq!(s.interval, Duration::from_secs_f32(5.0));
        s.set_volume(3.0);
        assert_eq!(s.volume, 1.0);
    }

    #[test]
    fn estimates_are_ignored_while_stopped() {
        let mut s = session();
        let base = Instant::now();
        s.on_estimate(Some(392.0), base);
        s.on_estimate(Some(392.0), base + Duration::from_millis(200));
        assert_eq!(s.note_status(), NoteStatus::Pending);
        assert_eq!(s.detected_label(), "");
        assert!(s.outcomes().is_empty());
    }
}

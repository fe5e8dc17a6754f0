//! # Chord Synthesis Module
//!
//! Renders the tonal-center triad for the current key and mode, and
//! plays it through the default output device. Each chord tone gets
//! three partials (1x, 2x, 4x) with fixed relative gains, a short
//! linear attack and an exponential release tail.
//!
//! ## Features
//! - Triad voicing anchored at scientific C4, dropped an octave for
//!   high roots to keep a comfortable register
//! - Additive three-partial timbre per chord tone
//! - Graceful no-op when no output backend exists

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::DrillError;
use crate::theory::{Key, Mode};

/// Scientific C4, the root anchor for chord voicing.
pub const CHORD_BASE_FREQUENCY: f32 = 261.63;

/// Partial frequency multiples per chord tone.
const PARTIAL_RATIOS: [f32; 3] = [1.0, 2.0, 4.0];
/// Sustain gain of each partial tier relative to unit gain.
const PARTIAL_GAINS: [f32; 3] = [0.3, 0.08, 0.02];
/// Master gain headroom so three tones' partials never clip.
const MASTER_GAIN: f32 = 0.45;

/// Linear attack length in seconds.
const ATTACK_SECONDS: f32 = 0.02;
/// Exponential release tail length in seconds.
const RELEASE_SECONDS: f32 = 0.1;
/// Release decays to this fraction of the sustain level.
const RELEASE_FLOOR: f32 = 1e-3;

/// The three chord-tone frequencies (root, third, fifth) for a key.
///
/// The root is C4 shifted by the key's index in semitones, dropped a
/// further octave for keys at index 8 and above (Ab and higher) to
/// keep the voicing in a comfortable register. The third is +4
/// semitones in major, +3 in minor; the fifth is +7.
pub fn chord_frequencies(key: Key, mode: Mode) -> [f32; 3] {
    let mut semitones = key.index() as i32;
    if key.index() >= 8 {
        semitones -= 12;
    }
    let root = CHORD_BASE_FREQUENCY * 2.0_f32.powf(semitones as f32 / 12.0);
    let third_semitones = match mode {
        Mode::Major => 4.0,
        Mode::Minor => 3.0,
    };
    let third = root * 2.0_f32.powf(third_semitones / 12.0);
    let fifth = root * 2.0_f32.powf(7.0 / 12.0);
    [root, third, fifth]
}

/// Renders the tonic triad into a mono sample buffer.
///
/// # Arguments
/// * `key` - Tonal center
/// * `mode` - Major or minor third
/// * `volume` - 0.0-1.0, scaled by the master gain
/// * `duration_secs` - Total length including the release tail
/// * `sample_rate` - Output sample rate in Hz
pub fn render_chord(
    key: Key,
    mode: Mode,
    volume: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Vec<f32> {
    let total = (duration_secs * sample_rate as f32) as usize;
    if total == 0 {
        return Vec::new();
    }

    let attack = ((ATTACK_SECONDS * sample_rate as f32) as usize).max(1).min(total);
    let release = ((RELEASE_SECONDS * sample_rate as f32) as usize).min(total);
    let release_start = total - release;
    let gain = volume.clamp(0.0, 1.0) * MASTER_GAIN;
    let tones = chord_frequencies(key, mode);

    let mut samples = Vec::with_capacity(total);
    for i in 0..total {
        let t = i as f32 / sample_rate as f32;

        let envelope = if i < attack {
            i as f32 / attack as f32
        } else if i >= release_start && release > 0 {
            let progress = (i - release_start) as f32 / release as f32;
            RELEASE_FLOOR.powf(progress)
        } else {
            1.0
        };

        let mut sample = 0.0;
        for &tone in &tones {
            for (ratio, partial_gain) in PARTIAL_RATIOS.iter().zip(PARTIAL_GAINS.iter()) {
                sample += partial_gain * (std::f32::consts::TAU * tone * ratio * t).sin();
            }
        }
        samples.push(sample * envelope * gain);
    }
    samples
}

/// Plays rendered chords through the default output device.
///
/// Holding the player keeps at most one chord sounding; starting a
/// new one silences the previous stream first. When the host has no
/// usable output device, every play is a logged no-op and the caller
/// is never blocked.
pub struct ChordPlayer {
    device: Option<cpal::Device>,
    stream: Option<cpal::Stream>,
}

impl ChordPlayer {
    /// Creates a player bound to the default output device, if any.
    pub fn new() -> Self {
        let device = cpal::default_host().default_output_device();
        if device.is_none() {
            eprintln!("[SYNTH] {}", DrillError::NoAudioBackend);
        }
        Self { device, stream: None }
    }

    /// Creates a player that never produces sound. Used by tests and
    /// headless runs.
    pub fn disabled() -> Self {
        Self { device: None, stream: None }
    }

    /// Renders and starts the tonic triad for a key and mode.
    ///
    /// Any previously sounding chord is stopped first — the one case
    /// of explicit preemption. Muting suppresses rendering entirely;
    /// no signal is produced.
    pub fn play(&mut self, key: Key, mode: Mode, volume: f32, muted: bool, duration_secs: f32) {
        // Silence whatever is still sounding before a new chord starts.
        self.stream = None;

        if muted {
            return;
        }
        let Some(device) = &self.device else {
            return;
        };

        let supported = match device.supported_output_configs() {
            Ok(configs) => find_output_config(configs.collect(), 44100),
            Err(e) => {
                eprintln!("[SYNTH] Could not query output configs: {}", e);
                return;
            }
        };
        let Some(supported) = supported else {
            eprintln!("[SYNTH] {}", DrillError::NoAudioBackend);
            return;
        };

        let rate = 44100.clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
        let config = supported.with_sample_rate(cpal::SampleRate(rate));
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        let samples = render_chord(key, mode, volume, duration_secs, sample_rate);
        let mut position = 0usize;

        let err_fn = |err| eprintln!("[SYNTH] An error occurred on the output stream: {}", err);
        let stream = device.build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let value = samples.get(position).copied().unwrap_or(0.0);
                    position = position.saturating_add(1);
                    for out in frame.iter_mut() {
                        *out = value;
                    }
                }
            },
            err_fn,
            None,
        );

        match stream {
            Ok(stream) => {
                if let Err(e) = stream.play() {
                    eprintln!("[SYNTH] Could not start output stream: {}", e);
                    return;
                }
                self.stream = Some(stream);
            }
            Err(e) => eprintln!("[SYNTH] Could not build output stream: {}", e),
        }
    }

    /// Stops any currently sounding chord.
    pub fn stop(&mut self) {
        self.stream = None;
    }
}

impl Default for ChordPlayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Finds the best f32 output configuration near the target rate.
fn find_output_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32 && c.channels() >= 1)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}

//! # Music Theory Module
//!
//! Pitch-class and scale-degree calculations for the drill. All
//! matching is octave-invariant and assumes 12-tone equal temperament
//! with A4 = 440 Hz.
//!
//! ## Features
//! - Frequency to pitch-class classification
//! - Expected pitch class for a key / degree / mode
//! - Chromatic scale-degree labels ("♭2", "#4", ...)
//! - Key parsing with enharmonic spellings

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The 12 pitch-class names in a fixed table starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Display spellings for the 12 key roots (flats preferred).
pub const KEY_NAMES: [&str; 12] = [
    "C", "Db", "D", "Eb", "E", "F", "Gb", "G", "Ab", "A", "Bb", "B",
];

/// One of the 12 pitch-class roots, identified by a stable index 0-11.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key(u8);

impl Key {
    /// Creates a key from a pitch-class index (wrapped into 0-11).
    pub fn new(index: u8) -> Self {
        Key(index % 12)
    }

    /// The key's pitch-class index (0 = C).
    pub fn index(&self) -> u8 {
        self.0
    }

    /// The key's display name, e.g. "Eb".
    pub fn name(&self) -> &'static str {
        KEY_NAMES[self.0 as usize]
    }

    /// Parses a key name, accepting both flat and sharp spellings
    /// ("Db" and "C#" are the same key).
    pub fn from_name(name: &str) -> Option<Self> {
        let index = match name {
            "C" => 0,
            "C#" | "Db" => 1,
            "D" => 2,
            "D#" | "Eb" => 3,
            "E" => 4,
            "F" => 5,
            "F#" | "Gb" => 6,
            "G" => 7,
            "G#" | "Ab" => 8,
            "A" => 9,
            "A#" | "Bb" => 10,
            "B" => 11,
            _ => return None,
        };
        Some(Key(index))
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Major or natural minor; selects one of two fixed 7-element
/// interval sets over the 12 pitch classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl Mode {
    /// Semitone offsets of the seven scale degrees from the tonic.
    pub fn intervals(&self) -> &'static [u8; 7] {
        match self {
            Mode::Major => &[0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => &[0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// Display names of the seven in-scale degrees.
    pub fn degree_names(&self) -> &'static [&'static str; 7] {
        match self {
            Mode::Major => &["1", "2", "3", "4", "5", "6", "7"],
            Mode::Minor => &["1", "2", "♭3", "4", "5", "♭6", "♭7"],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// Classifies a frequency to a pitch-class index (0 = C).
///
/// The semitone offset from A4 = 440 Hz is `round(12 * log2(f / 440))`;
/// A sits at index 9 in the fixed table, so the pitch class is
/// `(9 + offset) mod 12`, normalized into [0, 12) for negative offsets.
pub fn frequency_to_pitch_class(freq: f32) -> usize {
    let offset = (12.0 * (freq / 440.0).log2()).round() as i32;
    (((9 + offset) % 12 + 12) % 12) as usize
}

/// The pitch class a given scale degree of a key resolves to.
///
/// # Arguments
/// * `key` - Tonal center
/// * `degree` - Scale degree (1-7)
/// * `mode` - Major or minor interval set
pub fn expected_pitch_class(key: Key, degree: u8, mode: Mode) -> usize {
    let interval = mode.intervals()[(degree - 1) as usize];
    ((key.index() + interval) % 12) as usize
}

/// Statically computed interval-to-label tables, one per mode.
///
/// Index 0 is major, index 1 is minor. Each table maps a semitone
/// interval from the tonic (0-11) to its scale-degree display label.
static DEGREE_LABELS: Lazy<[[String; 12]; 2]> =
    Lazy::new(|| [build_labels(Mode::Major), build_labels(Mode::Minor)]);

/// Builds the 12-entry label table for one mode.
///
/// In-scale intervals get their plain degree name. Chromatic
/// intervals get an altered label: raising an already-flatted degree
/// lands on its natural ("7" for interval 11 in minor), the tritone
/// is spelled as a raised fourth ("#4"), and everything else is the
/// flat of the degree above ("♭2"). Intervals matching neither
/// neighbor get the explicit "?" marker.
fn build_labels(mode: Mode) -> [String; 12] {
    let intervals = mode.intervals();
    let names = mode.degree_names();
    let position = |interval: u8| intervals.iter().position(|&i| i == interval);

    std::array::from_fn(|interval| {
        let interval = interval as u8;
        if let Some(i) = position(interval) {
            return names[i].to_string();
        }
        // Major seventh in minor reads as a raised ♭7, never "♭1".
        if mode == Mode::Minor && interval == 11 {
            return "7".to_string();
        }
        if interval > 0 {
            if let Some(i) = position(interval - 1) {
                if names[i].starts_with('♭') {
                    return format!("{}", i + 1);
                }
                if i + 1 == 4 {
                    return format!("#{}", i + 1);
                }
            }
        }
        if let Some(j) = position((interval + 1) % 12) {
            return format!("♭{}", j + 1);
        }
        if interval > 0 {
            if let Some(i) = position(interval - 1) {
                return format!("#{}", i + 1);
            }
        }
        "?".to_string()
    })
}

/// Maps a detected pitch class to its scale-degree label relative to
/// a key and mode, e.g. pitch class 7 in C major -> "5".
pub fn degree_label(pitch_class: usize, key: Key, mode: Mode) -> &'static str {
    let interval = (pitch_class + 12 - key.index() as usize) % 12;
    let table = match mode {
        Mode::Major => &DEGREE_LABELS[0],
        Mode::Minor => &DEGREE_LABELS[1],
    };
    &table[interval]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a440_classifies_to_a() {
        assert_eq!(frequency_to_pitch_class(440.0), 9);
        assert_eq!(NOTE_NAMES[frequency_to_pitch_class(440.0)], "A");
    }

    #[test]
    fn middle_c_classifies_to_c() {
        assert_eq!(frequency_to_pitch_class(261.63), 0);
    }

    #[test]
    fn pitch_class_round_trips_across_octaves() {
        // A tone at the expected pitch class's exact frequency, in any
        // octave, must classify back to that same pitch class.
        for pc in 0..12usize {
            // Semitones from A4 to the pitch class in octave 4.
            let semis = pc as i32 - 9;
            for octave in -2..=2i32 {
                let freq = 440.0_f32 * 2.0_f32.powf((semis + 12 * octave) as f32 / 12.0);
                assert_eq!(frequency_to_pitch_class(freq), pc, "pc {pc} octave {octave}");
            }
        }
    }

    #[test]
    fn degree_five_of_c_major_is_g() {
        let pc = expected_pitch_class(Key::new(0), 5, Mode::Major);
        assert_eq!(pc, 7);
        assert_eq!(NOTE_NAMES[pc], "G");
    }

    #[test]
    fn g4_frequency_matches_degree_five_of_c_major() {
        let expected = expected_pitch_class(Key::new(0), 5, Mode::Major);
        assert_eq!(frequency_to_pitch_class(392.0), expected);
    }

    #[test]
    fn in_scale_labels_major() {
        let key = Key::new(0);
        for (i, &interval) in Mode::Major.intervals().iter().enumerate() {
            let label = degree_label(interval as usize, key, Mode::Major);
            assert_eq!(label, Mode::Major.degree_names()[i]);
        }
    }

    #[test]
    fn in_scale_labels_minor() {
        let key = Key::new(9); // A minor
        for (i, &interval) in Mode::Minor.intervals().iter().enumerate() {
            let pc = (9 + interval as usize) % 12;
            let label = degree_label(pc, key, Mode::Minor);
            assert_eq!(label, Mode::Minor.degree_names()[i]);
        }
    }

    #[test]
    fn major_seventh_in_minor_is_labeled_seven() {
        // Interval 11 from A is G#; in A minor it reads "7", not "♭1".
        let key = Key::from_name("A").unwrap();
        let g_sharp = 8;
        assert_eq!(degree_label(g_sharp, key, Mode::Minor), "7");
    }

    #[test]
    fn chromatic_labels_major() {
        let key = Key::new(0);
        assert_eq!(degree_label(1, key, Mode::Major), "♭2");
        assert_eq!(degree_label(3, key, Mode::Major), "♭3");
        assert_eq!(degree_label(6, key, Mode::Major), "#4");
        assert_eq!(degree_label(8, key, Mode::Major), "♭6");
        assert_eq!(degree_label(10, key, Mode::Major), "♭7");
    }

    #[test]
    fn chromatic_labels_minor() {
        let key = Key::new(0);
        assert_eq!(degree_label(1, key, Mode::Minor), "♭2");
        assert_eq!(degree_label(4, key, Mode::Minor), "3");
        assert_eq!(degree_label(6, key, Mode::Minor), "#4");
        assert_eq!(degree_label(9, key, Mode::Minor), "6");
    }

    #[test]
    fn key_parsing_accepts_enharmonics() {
        assert_eq!(Key::from_name("C#"), Key::from_name("Db"));
        assert_eq!(Key::from_name("Eb").unwrap().index(), 3);
        assert_eq!(Key::from_name("H"), None);
    }
}

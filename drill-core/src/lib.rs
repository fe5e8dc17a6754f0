// drill-core/src/lib.rs

//! The core logic for the scale-degree ear-training drill.
//! This crate is responsible for audio capture, pitch estimation,
//! note classification, chord synthesis and session scoring. It is
//! completely headless and contains no terminal or rendering code.

pub mod audio;
pub mod degree;
pub mod error;
pub mod gate;
pub mod pitch;
pub mod session;
pub mod synth;
pub mod theory;

pub use degree::{Direction, ScaleDegree, ScaleDegreeGenerator};
pub use error::DrillError;
pub use gate::{ConfirmationGate, NoteStatus};
pub use session::SessionController;
pub use synth::ChordPlayer;
pub use theory::{Key, Mode};

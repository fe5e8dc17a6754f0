//! # Scale-Degree Drill - Terminal Frontend
//!
//! A thin frontend around the `drill-core` engine: parses flags,
//! loads/saves settings, wires microphone frames into the session
//! controller and prints its outputs as state lines.
//!
//! ## Architecture
//! - **Capture callback**: CPAL's own thread, streaming 2048-sample
//!   frames over a crossbeam channel
//! - **Main thread**: the session loop — estimates pitch on arriving
//!   frames, polls the interval deadline, prints state changes
//! - **Stdin thread**: one line per command (`r` reset, `q` quit)

use std::io::BufRead;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use cpal::traits::StreamTrait;
use serde::{Deserialize, Serialize};

use drill_core::pitch::{self, DEFAULT_AMPLITUDE_THRESHOLD};
use drill_core::{ChordPlayer, Key, Mode, NoteStatus, SessionController, audio};

#[derive(Parser, Debug)]
#[command(name = "drill")]
#[command(about = "Ear-training drill: sing the announced scale degree over the tonic chord")]
struct Args {
    /// Tonal center, e.g. C, Eb, F#
    #[arg(short, long)]
    key: Option<String>,

    /// Drill in natural minor instead of major
    #[arg(long)]
    minor: bool,

    /// Drill in major (overrides a saved minor setting)
    #[arg(long)]
    major: bool,

    /// Seconds between targets (1.0-5.0)
    #[arg(short, long)]
    interval: Option<f32>,

    /// Chord volume (0.0-1.0)
    #[arg(short, long)]
    volume: Option<f32>,

    /// Suppress chord playback entirely
    #[arg(long)]
    muted: bool,

    /// Settings file, loaded on start and rewritten on exit
    #[arg(long, default_value = "drill_settings.json")]
    settings: String,
}

/// The user-adjustable settings persisted between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Settings {
    key: Key,
    mode: Mode,
    interval_seconds: f32,
    volume: f32,
    muted: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key: Key::new(0),
            mode: Mode::Major,
            interval_seconds: 2.0,
            volume: 0.5,
            muted: false,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = load_settings(&args.settings).unwrap_or_default();
    if let Some(name) = &args.key {
        match Key::from_name(name) {
            Some(key) => settings.key = key,
            None => anyhow::bail!("unknown key name: {name}"),
        }
    }
    if args.minor {
        settings.mode = Mode::Minor;
    }
    if args.major {
        settings.mode = Mode::Major;
    }
    if let Some(interval) = args.interval {
        settings.interval_seconds = interval;
    }
    if let Some(volume) = args.volume {
        settings.volume = volume;
    }
    if args.muted {
        settings.muted = true;
    }

    // Acquire the microphone before anything else; if this fails the
    // session is never started.
    let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Vec<f32>>(8);
    let (stream, sample_rate) = match audio::start_capture(frame_tx) {
        Ok(capture) => capture,
        Err(e) => {
            eprintln!("[MAIN] {}", e);
            std::process::exit(1);
        }
    };

    let mut session = SessionController::new(ChordPlayer::new());
    session.set_key(settings.key);
    session.set_mode(settings.mode);
    session.set_interval(settings.interval_seconds);
    session.set_volume(settings.volume);
    session.set_muted(settings.muted);

    // Stdin commands arrive on their own thread so the session loop
    // never blocks on the terminal.
    let (command_tx, command_rx) = crossbeam_channel::unbounded::<String>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if command_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!(
        "Drilling in {} {} — sing each announced degree. Commands: r = reset results, q = quit",
        settings.key, settings.mode
    );
    session.start(Instant::now());

    let mut last_line = String::new();
    loop {
        crossbeam_channel::select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => {
                    let estimate = pitch::estimate_pitch(&frame, sample_rate, DEFAULT_AMPLITUDE_THRESHOLD);
                    session.on_estimate(estimate, Instant::now());
                }
                Err(_) => {
                    eprintln!("[MAIN] Capture channel closed");
                    break;
                }
            },
            recv(command_rx) -> msg => match msg {
                Ok(command) => match command.trim() {
                    "q" | "quit" => break,
                    "r" | "reset" => {
                        session.reset_results();
                        println!("Results reset.");
                    }
                    "" => {}
                    other => eprintln!("[MAIN] Unknown command: {}", other),
                },
                Err(_) => break, // stdin closed
            },
            default(Duration::from_millis(16)) => {}
        }

        session.poll(Instant::now());
        print_state(&session, &mut last_line);
    }

    session.stop(Instant::now());
    let found = session.outcomes().iter().filter(|&&f| f).count();
    println!(
        "Session over: {}/{} degrees found ({}%)",
        found,
        session.outcomes().len(),
        session.accuracy_percent()
    );

    // Release the microphone before saving settings.
    if let Err(e) = stream.pause() {
        eprintln!("[MAIN] Error pausing capture stream: {}", e);
    }
    drop(stream);

    if let Err(e) = save_settings(&settings, &args.settings) {
        eprintln!("[MAIN] Error saving settings: {}", e);
    }
    Ok(())
}

/// Prints one state line whenever target, detection or score change.
fn print_state(session: &SessionController, last_line: &mut String) {
    let Some(target) = session.current_degree() else {
        return;
    };
    let status = match session.note_status() {
        NoteStatus::Pending => "pending",
        NoteStatus::Correct => "correct",
        NoteStatus::Incorrect => "incorrect",
    };
    let heard = session.detected_label();
    let found = session.outcomes().iter().filter(|&&f| f).count();
    let line = format!(
        "target {:<3} heard {:<3} {:<9} score {}/{} ({}%)",
        target.to_string(),
        if heard.is_empty() { "-" } else { heard },
        status,
        found,
        session.outcomes().len(),
        session.accuracy_percent()
    );
    if line != *last_line {
        println!("{}", line);
        *last_line = line;
    }
}

/// Loads the settings file, if one exists.
fn load_settings(path: &str) -> Option<Settings> {
    let data = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&data) {
        Ok(settings) => {
            eprintln!("[MAIN] Loaded settings from {}", path);
            Some(settings)
        }
        Err(e) => {
            eprintln!("[MAIN] Ignoring unreadable settings file {}: {}", path, e);
            None
        }
    }
}

/// Saves the settings as pretty-printed JSON.
fn save_settings(settings: &Settings, path: &str) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    std::fs::write(path, json)
}

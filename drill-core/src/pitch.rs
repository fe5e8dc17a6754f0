//! # Pitch Estimation Module
//!
//! Converts a window of audio samples into a detected fundamental
//! frequency using normalized time-domain autocorrelation, computed
//! through the frequency domain for speed. The search is restricted
//! to the 80-800 Hz band the drill cares about.
//!
//! ## Features
//! - FFT-accelerated autocorrelation (O(n log n) per window)
//! - Amplitude gating to filter out silence
//! - Correlation floor to reject the noise floor
//! - Parabolic interpolation for sub-sample period accuracy

use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Lower edge of the period search range.
pub const MIN_FREQUENCY: f32 = 80.0;
/// Upper edge of the period search range.
pub const MAX_FREQUENCY: f32 = 800.0;
/// Default RMS level below which a window counts as silence.
pub const DEFAULT_AMPLITUDE_THRESHOLD: f32 = 0.01;

/// Minimum normalized correlation (r[lag] / r[0]) for a period to
/// count as a real pitch rather than noise.
const CORRELATION_THRESHOLD: f32 = 0.5;

/// Estimates the fundamental frequency of an audio window.
///
/// The candidate period range corresponds to 80-800 Hz
/// (`min_period = sample_rate / 800`, `max_period = sample_rate / 80`).
/// The period with the maximum autocorrelation wins; if its
/// normalized correlation stays below the noise floor the window is
/// reported as unpitched.
///
/// # Arguments
/// * `signal` - Input audio window
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude_threshold` - Minimum RMS amplitude for detection
///
/// # Returns
/// * `Some(frequency)` - Detected fundamental in Hz
/// * `None` - No pitch detected (silence, noise, or invalid signal)
pub fn estimate_pitch(
    signal: &[f32],
    sample_rate: u32,
    amplitude_threshold: f32,
) -> Option<f32> {
    let n = signal.len();
    if n < 4 {
        return None;
    }

    // Amplitude gate: skip the transform entirely for silent windows.
    let rms = (signal.iter().map(|&s| s * s).sum::<f32>() / n as f32).sqrt();
    if rms < amplitude_threshold {
        return None;
    }

    let min_period = (sample_rate as f32 / MAX_FREQUENCY) as usize;
    let max_period = ((sample_rate as f32 / MIN_FREQUENCY) as usize).min(n - 2);
    if min_period < 1 || min_period >= max_period {
        return None;
    }

    let correlation = autocorrelate(signal);
    let energy = correlation[0];
    if energy <= 0.0 {
        return None;
    }

    let mut best_period = min_period;
    let mut best_value = f32::MIN;
    for lag in min_period..=max_period {
        if correlation[lag] > best_value {
            best_value = correlation[lag];
            best_period = lag;
        }
    }

    if best_value / energy < CORRELATION_THRESHOLD {
        return None;
    }

    // Parabolic interpolation around the winning lag for sub-sample
    // period accuracy. Bounds are safe: min_period >= 1 and
    // max_period + 1 < correlation.len().
    let y1 = correlation[best_period - 1];
    let y2 = correlation[best_period];
    let y3 = correlation[best_period + 1];

    let denominator = y1 - 2.0 * y2 + y3;
    let period = if denominator.abs() > 1e-12 {
        let peak_shift = (y1 - y3) / (2.0 * denominator);
        best_period as f32 + peak_shift
    } else {
        best_period as f32
    };

    let frequency = sample_rate as f32 / period;
    if frequency.is_finite() && frequency > 20.0 {
        Some(frequency)
    } else {
        None
    }
}

/// Computes the autocorrelation of a signal via the Wiener-Khinchin
/// route: FFT of the zero-padded signal, power spectrum, inverse FFT.
///
/// The result carries the FFT library's scaling factor; callers only
/// ever use ratios `r[lag] / r[0]`, where the factor cancels.
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let n = signal.len();
    let padded = 2 * n;

    // Remove DC so a constant offset does not masquerade as energy.
    let mean = signal.iter().sum::<f32>() / n as f32;

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&s| Complex { re: s - mean, im: 0.0 })
        .chain(std::iter::repeat(Complex { re: 0.0, im: 0.0 }).take(padded - n))
        .collect();

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(padded).process(&mut buffer);

    for value in buffer.iter_mut() {
        *value = Complex { re: value.norm_sqr(), im: 0.0 };
    }

    planner.plan_fft_inverse(padded).process(&mut buffer);

    buffer.into_iter().take(n).map(|c| c.re).collect()
}

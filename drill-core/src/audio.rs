//! # Audio Capture Module
//!
//! Real-time microphone capture using CPAL. The capture callback
//! accumulates device buffers into fixed-size analysis frames and
//! streams them to the estimation loop over a channel.
//!
//! ## Features
//! - Default input device selection with f32 mono preference
//! - Fixed 2048-sample frames for the pitch estimator
//! - Backpressure-tolerant frame delivery (frames drop, never block)

use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::Sender;

use crate::error::DrillError;

/// Number of samples per analysis frame (~46 ms at 44.1 kHz).
pub const BUFFER_SIZE: usize = 2048;

/// Starts capture from the default input device.
///
/// Acquiring the microphone is the one permission-gated operation in
/// the engine; any failure is reported upward as
/// [`DrillError::MicrophoneUnavailable`] and never retried here. The
/// caller must not start a session when this fails.
///
/// # Arguments
/// * `sender` - Channel sender for streaming frames to the estimation loop
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Live stream handle and its sample rate
/// * `Err(DrillError::MicrophoneUnavailable)` - No device, no usable
///   format, or the stream could not be started
pub fn start_capture(sender: Sender<Vec<f32>>) -> Result<(cpal::Stream, u32), DrillError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| DrillError::MicrophoneUnavailable("no input device available".into()))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".into());
    eprintln!("[AUDIO] Using input device: {}", device_name);

    let configs = device
        .supported_input_configs()
        .map_err(|e| DrillError::MicrophoneUnavailable(e.to_string()))?
        .collect::<Vec<_>>();
    let supported = find_supported_config(configs, 44100)
        .ok_or_else(|| DrillError::MicrophoneUnavailable("no suitable f32 input format".into()))?;

    let rate = 44100.clamp(supported.min_sample_rate().0, supported.max_sample_rate().0);
    let config = supported.with_sample_rate(cpal::SampleRate(rate));
    let sample_rate = config.sample_rate().0;
    let config: cpal::StreamConfig = config.into();

    eprintln!("[AUDIO] Selected sample rate: {} Hz", sample_rate);

    let err_fn = |err| eprintln!("[AUDIO] An error occurred on the input stream: {}", err);

    // Accumulates callback data until a full analysis frame is ready.
    let mut frame_buffer = Vec::with_capacity(BUFFER_SIZE * 2);

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                frame_buffer.extend_from_slice(data);

                while frame_buffer.len() >= BUFFER_SIZE {
                    let frame = frame_buffer[..BUFFER_SIZE].to_vec();
                    // Drop the frame if the consumer is behind; the
                    // next one carries fresher audio anyway.
                    let _ = sender.try_send(frame);
                    frame_buffer.drain(..BUFFER_SIZE);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| DrillError::MicrophoneUnavailable(e.to_string()))?;

    stream
        .play()
        .map_err(|e| DrillError::MicrophoneUnavailable(e.to_string()))?;

    Ok((stream, sample_rate))
}

/// Finds the input configuration closest to the target sample rate,
/// preferring mono f32 formats.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i32 - target_rate as i32).abs();
            let max_diff = (c.max_sample_rate().0 as i32 - target_rate as i32).abs();
            min_diff.min(max_diff)
        })
}

//! Audio file utilities for captured symptom recordings
//!
//! Provides functions to save and inspect WAV files using the hound crate.

use crate::error::{AppError, Result};
use crate::ports::capture::{AudioBuffer, AudioFormat};
use hound::{WavReader, WavSpec, WavWriter};
use std::path::Path;

/// Save an audio buffer to a 16-bit PCM WAV file
///
/// # Returns
/// The number of samples written
pub fn save_wav_file<P: AsRef<Path>>(buffer: &AudioBuffer, path: P) -> Result<usize> {
    if buffer.format.channels == 0 || buffer.format.sample_rate == 0 {
        return Err(AppError::AudioCapture(format!(
            "Invalid audio format: {:?}",
            buffer.format
        )));
    }

    let spec = WavSpec {
        channels: buffer.format.channels,
        sample_rate: buffer.format.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec)
        .map_err(|e| AppError::AudioCapture(format!("Failed to create WAV file: {}", e)))?;

    let mut samples_written = 0;
    for &sample in &buffer.samples {
        // i16 spans -32768..=32767; the cast saturates +1.0 to 32767
        let clamped = sample.clamp(-1.0, 1.0);
        let i16_sample = (clamped * 32768.0) as i16;

        writer
            .write_sample(i16_sample)
            .map_err(|e| AppError::AudioCapture(format!("Failed to write sample: {}", e)))?;

        samples_written += 1;
    }

    writer
        .finalize()
        .map_err(|e| AppError::AudioCapture(format!("Failed to finalize WAV file: {}", e)))?;

    log::info!("Saved {} samples to WAV file", samples_written);
    Ok(samples_written)
}

/// Get the duration of an audio buffer in seconds
pub fn get_duration_seconds(buffer: &AudioBuffer) -> f64 {
    if buffer.format.channels == 0 || buffer.format.sample_rate == 0 {
        return 0.0;
    }
    let total_frames = buffer.samples.len() / buffer.format.channels as usize;
    total_frames as f64 / buffer.format.sample_rate as f64
}

/// Load a WAV file into a normalized f32 buffer
///
/// Integer samples of any width and 32-bit float samples are accepted.
pub fn read_wav_file<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path.as_ref())
        .map_err(|e| AppError::AudioCapture(format!("Failed to open WAV file: {}", e)))?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
        }
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>(),
    }
    .map_err(|e| AppError::AudioCapture(format!("Failed to read WAV samples: {}", e)))?;

    Ok(AudioBuffer {
        samples,
        format: AudioFormat {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            bits_per_sample: spec.bits_per_sample,
        },
    })
}

/// Read a WAV header and describe the recording, e.g. for log lines
pub fn describe_wav<P: AsRef<Path>>(path: P) -> Result<String> {
    let reader = WavReader::open(path.as_ref())
        .map_err(|e| AppError::AudioCapture(format!("Failed to open WAV file: {}", e)))?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(format!(
        "{:.2}s @ {}Hz, {} channel(s) ({})",
        frames as f64 / spec.sample_rate as f64,
        spec.sample_rate,
        spec.channels,
        path.as_ref().display()
    ))
}

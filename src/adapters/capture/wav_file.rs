//! Recorder backed by prerecorded WAV files
//!
//! The operator loads a file, then the usual start/stop cycle "captures" its contents.
//! Clones share state, so one handle can load files while another sits inside the kiosk.

use crate::error::{AppError, Result};
use crate::ports::capture::{AudioBuffer, AudioRecorderPort};
use crate::utils::audio_file;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Default)]
pub struct WavFileRecorder {
    is_capturing: Arc<Mutex<bool>>,
    source: Arc<Mutex<Option<PathBuf>>>,
}

impl WavFileRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the file handed over by the next `stop_capture`
    pub fn load(&self, path: impl Into<PathBuf>) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.into());
    }

    fn set_capturing(&self, capturing: bool) {
        *self.is_capturing.lock().unwrap_or_else(PoisonError::into_inner) = capturing;
    }
}

#[async_trait]
impl AudioRecorderPort for WavFileRecorder {
    async fn start_capture(&mut self) -> Result<()> {
        if self.is_capturing() {
            return Err(AppError::AudioCapture("Already capturing".to_string()));
        }
        if self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
        {
            return Err(AppError::AudioCapture("No input file loaded".to_string()));
        }

        self.set_capturing(true);
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<AudioBuffer> {
        if !self.is_capturing() {
            return Err(AppError::AudioCapture("Not capturing".to_string()));
        }
        self.set_capturing(false);

        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| AppError::AudioCapture("No input file loaded".to_string()))?;

        log::info!("Reading recording from {}", source.display());
        tokio::task::spawn_blocking(move || audio_file::read_wav_file(&source))
            .await
            .map_err(|e| AppError::AudioCapture(format!("WAV reader task failed: {}", e)))?
    }

    fn is_capturing(&self) -> bool {
        *self.is_capturing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::capture::AudioFormat;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_capture_returns_loaded_file() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("input.wav");
        let buffer = AudioBuffer {
            samples: vec![0.25; 800],
            format: AudioFormat {
                sample_rate: 8000,
                channels: 1,
                bits_per_sample: 16,
            },
        };
        audio_file::save_wav_file(&buffer, &input).unwrap();

        let handle = WavFileRecorder::new();
        let mut recorder = handle.clone();
        assert!(recorder.start_capture().await.is_err());

        handle.load(&input);
        recorder.start_capture().await.unwrap();
        assert!(handle.is_capturing());

        let captured = recorder.stop_capture().await.unwrap();
        assert_eq!(captured.samples.len(), 800);
        assert_eq!(captured.format.sample_rate, 8000);
        assert!(!recorder.is_capturing());

        // The file is consumed by the capture
        assert!(recorder.start_capture().await.is_err());
    }

    #[tokio::test]
    async fn test_stop_without_start_fails() {
        let mut recorder = WavFileRecorder::new();
        assert!(matches!(
            recorder.stop_capture().await,
            Err(AppError::AudioCapture(_))
        ));
    }
}

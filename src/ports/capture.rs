/// Capture port traits
///
/// Interfaces to the camera-based face sensor and the microphone recorder.
/// Both are thin hardware wrappers that live outside this crate.
use crate::error::Result;
use async_trait::async_trait;

/// Represents audio format specifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100, // Kiosk microphones record at CD rate
            channels: 1,        // Mono
            bits_per_sample: 16,
        }
    }
}

/// Audio buffer containing captured audio samples
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub format: AudioFormat,
}

/// Port trait for the face sensor
#[async_trait]
pub trait FaceSensorPort: Send {
    /// Sample one frame and report whether a face is in view
    async fn face_present(&mut self) -> Result<bool>;
}

/// Port trait for the microphone recorder
#[async_trait]
pub trait AudioRecorderPort: Send + Sync {
    /// Starts recording; returns immediately, audio is captured in background
    async fn start_capture(&mut self) -> Result<()>;

    /// Stops recording and hands over everything captured since `start_capture`
    async fn stop_capture(&mut self) -> Result<AudioBuffer>;

    /// Checks if currently recording
    fn is_capturing(&self) -> bool;
}

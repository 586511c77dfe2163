//! Capture adapters
//!
//! Operator-driven stand-ins for the camera and microphone, used by the console binary.

pub mod signal;
pub mod wav_file;

pub use signal::{face_signal, SignalFaceSensor};
pub use wav_file::WavFileRecorder;

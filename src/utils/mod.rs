//! Utility helpers for session artifacts
pub mod audio_file;
pub mod document;

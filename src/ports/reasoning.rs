/// Reasoning service port trait
///
/// The remote service that listens to the patient's recording and answers with a
/// structured clinical response.
/// Implementation: HTTP adapter
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Port trait for the remote reasoning service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReasoningServicePort: Send + Sync {
    /// Send a recorded audio file for the given session
    ///
    /// Returns the raw JSON body; interpretation is left to the caller. Transport
    /// failures, timeouts and non-success statuses are reported as `AppError::Transport`.
    async fn send_audio(&self, audio_path: &Path, session_id: &str) -> Result<serde_json::Value>;
}

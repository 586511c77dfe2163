//! Reasoning service HTTP adapter
//!
//! Implements the ReasoningServicePort by posting the recording as base64 inside a JSON
//! body and returning the JSON the service answers with.

use crate::error::{AppError, Result};
use crate::ports::reasoning::ReasoningServicePort;
use crate::utils::audio_file;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// HTTP reasoning service implementation
pub struct HttpReasoningService {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    audio: String,
    session_id: &'a str,
}

impl HttpReasoningService {
    /// Create a new client for the given endpoint with a bounded request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReasoningServicePort for HttpReasoningService {
    async fn send_audio(&self, audio_path: &Path, session_id: &str) -> Result<serde_json::Value> {
        let bytes = tokio::fs::read(audio_path).await?;

        match audio_file::describe_wav(audio_path) {
            Ok(info) => log::info!("Sending {} for session {}", info, session_id),
            Err(e) => log::warn!(
                "Sending non-WAV audio {} for session {}: {}",
                audio_path.display(),
                session_id,
                e
            ),
        }

        let request_body = AudioRequest {
            audio: BASE64.encode(&bytes),
            session_id,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Transport(format!("Request to {} timed out", self.endpoint))
                } else {
                    AppError::Transport(format!("Request to {} failed: {}", self.endpoint, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Transport(format!(
                "Reasoning service returned {}: {}",
                status, error_text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::Transport(format!("Failed to read response body: {}", e)))?;

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            AppError::MalformedResponse(format!("Response body is not JSON: {}", e))
        })?;

        log::info!("Reasoning service answered for session {}", session_id);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::capture::{AudioBuffer, AudioFormat};
    use serde_json::json;
    use tempfile::tempdir;

    fn write_sample_wav(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("audio.wav");
        let buffer = AudioBuffer {
            samples: vec![0.1; 800],
            format: AudioFormat {
                sample_rate: 8000,
                channels: 1,
                bits_per_sample: 16,
            },
        };
        audio_file::save_wav_file(&buffer, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_posts_base64_audio_and_session_id() {
        let dir = tempdir().unwrap();
        let audio = write_sample_wav(dir.path());
        let encoded = BASE64.encode(std::fs::read(&audio).unwrap());

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/triage")
            .match_body(mockito::Matcher::Json(json!({
                "audio": encoded,
                "session_id": "abc-123",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "in_progress", "message": "Tell me more"}"#)
            .create_async()
            .await;

        let service =
            HttpReasoningService::new(format!("{}/triage", server.url()), Duration::from_secs(5))
                .unwrap();
        let value = service.send_audio(&audio, "abc-123").await.unwrap();

        mock.assert_async().await;
        assert_eq!(value["status"], "in_progress");
        assert_eq!(value["message"], "Tell me more");
    }

    #[tokio::test]
    async fn test_error_status_is_transport_error() {
        let dir = tempdir().unwrap();
        let audio = write_sample_wav(dir.path());

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let service = HttpReasoningService::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = service.send_audio(&audio, "abc-123").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let dir = tempdir().unwrap();
        let audio = write_sample_wav(dir.path());

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let service = HttpReasoningService::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = service.send_audio(&audio, "abc-123").await.unwrap_err();
        assert!(matches!(err, AppError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let dir = tempdir().unwrap();
        let audio = write_sample_wav(dir.path());

        // Port 9 (discard) on localhost is not expected to accept HTTP
        let service =
            HttpReasoningService::new("http://127.0.0.1:9/triage", Duration::from_secs(2)).unwrap();
        let err = service.send_audio(&audio, "abc-123").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_missing_audio_file_is_io_error() {
        let service =
            HttpReasoningService::new("http://127.0.0.1:9/triage", Duration::from_secs(2)).unwrap();
        let err = service
            .send_audio(Path::new("/nonexistent/audio.wav"), "abc-123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}

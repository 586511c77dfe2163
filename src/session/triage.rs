//! Triage session
//!
//! Ephemeral per-encounter state plus the working directory that holds the encounter's
//! artifacts. The directory outlives the in-memory session.

use crate::domain::models::SessionState;
use crate::error::{AppError, Result};
use crate::utils::document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Latest raw reasoning service response
pub const SNAPSHOT_FILE: &str = "triage.json";

/// Rendered summary of a finished encounter
pub const DOCUMENT_FILE: &str = "triage.txt";

/// Where the kiosk recorder writes captured audio
pub const AUDIO_FILE: &str = "audio.wav";

/// Metadata bag of a session, as exposed to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub id: String,
    pub state: SessionState,
    pub audio_path: Option<PathBuf>,
    pub ai_response: Option<Value>,
}

#[derive(Debug)]
pub struct TriageSession {
    id: String,
    path: PathBuf,
    meta: Mutex<SessionMeta>,
}

impl TriageSession {
    /// Allocate the working directory for `id` under `data_dir`
    ///
    /// The directory is created non-recursively so an existing one is an
    /// `AlreadyExists` I/O error.
    pub(crate) fn create(data_dir: &Path, id: String) -> Result<Self> {
        fs::create_dir_all(data_dir)?;

        let path = data_dir.join(&id);
        fs::create_dir(&path)?;

        log::info!("Created triage session {} at {}", id, path.display());

        Ok(Self {
            meta: Mutex::new(SessionMeta {
                id: id.clone(),
                state: SessionState::Created,
                audio_path: None,
                ai_response: None,
            }),
            id,
            path,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's working directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Snapshot of the metadata bag
    pub fn meta(&self) -> SessionMeta {
        self.lock().clone()
    }

    pub fn audio_path(&self) -> Option<PathBuf> {
        self.lock().audio_path.clone()
    }

    pub fn ai_response(&self) -> Option<Value> {
        self.lock().ai_response.clone()
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.path.join(SNAPSHOT_FILE)
    }

    pub fn document_path(&self) -> PathBuf {
        self.path.join(DOCUMENT_FILE)
    }

    /// Default location for a new recording
    pub fn audio_target(&self) -> PathBuf {
        self.path.join(AUDIO_FILE)
    }

    /// Record a completed capture; starts a new round after a follow-up request
    pub fn record_audio(&self, audio_path: impl Into<PathBuf>) -> Result<()> {
        let mut meta = self.lock();
        match meta.state {
            SessionState::Created | SessionState::AudioCaptured | SessionState::PendingFollowup => {
                meta.audio_path = Some(audio_path.into());
                meta.state = SessionState::AudioCaptured;
                Ok(())
            }
            state => Err(AppError::InvalidState(format!(
                "session {} cannot accept audio while {}",
                self.id, state
            ))),
        }
    }

    /// Claim the session for one pipeline run and hand back the audio to send
    ///
    /// Only legal from `audio_captured`, so a session is never dispatched twice at once.
    pub fn begin_dispatch(&self) -> Result<PathBuf> {
        let mut meta = self.lock();
        match (meta.state, meta.audio_path.clone()) {
            (SessionState::AudioCaptured, Some(audio_path)) => {
                meta.state = SessionState::Dispatched;
                Ok(audio_path)
            }
            (state, _) => Err(AppError::InvalidState(format!(
                "session {} cannot be dispatched while {}",
                self.id, state
            ))),
        }
    }

    /// Return a dispatched session to `audio_captured` after a failed round
    pub fn abort_dispatch(&self) {
        let mut meta = self.lock();
        if meta.state == SessionState::Dispatched {
            meta.state = SessionState::AudioCaptured;
        }
    }

    /// Settle a dispatched session according to the reasoning service's status
    pub fn resolve(&self, finished: bool) -> Result<SessionState> {
        let mut meta = self.lock();
        if meta.state != SessionState::Dispatched {
            return Err(AppError::InvalidState(format!(
                "session {} was not dispatched (state {})",
                self.id, meta.state
            )));
        }
        meta.state = if finished {
            SessionState::Finished
        } else {
            SessionState::PendingFollowup
        };
        Ok(meta.state)
    }

    /// Write the raw response snapshot, replacing any previous one
    pub fn save_response(&self, response: &Value) -> Result<PathBuf> {
        let target = self.snapshot_path();
        let staging = self.path.join(format!("{}.tmp", SNAPSHOT_FILE));

        fs::write(&staging, serde_json::to_vec_pretty(response)?)?;
        fs::rename(&staging, &target)?;

        self.lock().ai_response = Some(response.clone());
        Ok(target)
    }

    /// Read the snapshot back from disk
    pub fn load_response(&self) -> Result<Value> {
        let raw = fs::read(self.snapshot_path())?;
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Render the summary document into the working directory
    pub fn save_document(&self, summary: &str) -> Result<PathBuf> {
        let target = self.document_path();
        let generated_at = chrono::Utc::now().to_rfc3339();
        document::write_summary(&target, &self.id, &generated_at, summary)?;
        Ok(target)
    }

    fn lock(&self) -> MutexGuard<'_, SessionMeta> {
        self.meta.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

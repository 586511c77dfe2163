//! Kiosk encounter driver
//!
//! Glue between the capture collaborators and the core: watches face presence for an
//! open encounter, starts and stops the recorder on operator command, and hands finished
//! recordings to the dispatch pipeline on a background task.

use crate::domain::models::SessionState;
use crate::error::{AppError, Result};
use crate::pipeline::{DispatchOutcome, DispatchPipeline};
use crate::ports::capture::{AudioRecorderPort, FaceSensorPort};
use crate::session::{TriageManager, TriageSession};
use crate::utils::audio_file;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Face presence as seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// No face seen yet
    Waiting,
    Present,
    /// Face lost, still within the tolerated absence
    Absent,
    /// Face lost for longer than the timeout
    TimedOut,
}

/// Turns sampled face-present booleans into a presence verdict
#[derive(Debug, Clone)]
pub struct PresenceMonitor {
    timeout: Duration,
    last_seen: Option<Instant>,
}

impl PresenceMonitor {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_seen: None,
        }
    }

    pub fn observe(&mut self, face_present: bool, now: Instant) -> Presence {
        if face_present {
            self.last_seen = Some(now);
            return Presence::Present;
        }
        match self.last_seen {
            None => Presence::Waiting,
            Some(seen) if now.saturating_duration_since(seen) > self.timeout => Presence::TimedOut,
            Some(_) => Presence::Absent,
        }
    }
}

/// Why presence supervision stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceExit {
    /// The face was gone too long and the session was abandoned
    Abandoned,
    /// The session left the registry on its own (finished or disposed elsewhere)
    SessionClosed,
}

pub struct Kiosk {
    pipeline: Arc<DispatchPipeline>,
    recorder: Arc<Mutex<Box<dyn AudioRecorderPort>>>,
    /// Session currently being recorded, if any
    recording: Arc<Mutex<Option<String>>>,
    face_timeout: Duration,
}

impl Kiosk {
    pub fn new(
        pipeline: Arc<DispatchPipeline>,
        recorder: Box<dyn AudioRecorderPort>,
        face_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            recorder: Arc::new(Mutex::new(recorder)),
            recording: Arc::new(Mutex::new(None)),
            face_timeout,
        }
    }

    pub fn manager(&self) -> &Arc<TriageManager> {
        self.pipeline.manager()
    }

    /// Open a new encounter
    pub fn new_encounter(&self) -> Result<Arc<TriageSession>> {
        self.manager().create_session()
    }

    fn session(&self, session_id: &str) -> Result<Arc<TriageSession>> {
        self.manager()
            .get_session(session_id)
            .ok_or_else(|| AppError::NotFound(format!("triage session {}", session_id)))
    }

    /// Start recording symptoms for a session
    pub async fn start_recording(&self, session_id: &str) -> Result<()> {
        let session = self.session(session_id)?;
        if matches!(
            session.state(),
            SessionState::Dispatched | SessionState::Finished
        ) {
            return Err(AppError::InvalidState(format!(
                "session {} cannot record while {}",
                session_id,
                session.state()
            )));
        }

        let mut recording = self.recording.lock().await;
        if let Some(current) = recording.as_ref() {
            return Err(AppError::InvalidState(format!(
                "already recording session {}",
                current
            )));
        }

        self.recorder.lock().await.start_capture().await?;
        *recording = Some(session_id.to_string());

        log::info!("Recording started for session {}", session_id);
        Ok(())
    }

    /// Stop recording, save the audio into the session directory and attach it
    pub async fn stop_recording(&self, session_id: &str) -> Result<PathBuf> {
        {
            let mut recording = self.recording.lock().await;
            if recording.as_deref() != Some(session_id) {
                return Err(AppError::InvalidState(format!(
                    "session {} is not being recorded",
                    session_id
                )));
            }
            *recording = None;
        }

        // Take the buffer and release the recorder before touching the disk
        let buffer = {
            let mut recorder = self.recorder.lock().await;
            recorder.stop_capture().await?
        };

        let session = self.session(session_id)?;
        let target = session.audio_target();
        log::info!(
            "Recording stopped for session {}: {:.2}s",
            session_id,
            audio_file::get_duration_seconds(&buffer)
        );

        let write_target = target.clone();
        tokio::task::spawn_blocking(move || audio_file::save_wav_file(&buffer, &write_target))
            .await
            .map_err(|e| AppError::AudioCapture(format!("WAV writer task failed: {}", e)))??;

        session.record_audio(&target)?;
        Ok(target)
    }

    /// Stop recording and run the dispatch pipeline in the background
    pub async fn stop_and_dispatch(
        &self,
        session_id: &str,
        doctor_id: Option<i64>,
    ) -> Result<JoinHandle<Result<DispatchOutcome>>> {
        self.stop_recording(session_id).await?;

        let pipeline = Arc::clone(&self.pipeline);
        let session_id = session_id.to_string();
        Ok(tokio::spawn(async move {
            pipeline.dispatch(&session_id, doctor_id).await
        }))
    }

    /// Watch the face sensor for one encounter until the face is gone too long
    ///
    /// On timeout any recording of the session is discarded and the session is retired
    /// from the registry; its directory stays on disk.
    pub async fn supervise_presence<S>(
        &self,
        sensor: &mut S,
        session_id: &str,
        poll_interval: Duration,
    ) -> Result<PresenceExit>
    where
        S: FaceSensorPort + ?Sized,
    {
        let mut monitor = PresenceMonitor::new(self.face_timeout);

        loop {
            if self.manager().get_session(session_id).is_none() {
                return Ok(PresenceExit::SessionClosed);
            }

            let present = sensor.face_present().await?;
            if monitor.observe(present, Instant::now()) == Presence::TimedOut {
                log::warn!("Face absent too long, abandoning session {}", session_id);
                self.discard_recording(session_id).await;
                self.manager().finish_session(session_id);
                return Ok(PresenceExit::Abandoned);
            }

            tokio::time::sleep(poll_interval).await;
        }
    }

    async fn discard_recording(&self, session_id: &str) {
        let mut recording = self.recording.lock().await;
        if recording.as_deref() != Some(session_id) {
            return;
        }
        *recording = None;
        if let Err(e) = self.recorder.lock().await.stop_capture().await {
            log::warn!("Failed to stop recorder for abandoned session {}: {}", session_id, e);
        }
    }

    pub async fn is_recording(&self) -> bool {
        self.recorder.lock().await.is_capturing()
    }
}

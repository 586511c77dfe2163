//! Dispatch pipeline
//!
//! Runs once per completed capture: send the recording, interpret the answer, snapshot it
//! into the session directory, and on a finished encounter persist the patient and triage
//! rows before retiring the session.

use crate::domain::models::{NewPatient, NewTriage, SessionState};
use crate::domain::response::{attach_document_path, PatientInfo, ReasoningResponse, TriageRecord};
use crate::error::{AppError, Result};
use crate::ports::reasoning::ReasoningServicePort;
use crate::ports::repository::{PatientRepository, TriageRepository};
use crate::session::{TriageManager, TriageSession};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Result of one successful pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The encounter is persisted and the session retired
    Finished {
        session_id: String,
        patient_id: i64,
        triage_id: i64,
        document_path: PathBuf,
        message: Option<String>,
    },
    /// The reasoning service wants another recording
    FollowUp {
        session_id: String,
        message: Option<String>,
    },
}

impl DispatchOutcome {
    pub fn message(&self) -> Option<&str> {
        match self {
            DispatchOutcome::Finished { message, .. } | DispatchOutcome::FollowUp { message, .. } => {
                message.as_deref()
            }
        }
    }
}

pub struct DispatchPipeline {
    manager: Arc<TriageManager>,
    reasoning: Arc<dyn ReasoningServicePort>,
    patients: Arc<dyn PatientRepository>,
    triages: Arc<dyn TriageRepository>,
}

impl DispatchPipeline {
    pub fn new(
        manager: Arc<TriageManager>,
        reasoning: Arc<dyn ReasoningServicePort>,
        patients: Arc<dyn PatientRepository>,
        triages: Arc<dyn TriageRepository>,
    ) -> Self {
        Self {
            manager,
            reasoning,
            patients,
            triages,
        }
    }

    pub fn manager(&self) -> &Arc<TriageManager> {
        &self.manager
    }

    /// Send the session's latest recording and act on the answer
    ///
    /// `doctor_id` is attached to the triage row if the encounter finishes; `None` leaves
    /// it unassigned. On any failure before the answer is interpreted, the session is left
    /// in `audio_captured` and storage is untouched.
    pub async fn dispatch(&self, session_id: &str, doctor_id: Option<i64>) -> Result<DispatchOutcome> {
        let session = self
            .manager
            .get_session(session_id)
            .ok_or_else(|| AppError::NotFound(format!("triage session {}", session_id)))?;

        let audio_path = session.begin_dispatch()?;
        log::info!(
            "Dispatching session {} with audio {}",
            session_id,
            audio_path.display()
        );

        let raw = match self.reasoning.send_audio(&audio_path, session.id()).await {
            Ok(raw) => raw,
            Err(e) => {
                session.abort_dispatch();
                log::warn!("Reasoning service call failed for session {}: {}", session_id, e);
                return Err(e);
            }
        };

        let response = match ReasoningResponse::from_value(&raw) {
            Ok(response) => response,
            Err(e) => {
                session.abort_dispatch();
                log::warn!(
                    "Discarding malformed response for session {}: {} ({})",
                    session_id,
                    e,
                    raw
                );
                return Err(e);
            }
        };

        // The snapshot is the recovery anchor and must land before any relational write
        if let Err(e) = session.save_response(&raw) {
            session.abort_dispatch();
            log::error!("Failed to snapshot response for session {}: {}", session_id, e);
            return Err(e);
        }

        if let Some(message) = &response.message {
            log::info!("Reasoning service says for session {}: {}", session_id, message);
        }

        let finished = response.is_finished();
        match response.record {
            Some(record) if finished => {
                session.resolve(true)?;
                self.persist_finished(&session, raw, &record, doctor_id, response.message)
                    .await
            }
            _ => {
                session.resolve(false)?;
                log::info!("Session {} awaits a follow-up recording", session_id);
                Ok(DispatchOutcome::FollowUp {
                    session_id: session_id.to_string(),
                    message: response.message,
                })
            }
        }
    }

    /// Retry the relational writes of a finished session from its on-disk snapshot
    pub async fn recover(&self, session_id: &str, doctor_id: Option<i64>) -> Result<DispatchOutcome> {
        let session = self
            .manager
            .get_session(session_id)
            .ok_or_else(|| AppError::NotFound(format!("triage session {}", session_id)))?;

        if session.state() != SessionState::Finished {
            return Err(AppError::InvalidState(format!(
                "session {} has nothing to recover (state {})",
                session_id,
                session.state()
            )));
        }

        let raw = session.load_response()?;
        let response = ReasoningResponse::from_value(&raw)?;
        let record = response
            .record
            .ok_or_else(|| AppError::MalformedResponse("snapshot has no record".to_string()))?;

        log::info!("Recovering persistence for session {}", session_id);
        self.persist_finished(&session, raw, &record, doctor_id, response.message)
            .await
    }

    async fn persist_finished(
        &self,
        session: &TriageSession,
        mut raw: Value,
        record: &TriageRecord,
        doctor_id: Option<i64>,
        message: Option<String>,
    ) -> Result<DispatchOutcome> {
        let session_id = session.id().to_string();

        let document_path = session
            .save_document(&record.summary)
            .map_err(|e| persistence(&session_id, "write summary document", e))?;

        let patient_id = self
            .resolve_patient(&record.patient)
            .await
            .map_err(|e| persistence(&session_id, "save patient", e))?;

        let triage = NewTriage {
            code: session_id.clone(),
            date: Some(chrono::Utc::now().to_rfc3339()),
            path: Some(session.path().to_string_lossy().to_string()),
            patient_id,
            main_doctor_id: doctor_id,
        };
        let triage_id = self
            .triages
            .create_triage(&triage)
            .await
            .map_err(|e| persistence(&session_id, "save triage", e))?;

        // The rows are committed; a failed re-save must not trigger another write round
        attach_document_path(&mut raw, &document_path.to_string_lossy());
        if let Err(e) = session.save_response(&raw) {
            log::error!(
                "Triage {} saved but snapshot update failed for session {}: {}",
                triage_id,
                session_id,
                e
            );
        }

        self.manager.finish_session(&session_id);
        log::info!(
            "Session {} finished: patient {}, triage {}",
            session_id,
            patient_id,
            triage_id
        );

        Ok(DispatchOutcome::Finished {
            session_id,
            patient_id,
            triage_id,
            document_path,
            message,
        })
    }

    /// Create the patient, or reuse the existing row holding the same national id
    async fn resolve_patient(&self, info: &PatientInfo) -> Result<i64> {
        let new_patient = NewPatient::new(info.name.clone(), info.cpf.clone())
            .with_date_of_birth(info.date_of_birth.clone());

        match self.patients.create_patient(&new_patient).await {
            Ok(id) => Ok(id),
            Err(e) if e.is_conflict() => {
                match self.patients.find_patient_by_cpf(&info.cpf).await? {
                    Some(existing) => {
                        log::info!("Reusing patient {} for national id {}", existing.id, info.cpf);
                        Ok(existing.id)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }
}

fn persistence(session_id: &str, step: &str, err: AppError) -> AppError {
    log::error!("Failed to {} for session {}: {}", step, session_id, err);
    AppError::Persistence(format!("failed to {}: {}", step, err))
}

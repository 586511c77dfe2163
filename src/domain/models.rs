/// Domain models for the triage kiosk
///
/// These models represent persisted entities and the lifecycle of an encounter.
use serde::{Deserialize, Serialize};

/// A registered doctor who may be attached to triage records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub cpf: String,         // National id number, unique across doctors
    pub crm: Option<String>, // License code
    pub created_at: i64,     // Unix timestamp
}

/// Fields required to register a doctor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub cpf: String,
    pub crm: Option<String>,
}

impl NewDoctor {
    pub fn new(name: impl Into<String>, cpf: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpf: cpf.into(),
            crm: None,
        }
    }

    /// Sets the license code (builder pattern)
    pub fn with_crm(mut self, crm: impl Into<String>) -> Self {
        self.crm = Some(crm.into());
        self
    }
}

/// Partial update of a doctor; absent fields are left untouched
///
/// Nullable columns take `Some(None)` to be cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub crm: Option<Option<String>>,
}

impl DoctorUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.cpf.is_none() && self.crm.is_none()
    }
}

/// A patient identified by the reasoning service or registered manually
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub cpf: String, // National id number, unique across patients
    pub date_of_birth: Option<String>,
    pub created_at: i64,
}

/// Fields required to register a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub cpf: String,
    pub date_of_birth: Option<String>,
}

impl NewPatient {
    pub fn new(name: impl Into<String>, cpf: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cpf: cpf.into(),
            date_of_birth: None,
        }
    }

    pub fn with_date_of_birth(mut self, date_of_birth: Option<String>) -> Self {
        self.date_of_birth = date_of_birth;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub cpf: Option<String>,
    pub date_of_birth: Option<Option<String>>,
}

impl PatientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.cpf.is_none() && self.date_of_birth.is_none()
    }
}

/// Durable summary of a finished encounter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Triage {
    pub id: i64,
    pub code: String,                // Identity of the originating session
    pub date: Option<String>,        // RFC 3339 encounter date
    pub path: Option<String>,        // Session artifact directory
    pub patient_id: i64,
    pub main_doctor_id: Option<i64>, // Cleared when the doctor is deleted
    pub created_at: i64,
}

/// Fields required to record a triage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTriage {
    pub code: String,
    pub date: Option<String>,
    pub path: Option<String>,
    pub patient_id: i64,
    pub main_doctor_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriageUpdate {
    pub code: Option<String>,
    pub date: Option<Option<String>>,
    pub path: Option<Option<String>>,
    pub patient_id: Option<i64>,
    pub main_doctor_id: Option<Option<i64>>, // Some(None) unassigns the doctor
}

impl TriageUpdate {
    pub fn is_empty(&self) -> bool {
        self.code.is_none()
            && self.date.is_none()
            && self.path.is_none()
            && self.patient_id.is_none()
            && self.main_doctor_id.is_none()
    }
}

/// Pagination for list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

/// Optional filters for listing triages; set filters are combined with AND
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriageFilter {
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

impl TriageFilter {
    pub fn by_patient(patient_id: i64) -> Self {
        Self {
            patient_id: Some(patient_id),
            doctor_id: None,
        }
    }

    pub fn by_doctor(doctor_id: i64) -> Self {
        Self {
            patient_id: None,
            doctor_id: Some(doctor_id),
        }
    }
}

/// Lifecycle of a triage session
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Directory allocated, no audio yet
    Created,
    /// An audio artifact has been recorded
    AudioCaptured,
    /// Sent to the reasoning service, awaiting reply
    Dispatched,
    /// The reasoning service asked for another capture round
    PendingFollowup,
    /// The reasoning service signaled completion
    Finished,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Created => write!(f, "created"),
            SessionState::AudioCaptured => write!(f, "audio_captured"),
            SessionState::Dispatched => write!(f, "dispatched"),
            SessionState::PendingFollowup => write!(f, "pending_followup"),
            SessionState::Finished => write!(f, "finished"),
        }
    }
}

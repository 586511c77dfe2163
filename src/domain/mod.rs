/// Domain layer - core business models
///
/// These models are storage-agnostic and represent core business entities.
pub mod models;
pub mod response;

pub use models::{
    Doctor, DoctorUpdate, NewDoctor, NewPatient, NewTriage, Page, Patient, PatientUpdate,
    SessionState, Triage, TriageFilter, TriageUpdate,
};
pub use response::{PatientInfo, ReasoningResponse, ResponseStatus, TriageRecord};

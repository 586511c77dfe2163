/// Repository port traits
///
/// Typed CRUD interfaces over the entity store. Every call is its own unit of work.
/// Implementation: SQLite adapter
use crate::domain::models::{
    Doctor, DoctorUpdate, NewDoctor, NewPatient, NewTriage, Page, Patient, PatientUpdate, Triage,
    TriageFilter, TriageUpdate,
};
use crate::error::Result;
use async_trait::async_trait;

/// Port trait for doctor storage
#[async_trait]
pub trait DoctorRepository: Send + Sync {
    /// Register a doctor; fails with `Conflict` when the national id is taken
    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<i64>;

    async fn get_doctor(&self, id: i64) -> Result<Option<Doctor>>;

    /// List doctors ordered by ascending id
    async fn list_doctors(&self, page: Page) -> Result<Vec<Doctor>>;

    /// Returns false if the doctor does not exist or no fields were supplied
    async fn update_doctor(&self, id: i64, update: &DoctorUpdate) -> Result<bool>;

    /// Delete a doctor; triages referencing it become unassigned
    async fn delete_doctor(&self, id: i64) -> Result<bool>;
}

/// Port trait for patient storage
#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Register a patient; fails with `Conflict` when the national id is taken
    async fn create_patient(&self, patient: &NewPatient) -> Result<i64>;

    async fn get_patient(&self, id: i64) -> Result<Option<Patient>>;

    /// Look a patient up by national id number
    async fn find_patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>>;

    /// List patients ordered by ascending id
    async fn list_patients(&self, page: Page) -> Result<Vec<Patient>>;

    async fn update_patient(&self, id: i64, update: &PatientUpdate) -> Result<bool>;

    /// Delete a patient and, by cascade, all of its triages
    async fn delete_patient(&self, id: i64) -> Result<bool>;
}

/// Port trait for triage record storage
#[async_trait]
pub trait TriageRepository: Send + Sync {
    /// Record a triage; the referenced patient must exist
    async fn create_triage(&self, triage: &NewTriage) -> Result<i64>;

    async fn get_triage(&self, id: i64) -> Result<Option<Triage>>;

    /// List triages ordered by ascending id, filtered by patient and/or doctor
    async fn list_triages(&self, page: Page, filter: TriageFilter) -> Result<Vec<Triage>>;

    async fn update_triage(&self, id: i64, update: &TriageUpdate) -> Result<bool>;

    async fn delete_triage(&self, id: i64) -> Result<bool>;
}

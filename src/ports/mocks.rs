//! Mock implementations for testing

use crate::domain::models::{
    Doctor, DoctorUpdate, NewDoctor, NewPatient, NewTriage, Page, Patient, PatientUpdate, Triage,
    TriageFilter, TriageUpdate,
};
use crate::error::{AppError, Result};
use crate::ports::capture::{AudioBuffer, AudioFormat, AudioRecorderPort, FaceSensorPort};
use crate::ports::repository::{DoctorRepository, PatientRepository, TriageRepository};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory entity store with the same constraint semantics as the SQLite adapter
#[derive(Clone, Default)]
pub struct MockStore {
    doctors: Arc<Mutex<BTreeMap<i64, Doctor>>>,
    patients: Arc<Mutex<BTreeMap<i64, Patient>>>,
    triages: Arc<Mutex<BTreeMap<i64, Triage>>>,
    next_id: Arc<Mutex<i64>>,
    fail_triage_writes: Arc<AtomicBool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create_triage` fail
    pub fn fail_triage_writes(&self, fail: bool) {
        self.fail_triage_writes.store(fail, Ordering::SeqCst);
    }

    pub fn triage_count(&self) -> usize {
        self.triages.lock().unwrap().len()
    }

    pub fn patient_count(&self) -> usize {
        self.patients.lock().unwrap().len()
    }

    fn next_id(&self) -> i64 {
        let mut id = self.next_id.lock().unwrap();
        *id += 1;
        *id
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

fn page_of<T: Clone>(rows: impl Iterator<Item = T>, page: Page) -> Vec<T> {
    rows.skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

#[async_trait]
impl DoctorRepository for MockStore {
    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<i64> {
        let mut doctors = self.doctors.lock().unwrap();
        if doctors.values().any(|d| d.cpf == doctor.cpf) {
            return Err(AppError::Conflict(format!("doctor cpf {}", doctor.cpf)));
        }
        let id = self.next_id();
        doctors.insert(
            id,
            Doctor {
                id,
                name: doctor.name.clone(),
                cpf: doctor.cpf.clone(),
                crm: doctor.crm.clone(),
                created_at: Self::now(),
            },
        );
        Ok(id)
    }

    async fn get_doctor(&self, id: i64) -> Result<Option<Doctor>> {
        Ok(self.doctors.lock().unwrap().get(&id).cloned())
    }

    async fn list_doctors(&self, page: Page) -> Result<Vec<Doctor>> {
        Ok(page_of(self.doctors.lock().unwrap().values().cloned(), page))
    }

    async fn update_doctor(&self, id: i64, update: &DoctorUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        let mut doctors = self.doctors.lock().unwrap();
        if let Some(cpf) = &update.cpf {
            if doctors.values().any(|d| d.id != id && &d.cpf == cpf) {
                return Err(AppError::Conflict(format!("doctor cpf {}", cpf)));
            }
        }
        match doctors.get_mut(&id) {
            Some(doctor) => {
                if let Some(name) = &update.name {
                    doctor.name = name.clone();
                }
                if let Some(cpf) = &update.cpf {
                    doctor.cpf = cpf.clone();
                }
                if let Some(crm) = &update.crm {
                    doctor.crm = crm.clone();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_doctor(&self, id: i64) -> Result<bool> {
        if self.doctors.lock().unwrap().remove(&id).is_none() {
            return Ok(false);
        }
        for triage in self.triages.lock().unwrap().values_mut() {
            if triage.main_doctor_id == Some(id) {
                triage.main_doctor_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl PatientRepository for MockStore {
    async fn create_patient(&self, patient: &NewPatient) -> Result<i64> {
        let mut patients = self.patients.lock().unwrap();
        if patients.values().any(|p| p.cpf == patient.cpf) {
            return Err(AppError::Conflict(format!("patient cpf {}", patient.cpf)));
        }
        let id = self.next_id();
        patients.insert(
            id,
            Patient {
                id,
                name: patient.name.clone(),
                cpf: patient.cpf.clone(),
                date_of_birth: patient.date_of_birth.clone(),
                created_at: Self::now(),
            },
        );
        Ok(id)
    }

    async fn get_patient(&self, id: i64) -> Result<Option<Patient>> {
        Ok(self.patients.lock().unwrap().get(&id).cloned())
    }

    async fn find_patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>> {
        Ok(self
            .patients
            .lock()
            .unwrap()
            .values()
            .find(|p| p.cpf == cpf)
            .cloned())
    }

    async fn list_patients(&self, page: Page) -> Result<Vec<Patient>> {
        Ok(page_of(self.patients.lock().unwrap().values().cloned(), page))
    }

    async fn update_patient(&self, id: i64, update: &PatientUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        let mut patients = self.patients.lock().unwrap();
        if let Some(cpf) = &update.cpf {
            if patients.values().any(|p| p.id != id && &p.cpf == cpf) {
                return Err(AppError::Conflict(format!("patient cpf {}", cpf)));
            }
        }
        match patients.get_mut(&id) {
            Some(patient) => {
                if let Some(name) = &update.name {
                    patient.name = name.clone();
                }
                if let Some(cpf) = &update.cpf {
                    patient.cpf = cpf.clone();
                }
                if let Some(dob) = &update.date_of_birth {
                    patient.date_of_birth = dob.clone();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_patient(&self, id: i64) -> Result<bool> {
        if self.patients.lock().unwrap().remove(&id).is_none() {
            return Ok(false);
        }
        self.triages
            .lock()
            .unwrap()
            .retain(|_, t| t.patient_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TriageRepository for MockStore {
    async fn create_triage(&self, triage: &NewTriage) -> Result<i64> {
        if self.fail_triage_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(rusqlite::Error::InvalidQuery));
        }
        if !self.patients.lock().unwrap().contains_key(&triage.patient_id) {
            return Err(AppError::InvalidInput(format!(
                "patient {} does not exist",
                triage.patient_id
            )));
        }
        let id = self.next_id();
        self.triages.lock().unwrap().insert(
            id,
            Triage {
                id,
                code: triage.code.clone(),
                date: triage.date.clone(),
                path: triage.path.clone(),
                patient_id: triage.patient_id,
                main_doctor_id: triage.main_doctor_id,
                created_at: Self::now(),
            },
        );
        Ok(id)
    }

    async fn get_triage(&self, id: i64) -> Result<Option<Triage>> {
        Ok(self.triages.lock().unwrap().get(&id).cloned())
    }

    async fn list_triages(&self, page: Page, filter: TriageFilter) -> Result<Vec<Triage>> {
        let triages = self.triages.lock().unwrap();
        let rows = triages
            .values()
            .filter(|t| filter.patient_id.map_or(true, |p| t.patient_id == p))
            .filter(|t| filter.doctor_id.map_or(true, |d| t.main_doctor_id == Some(d)))
            .cloned();
        Ok(page_of(rows, page))
    }

    async fn update_triage(&self, id: i64, update: &TriageUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        let mut triages = self.triages.lock().unwrap();
        match triages.get_mut(&id) {
            Some(triage) => {
                if let Some(code) = &update.code {
                    triage.code = code.clone();
                }
                if let Some(date) = &update.date {
                    triage.date = date.clone();
                }
                if let Some(path) = &update.path {
                    triage.path = path.clone();
                }
                if let Some(patient_id) = update.patient_id {
                    triage.patient_id = patient_id;
                }
                if let Some(doctor_id) = update.main_doctor_id {
                    triage.main_doctor_id = doctor_id;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_triage(&self, id: i64) -> Result<bool> {
        Ok(self.triages.lock().unwrap().remove(&id).is_some())
    }
}

/// Face sensor replaying a scripted sequence of samples, then reporting absence
pub struct ScriptedFaceSensor {
    samples: VecDeque<bool>,
}

impl ScriptedFaceSensor {
    pub fn new(samples: impl IntoIterator<Item = bool>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FaceSensorPort for ScriptedFaceSensor {
    async fn face_present(&mut self) -> Result<bool> {
        Ok(self.samples.pop_front().unwrap_or(false))
    }
}

/// Recorder that hands back a fixed tone buffer
#[derive(Default)]
pub struct MockRecorder {
    capturing: bool,
}

impl MockRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioRecorderPort for MockRecorder {
    async fn start_capture(&mut self) -> Result<()> {
        if self.capturing {
            return Err(AppError::AudioCapture("already recording".to_string()));
        }
        self.capturing = true;
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<AudioBuffer> {
        if !self.capturing {
            return Err(AppError::AudioCapture("not recording".to_string()));
        }
        self.capturing = false;
        Ok(AudioBuffer {
            samples: vec![0.25; 1600],
            format: AudioFormat {
                sample_rate: 16000,
                channels: 1,
                bits_per_sample: 16,
            },
        })
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_patient_cpf_conflict_on_update() {
        let store = MockStore::new();
        store
            .create_patient(&NewPatient::new("Maria", "222.222.222-22"))
            .await
            .unwrap();
        let joao = store
            .create_patient(&NewPatient::new("João", "333.333.333-33"))
            .await
            .unwrap();

        let update = PatientUpdate {
            cpf: Some("222.222.222-22".to_string()),
            ..Default::default()
        };
        assert!(store.update_patient(joao, &update).await.unwrap_err().is_conflict());
        assert_eq!(
            store.get_patient(joao).await.unwrap().unwrap().cpf,
            "333.333.333-33"
        );
    }

    #[tokio::test]
    async fn test_update_triage_unassigns_doctor() {
        let store = MockStore::new();
        let doctor = store
            .create_doctor(&NewDoctor::new("Dr. Ana", "111.111.111-11"))
            .await
            .unwrap();
        let patient = store
            .create_patient(&NewPatient::new("Maria", "222.222.222-22"))
            .await
            .unwrap();
        let triage = store
            .create_triage(&NewTriage {
                code: "session-a".to_string(),
                date: None,
                path: Some("data/session-a".to_string()),
                patient_id: patient,
                main_doctor_id: Some(doctor),
            })
            .await
            .unwrap();

        let unassign = TriageUpdate {
            main_doctor_id: Some(None),
            ..Default::default()
        };
        assert!(store.update_triage(triage, &unassign).await.unwrap());

        let row = store.get_triage(triage).await.unwrap().unwrap();
        assert_eq!(row.main_doctor_id, None);
        assert_eq!(row.path.as_deref(), Some("data/session-a"));
    }
}

/// SQLite storage adapter
///
/// Implements the doctor, patient and triage repositories over a single SQLite database.
/// Each call opens its own transaction and commits before returning.
use crate::domain::models::{
    Doctor, DoctorUpdate, NewDoctor, NewPatient, NewTriage, Page, Patient, PatientUpdate, Triage,
    TriageFilter, TriageUpdate,
};
use crate::error::{AppError, Result};
use crate::ports::repository::{DoctorRepository, PatientRepository, TriageRepository};
use async_trait::async_trait;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, ToSql, Transaction};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// SQLite storage implementation
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // Cascades and set-null on delete depend on this
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run database migrations
    pub fn run_migrations(&self) -> Result<()> {
        use rusqlite_migration::{Migrations, M};

        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../../migrations/001_initial.sql"
        ))]);

        let mut conn = self.conn();
        migrations.to_latest(&mut conn)?;
        log::info!("Database schema is up to date");

        Ok(())
    }

    // The connection holds no half-applied state once a transaction guard is dropped,
    // so a poisoned lock is still safe to reuse.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `SET` list of a partial update, one entry per supplied field
#[derive(Default)]
struct Assignments<'a> {
    columns: Vec<&'static str>,
    values: Vec<&'a dyn ToSql>,
}

impl<'a> Assignments<'a> {
    fn set(&mut self, column: &'static str, value: &'a dyn ToSql) {
        self.columns.push(column);
        self.values.push(value);
    }

    fn execute(mut self, tx: &Transaction<'_>, table: &str, id: &'a i64) -> Result<usize> {
        let set = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            set,
            self.columns.len() + 1
        );
        self.values.push(id);

        tx.execute(&sql, params_from_iter(self.values))
            .map_err(AppError::from_constraint)
    }
}

fn doctor_from_row(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        cpf: row.get(2)?,
        crm: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        cpf: row.get(2)?,
        date_of_birth: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn triage_from_row(row: &Row<'_>) -> rusqlite::Result<Triage> {
    Ok(Triage {
        id: row.get(0)?,
        code: row.get(1)?,
        date: row.get(2)?,
        path: row.get(3)?,
        patient_id: row.get(4)?,
        main_doctor_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[async_trait]
impl DoctorRepository for SqliteStore {
    async fn create_doctor(&self, doctor: &NewDoctor) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO doctors (name, cpf, crm, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![doctor.name, doctor.cpf, doctor.crm, now()],
        )
        .map_err(AppError::from_constraint)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("Created doctor {}", id);
        Ok(id)
    }

    async fn get_doctor(&self, id: i64) -> Result<Option<Doctor>> {
        let conn = self.conn();
        let doctor = conn
            .query_row(
                "SELECT id, name, cpf, crm, created_at FROM doctors WHERE id = ?1",
                params![id],
                doctor_from_row,
            )
            .optional()?;
        Ok(doctor)
    }

    async fn list_doctors(&self, page: Page) -> Result<Vec<Doctor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, cpf, crm, created_at
             FROM doctors ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![page.limit, page.offset], doctor_from_row)?;

        let mut doctors = Vec::new();
        for doctor_result in rows {
            doctors.push(doctor_result?);
        }

        Ok(doctors)
    }

    async fn update_doctor(&self, id: i64, update: &DoctorUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut set = Assignments::default();
        if let Some(name) = &update.name {
            set.set("name", name);
        }
        if let Some(cpf) = &update.cpf {
            set.set("cpf", cpf);
        }
        if let Some(crm) = &update.crm {
            set.set("crm", crm);
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let changed = set.execute(&tx, "doctors", &id)?;
        tx.commit()?;

        Ok(changed > 0)
    }

    async fn delete_doctor(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM doctors WHERE id = ?1", params![id])?;
        tx.commit()?;

        if deleted > 0 {
            log::info!("Deleted doctor {}", id);
        }
        Ok(deleted > 0)
    }
}

#[async_trait]
impl PatientRepository for SqliteStore {
    async fn create_patient(&self, patient: &NewPatient) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO patients (name, cpf, date_of_birth, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![patient.name, patient.cpf, patient.date_of_birth, now()],
        )
        .map_err(AppError::from_constraint)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("Created patient {}", id);
        Ok(id)
    }

    async fn get_patient(&self, id: i64) -> Result<Option<Patient>> {
        let conn = self.conn();
        let patient = conn
            .query_row(
                "SELECT id, name, cpf, date_of_birth, created_at FROM patients WHERE id = ?1",
                params![id],
                patient_from_row,
            )
            .optional()?;
        Ok(patient)
    }

    async fn find_patient_by_cpf(&self, cpf: &str) -> Result<Option<Patient>> {
        let conn = self.conn();
        let patient = conn
            .query_row(
                "SELECT id, name, cpf, date_of_birth, created_at FROM patients WHERE cpf = ?1",
                params![cpf],
                patient_from_row,
            )
            .optional()?;
        Ok(patient)
    }

    async fn list_patients(&self, page: Page) -> Result<Vec<Patient>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, name, cpf, date_of_birth, created_at
             FROM patients ORDER BY id LIMIT ?1 OFFSET ?2",
        )?;

        let rows = stmt.query_map(params![page.limit, page.offset], patient_from_row)?;

        let mut patients = Vec::new();
        for patient_result in rows {
            patients.push(patient_result?);
        }

        Ok(patients)
    }

    async fn update_patient(&self, id: i64, update: &PatientUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut set = Assignments::default();
        if let Some(name) = &update.name {
            set.set("name", name);
        }
        if let Some(cpf) = &update.cpf {
            set.set("cpf", cpf);
        }
        if let Some(date_of_birth) = &update.date_of_birth {
            set.set("date_of_birth", date_of_birth);
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let changed = set.execute(&tx, "patients", &id)?;
        tx.commit()?;

        Ok(changed > 0)
    }

    async fn delete_patient(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
        tx.commit()?;

        if deleted > 0 {
            log::info!("Deleted patient {} and its triages", id);
        }
        Ok(deleted > 0)
    }
}

#[async_trait]
impl TriageRepository for SqliteStore {
    async fn create_triage(&self, triage: &NewTriage) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO triages (code, date, path, patient_id, main_doctor_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                triage.code,
                triage.date,
                triage.path,
                triage.patient_id,
                triage.main_doctor_id,
                now(),
            ],
        )
        .map_err(AppError::from_constraint)?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        log::info!("Created triage {} for session {}", id, triage.code);
        Ok(id)
    }

    async fn get_triage(&self, id: i64) -> Result<Option<Triage>> {
        let conn = self.conn();
        let triage = conn
            .query_row(
                "SELECT id, code, date, path, patient_id, main_doctor_id, created_at
                 FROM triages WHERE id = ?1",
                params![id],
                triage_from_row,
            )
            .optional()?;
        Ok(triage)
    }

    async fn list_triages(&self, page: Page, filter: TriageFilter) -> Result<Vec<Triage>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, code, date, path, patient_id, main_doctor_id, created_at
             FROM triages
             WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR main_doctor_id = ?2)
             ORDER BY id LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(
            params![filter.patient_id, filter.doctor_id, page.limit, page.offset],
            triage_from_row,
        )?;

        let mut triages = Vec::new();
        for triage_result in rows {
            triages.push(triage_result?);
        }

        Ok(triages)
    }

    async fn update_triage(&self, id: i64, update: &TriageUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut set = Assignments::default();
        if let Some(code) = &update.code {
            set.set("code", code);
        }
        if let Some(date) = &update.date {
            set.set("date", date);
        }
        if let Some(path) = &update.path {
            set.set("path", path);
        }
        if let Some(patient_id) = &update.patient_id {
            set.set("patient_id", patient_id);
        }
        if let Some(main_doctor_id) = &update.main_doctor_id {
            set.set("main_doctor_id", main_doctor_id);
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let changed = set.execute(&tx, "triages", &id)?;
        tx.commit()?;

        Ok(changed > 0)
    }

    async fn delete_triage(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM triages WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }
}

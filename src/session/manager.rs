//! Triage manager
//!
//! Registry of live triage sessions, shared by the presence, capture and dispatch actors.
//! The registry lock is only ever held for map operations, never across I/O or awaits.

use crate::error::{AppError, Result};
use crate::session::triage::{SessionMeta, TriageSession};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Registry {
    sessions: HashMap<String, Arc<TriageSession>>,
    order: Vec<String>,
}

pub struct TriageManager {
    data_dir: PathBuf,
    registry: Mutex<Registry>,
}

impl TriageManager {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            registry: Mutex::new(Registry::default()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Allocate a new session with its working directory and register it
    ///
    /// # Panics
    /// If the generated identity is already registered or already owns a directory.
    pub fn create_session(&self) -> Result<Arc<TriageSession>> {
        self.create_session_with_id(uuid::Uuid::new_v4().to_string())
    }

    fn create_session_with_id(&self, id: String) -> Result<Arc<TriageSession>> {
        if self.lock().sessions.contains_key(&id) {
            panic!("triage session identity collision: {} is registered", id);
        }

        let session = match TriageSession::create(&self.data_dir, id.clone()) {
            Ok(session) => Arc::new(session),
            Err(AppError::Io(e)) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                panic!("triage session identity collision: {} has a directory", id)
            }
            Err(e) => return Err(e),
        };

        // The directory is ours, so nobody else can have registered the id meanwhile
        let mut registry = self.lock();
        registry.sessions.insert(id.clone(), Arc::clone(&session));
        registry.order.push(id);

        Ok(session)
    }

    /// Registered sessions with a metadata snapshot, in registration order
    pub fn list_sessions(&self) -> Vec<(String, SessionMeta)> {
        let registry = self.lock();
        registry
            .order
            .iter()
            .filter_map(|id| registry.sessions.get(id))
            .map(|session| (session.id().to_string(), session.meta()))
            .collect()
    }

    pub fn get_session(&self, session_id: &str) -> Option<Arc<TriageSession>> {
        self.lock().sessions.get(session_id).cloned()
    }

    /// Remove a session from the registry; on-disk artifacts are kept
    ///
    /// Returns whether the session was registered. Calling it again is harmless.
    pub fn finish_session(&self, session_id: &str) -> bool {
        let mut registry = self.lock();
        if registry.sessions.remove(session_id).is_none() {
            return false;
        }
        registry.order.retain(|id| id != session_id);
        log::info!("Retired triage session {}", session_id);
        true
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

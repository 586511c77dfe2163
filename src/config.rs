//! Process configuration
//!
//! Values come from the environment, optionally seeded from a `.env` file.

use crate::error::{AppError, Result};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "database.db";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_FACE_TIMEOUT_SECS: u64 = 10;

/// Kiosk configuration, built once per process and passed to the components that need it
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database file
    pub db_path: PathBuf,
    /// Parent directory of every session working directory
    pub data_dir: PathBuf,
    /// Reasoning service URL, if configured
    pub reasoning_endpoint: Option<String>,
    /// Bounded wait for one reasoning service call
    pub request_timeout: Duration,
    /// Face absence tolerated before an encounter is abandoned
    pub face_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            reasoning_endpoint: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            face_timeout: Duration::from_secs(DEFAULT_FACE_TIMEOUT_SECS),
        }
    }
}

impl AppConfig {
    /// Load configuration from `.env` (if present) and the process environment
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(AppError::Config(format!("Failed to read .env file: {}", e)));
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("TRIAGE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);
        let data_dir = lookup("TRIAGE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let reasoning_endpoint = lookup("TRIAGE_REASONING_ENDPOINT").filter(|s| !s.trim().is_empty());

        let request_timeout = match lookup("TRIAGE_REQUEST_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("TRIAGE_REQUEST_TIMEOUT_SECS", &raw)?),
            None => defaults.request_timeout,
        };
        let face_timeout = match lookup("TRIAGE_FACE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_secs("TRIAGE_FACE_TIMEOUT_SECS", &raw)?),
            None => defaults.face_timeout,
        };

        Ok(Self {
            db_path,
            data_dir,
            reasoning_endpoint,
            request_timeout,
            face_timeout,
        })
    }

    /// The reasoning service URL, failing if it was never configured
    pub fn require_endpoint(&self) -> Result<&str> {
        self.reasoning_endpoint
            .as_deref()
            .ok_or_else(|| AppError::Config("TRIAGE_REASONING_ENDPOINT is not set".to_string()))
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(AppError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            key, raw
        ))),
    }
}

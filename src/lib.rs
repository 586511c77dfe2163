//! Triage kiosk core
//!
//! Session orchestration and persistence for a voice-driven triage kiosk: the session
//! state machine and registry, the dispatch pipeline that talks to the reasoning service,
//! and the SQLite-backed doctor, patient and triage repositories.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod kiosk;
pub mod pipeline;
pub mod ports;
pub mod session;
pub mod utils;

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use pipeline::{DispatchOutcome, DispatchPipeline};
pub use session::{SessionMeta, TriageManager, TriageSession};

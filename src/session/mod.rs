/// Session layer - in-memory encounter state and its registry
pub mod manager;
pub mod triage;

pub use manager::TriageManager;
pub use triage::{SessionMeta, TriageSession};

/// Adapters - concrete implementations of the port traits
///
/// These modules implement the port traits for specific storage engines and services.
pub mod capture;
pub mod services;
pub mod storage;

pub use capture::{SignalFaceSensor, WavFileRecorder};
pub use services::HttpReasoningService;
pub use storage::SqliteStore;

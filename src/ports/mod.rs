/// Port trait definitions (interfaces)
///
/// These traits define the contracts for adapters to implement.
/// Following the ports-and-adapters (hexagonal) architecture pattern.
pub mod capture;
pub mod reasoning;
pub mod repository;

#[cfg(test)]
pub mod mocks;

pub use capture::{AudioBuffer, AudioFormat, AudioRecorderPort, FaceSensorPort};
pub use reasoning::ReasoningServicePort;
pub use repository::{DoctorRepository, PatientRepository, TriageRepository};

/// Dispatch pipeline - from completed recording to persisted triage
pub mod dispatch;

pub use dispatch::{DispatchOutcome, DispatchPipeline};

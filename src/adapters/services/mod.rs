/// External service adapters
pub mod reasoning;

pub use reasoning::HttpReasoningService;

/// Error types for the triage kiosk
///
/// Uses thiserror for ergonomic error handling with proper Display implementations.
use rusqlite::ffi;
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// A unique national id number is already taken
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The reasoning service could not be reached or answered with a failure status
    #[error("Reasoning service transport error: {0}")]
    Transport(String),

    /// The reasoning service answered with a shape the pipeline cannot interpret
    #[error("Malformed reasoning service response: {0}")]
    MalformedResponse(String),

    /// A relational write failed after the reasoning service answered
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid session state: {0}")]
    InvalidState(String),

    #[error("Audio capture error: {0}")]
    AudioCapture(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Reclassify SQLite constraint violations into the conflict / invalid-input taxonomy
    pub fn from_constraint(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, ref message) = err {
            let detail = message.clone().unwrap_or_else(|| failure.to_string());
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return AppError::Conflict(detail);
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return AppError::InvalidInput(format!("Referenced row does not exist: {}", detail));
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, AppError::Conflict(_))
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

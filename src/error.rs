//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to load data: {0}")]
    DataLoad(String),

    #[error("Failed to persist questions: {0}")]
    Persistence(String),

    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Timed out after {seconds}s: {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Summarizer error: {0}")]
    Summarizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SvarError {
    /// Whether this error must abort startup rather than fail a single query.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            SvarError::DataLoad(_) | SvarError::Persistence(_) | SvarError::ModelUnavailable(_)
        )
    }
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;

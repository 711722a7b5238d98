//! Error types for the powr_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for powr_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// SQLite storage error; the surrounding transaction has been rolled back
    #[error("Storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed event or missing required field
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation not allowed in the current session state, or bad index
    #[error("Session error: {0}")]
    Session(String),

    /// Publication to the decentralized network failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity,
            id: id.into(),
        }
    }
}

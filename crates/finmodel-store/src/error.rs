//! Error types for storage operations.

use finmodel_curate::CurateError;
use finmodel_model::ModelError;
use thiserror::Error;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while reading or writing the database.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored value could not be decoded
    #[error("Data parsing error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A thread panicked while holding the connection
    #[error("Database connection lock poisoned")]
    LockPoisoned,
}

impl From<StoreError> for CurateError {
    fn from(err: StoreError) -> Self {
        Self::storage(err)
    }
}

impl From<StoreError> for ModelError {
    fn from(err: StoreError) -> Self {
        Self::storage(err)
    }
}

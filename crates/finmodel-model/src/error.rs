//! Error types for model construction.

use crate::timeline::Granularity;
use finmodel_curate::CurateError;
use thiserror::Error;

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while building or persisting a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Timeline granularity not supported
    #[error("Unsupported timeline granularity: {0}")]
    UnsupportedGranularity(Granularity),

    /// Timeline parameters out of range
    #[error("Invalid timeline: {0}")]
    InvalidTimeline(String),

    /// Entity is not registered
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// No mapped facts exist for the historical periods
    #[error("No curated facts for {entity_id} in fiscal years {first_year}..={last_year}")]
    NoCuratedFacts {
        /// Entity that was queried
        entity_id: String,
        /// First historical year
        first_year: i32,
        /// Last historical year
        last_year: i32,
    },

    /// Snapshot id is unknown
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    /// Stored snapshot could not be reconstructed
    #[error("Corrupt snapshot {id}: {reason}")]
    CorruptSnapshot {
        /// Snapshot id
        id: String,
        /// What was wrong
        reason: String,
    },

    /// Curated fact access failed
    #[error("Curated fact error: {0}")]
    Curate(#[from] CurateError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    /// Wrap any storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

//! Error types for curation operations.

use thiserror::Error;

/// Result type for curation operations.
pub type Result<T> = std::result::Result<T, CurateError>;

/// Errors that can occur while normalizing, mapping or persisting filing rows.
#[derive(Debug, Error)]
pub enum CurateError {
    /// Fiscal year is not a valid integer year
    #[error("Invalid fiscal year: {0:?}")]
    InvalidFiscalYear(String),

    /// Mapping rule rejected before it reached the rule store
    #[error("Invalid mapping rule: {0}")]
    InvalidRule(String),

    /// Raw rows could not be fetched from the ingestion source
    #[error("Raw row source error: {0}")]
    Source(String),

    /// Underlying storage failure
    #[error("Storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CurateError {
    /// Wrap any storage error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CurateError::InvalidFiscalYear("20x4".to_string());
        assert_eq!(err.to_string(), "Invalid fiscal year: \"20x4\"");

        let err = CurateError::storage(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "Storage error: disk full");
    }
}

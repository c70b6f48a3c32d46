//! Pipeline configuration.

use finmodel_curate::{MapperConfig, TransformOptions};
use finmodel_model::BuilderConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Path of the file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid configuration JSON
    #[error("Invalid config {path}: {source}")]
    Parse {
        /// Path of the file
        path: String,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Settings for every pipeline stage. Missing sections take their defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Account mapper settings
    pub mapper: MapperConfig,
    /// Transform job settings
    pub transform: TransformOptions,
    /// Model builder settings
    pub builder: BuilderConfig,
}

impl PipelineConfig {
    /// Parse configuration JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Load configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        let config = Self::from_json(&json).map_err(|source| ConfigError::Parse { path: display, source })?;
        tracing::debug!(path = %path.display(), "Loaded pipeline config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use finmodel_curate::ConsolidationScope;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.mapper.cache_ttl_secs, 300);
        assert_relative_eq!(config.mapper.regex_confidence_factor, 0.9);
        assert_eq!(config.transform.coverage_top_n, 10);
        assert!(config.transform.normalize.prefer_period_flow);
        assert_eq!(config.builder.tolerance, dec!(1));
        assert_eq!(config.builder.unit, "KRW");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{
                "mapper": { "cache_ttl_secs": 60 },
                "transform": { "normalize": { "prefer_period_flow": false } },
                "builder": { "scope": "SEPARATE", "tolerance": "0.5" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.mapper.cache_ttl_secs, 60);
        assert_relative_eq!(config.mapper.regex_confidence_factor, 0.9);
        assert!(!config.transform.normalize.prefer_period_flow);
        assert_eq!(config.transform.normalize.source_priority, 10);
        assert_eq!(config.builder.scope, ConsolidationScope::Separate);
        assert_eq!(config.builder.tolerance, dec!(0.5));
        assert_eq!(config.builder.unit, "KRW");
    }

    #[test]
    fn test_missing_file() {
        let err = PipelineConfig::load("/nonexistent/finmodel.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

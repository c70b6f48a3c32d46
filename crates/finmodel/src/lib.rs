#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finmodel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
pub mod seed;

// Re-export main types from sub-crates
pub use finmodel_curate as curate;
pub use finmodel_model as model;
pub use finmodel_store as store;

pub use config::{ConfigError, PipelineConfig};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

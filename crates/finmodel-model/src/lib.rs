#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finmodel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod chart;
pub mod checks;
pub mod error;
pub mod loader;
pub mod snapshot;
pub mod statement;
pub mod timeline;

#[cfg(test)]
mod testing;

pub use builder::{BuilderConfig, ENGINE_VERSION, ModelBuilder, ModelRequest, build_statement, snapshot_hash};
pub use chart::{ModelStatement, StandardLine, display_name, find_line, ids, statement_of};
pub use checks::{CheckResult, ModelChecks, run_checks};
pub use error::{ModelError, Result};
pub use loader::{HistoricalCoverage, HistoricalFacts, HistoricalLoader};
pub use snapshot::{
    ModelSnapshot, OutputLine, SaveResult, SnapshotHeader, SnapshotMetadata, SnapshotStore, explode, header,
    load_snapshot, save_snapshot,
};
pub use statement::{Provenance, Statement, StatementLine};
pub use timeline::{
    Granularity, ModelTimeline, Period, PeriodRange, TimelineSpec, build_timeline, format_period_label,
};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

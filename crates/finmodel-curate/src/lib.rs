#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/finmodel/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod amount;
pub mod coverage;
pub mod error;
pub mod fact;
pub mod mapper;
pub mod normalizer;
pub mod period;
pub mod raw;
pub mod selector;
pub mod source;
pub mod transform;

#[cfg(test)]
mod testing;

pub use amount::{ParsedAmount, parse_amount};
pub use coverage::{
    CoverageReport, CoverageTracker, StatementCoverage, UnmappedAccount, generate_coverage_report,
};
pub use error::{CurateError, Result};
pub use fact::{CuratedFact, EntityRecord, UpsertOutcome, identity_key};
pub use mapper::{
    AccountMapper, AccountRef, BatchMapping, Clock, MapperConfig, MappingResult, MappingRule, MatchMethod,
    NewMappingRule, SystemClock,
};
pub use normalizer::{
    ConsolidationScope, NormalizeOptions, NormalizedRow, entity_id_for, normalize_currency,
    normalize_row,
};
pub use period::{NormalizedPeriod, PeriodDates, PeriodKind, ReportCode, resolve_period};
pub use raw::{RawFilingRow, RawRowQuery, StatementCategory};
pub use selector::{SelectedAmount, select_amount};
pub use source::{EntityDirectory, FactFilter, FactQuery, FactSink, RawRowSource, RuleStore};
pub use transform::{BatchJob, BatchSummary, JobResult, TransformJob, TransformOptions, Transformer};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Storage seams of the curation pipeline.
//!
//! Every trait is `Send + Sync` so one store can back concurrent jobs.

use crate::error::Result;
use crate::fact::{CuratedFact, EntityRecord, UpsertOutcome};
use crate::mapper::{MappingRule, NewMappingRule};
use crate::normalizer::ConsolidationScope;
use crate::period::PeriodKind;
use crate::raw::{RawFilingRow, RawRowQuery};

/// Supplies raw filing rows.
pub trait RawRowSource: Send + Sync {
    /// Rows matching a query, in ingestion order.
    fn fetch_raw_rows(&self, query: &RawRowQuery) -> Result<Vec<RawFilingRow>>;
}

/// Persists mapping rules.
pub trait RuleStore: Send + Sync {
    /// All rules, ordered by priority ascending then confidence descending.
    fn load_rules(&self) -> Result<Vec<MappingRule>>;

    /// Store a new rule, returning it with its assigned id.
    fn insert_rule(&self, rule: NewMappingRule) -> Result<MappingRule>;
}

/// Receives curated facts.
pub trait FactSink: Send + Sync {
    /// Create the entity record if it does not exist.
    fn ensure_entity(&self, entity: &EntityRecord) -> Result<()>;

    /// Insert or update a fact by its identity key.
    fn upsert_fact(&self, fact: &CuratedFact) -> Result<UpsertOutcome>;
}

/// Selection of mapped facts for model building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactFilter {
    /// Entity id
    pub entity_id: String,
    /// Fiscal years to include
    pub fiscal_years: Vec<i32>,
    /// Period kind
    pub period_kind: PeriodKind,
    /// Consolidation scope
    pub scope: ConsolidationScope,
}

/// Reads mapped facts back.
pub trait FactQuery: Send + Sync {
    /// Mapped facts matching the filter, ordered by fiscal year then ordinal.
    fn mapped_facts(&self, filter: &FactFilter) -> Result<Vec<CuratedFact>>;
}

/// Entity lookups.
pub trait EntityDirectory: Send + Sync {
    /// Is the entity registered?
    fn entity_exists(&self, entity_id: &str) -> Result<bool>;
}

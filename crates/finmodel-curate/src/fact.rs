//! Curated facts and their identity keys.

use crate::mapper::{MappingResult, MatchMethod};
use crate::normalizer::{ConsolidationScope, NormalizedRow, entity_id_for};
use serde::{Deserialize, Serialize};

/// A normalized row with its resolved standard line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedFact {
    /// Deterministic identity key, see [`identity_key`]
    pub id: String,
    /// Normalized source row
    #[serde(flatten)]
    pub row: NormalizedRow,
    /// Standard line id; `None` when unmapped
    pub standard_line_id: Option<String>,
    /// How the line was resolved
    pub match_method: MatchMethod,
    /// Effective mapping confidence
    pub confidence: f64,
}

impl CuratedFact {
    /// Build a fact from a normalized row and its mapping.
    pub fn new(row: NormalizedRow, mapping: &MappingResult) -> Self {
        Self {
            id: identity_key(&row),
            standard_line_id: mapping.standard_line_id.clone(),
            match_method: mapping.method,
            confidence: mapping.confidence,
            row,
        }
    }

    /// Does the fact resolve to a standard line?
    pub const fn is_mapped(&self) -> bool {
        self.standard_line_id.is_some()
    }
}

/// Deterministic identity key of a normalized row.
///
/// `{entity}:{kind}:{year}:{quarter|null}:{report}:{scope}:{statement}:{name}`
/// where every character of the account name outside `[A-Za-z0-9가-힣]` is
/// replaced with `_`.
pub fn identity_key(row: &NormalizedRow) -> String {
    let quarter = row.period.fiscal_quarter.map_or_else(|| "null".to_string(), |q| q.to_string());
    format!(
        "{}:{}:{}:{}:{}:{}:{}:{}",
        row.entity_id,
        row.period.kind,
        row.period.fiscal_year,
        quarter,
        row.report_code,
        row.scope,
        row.statement,
        sanitize_account_name(&row.account_name)
    )
}

fn sanitize_account_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || ('가'..='힣').contains(&c) { c } else { '_' })
        .collect()
}

/// Outcome of an idempotent fact upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No fact with the key existed
    Inserted,
    /// An existing fact had different content
    Updated,
    /// The stored fact already matched
    Unchanged,
}

impl UpsertOutcome {
    /// Stored content was created or changed.
    pub const fn is_change(&self) -> bool {
        matches!(self, Self::Inserted | Self::Updated)
    }
}

/// A reporting entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id (`entity-{corp_code}`)
    pub id: String,
    /// Regulator company code
    pub corp_code: String,
    /// Listed stock code
    pub stock_code: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Scope used when none is requested
    pub default_scope: ConsolidationScope,
}

impl EntityRecord {
    /// Entity for a company code with no display name.
    pub fn for_company(corp_code: &str, stock_code: Option<String>) -> Self {
        Self {
            id: entity_id_for(corp_code),
            corp_code: corp_code.to_string(),
            stock_code,
            name: None,
            default_scope: ConsolidationScope::default(),
        }
    }
}

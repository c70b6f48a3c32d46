//! Projection of mapped curated facts onto historical periods.

use crate::chart::statement_of;
use crate::error::Result;
use crate::timeline::Period;
use finmodel_curate::{ConsolidationScope, FactFilter, FactQuery, PeriodKind};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Historical values keyed by line id, then period index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoricalFacts {
    lines: BTreeMap<String, BTreeMap<usize, Decimal>>,
    source_reports: BTreeSet<String>,
}

/// Line counts of loaded historical facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoricalCoverage {
    /// Distinct lines with at least one value
    pub total_lines: usize,
    /// Lines per statement code (`IS`, `BS`, `CF`, or the raw prefix)
    pub by_statement: BTreeMap<String, usize>,
    /// Lines with a value, per historical period index
    pub by_period: BTreeMap<usize, usize>,
}

impl HistoricalFacts {
    /// Value of a line at a period index.
    pub fn value(&self, line_id: &str, index: usize) -> Option<Decimal> {
        self.lines.get(line_id).and_then(|values| values.get(&index)).copied()
    }

    /// Does the line have any value?
    pub fn has_line(&self, line_id: &str) -> bool {
        self.lines.get(line_id).is_some_and(|values| !values.is_empty())
    }

    /// Loaded line ids, sorted.
    pub fn line_ids(&self) -> impl Iterator<Item = &str> {
        self.lines.keys().map(String::as_str)
    }

    /// Number of distinct lines loaded.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Receipt numbers of the filings the values came from, sorted.
    pub fn source_reports(&self) -> impl Iterator<Item = &str> {
        self.source_reports.iter().map(String::as_str)
    }

    /// Record a value; a later value for the same line and index replaces the earlier one.
    pub fn insert(&mut self, line_id: impl Into<String>, index: usize, value: Decimal) {
        self.lines.entry(line_id.into()).or_default().insert(index, value);
    }

    /// Line counts per statement and per historical period.
    pub fn coverage_summary(&self, periods: &[Period]) -> HistoricalCoverage {
        let mut summary = HistoricalCoverage {
            total_lines: self.lines.len(),
            by_period: periods.iter().filter(|p| p.is_historical).map(|p| (p.index, 0)).collect(),
            ..Default::default()
        };
        for (line_id, values) in &self.lines {
            let statement = statement_of(line_id).map_or_else(
                || line_id.split('.').next().unwrap_or(line_id).to_string(),
                |s| s.code().to_string(),
            );
            *summary.by_statement.entry(statement).or_default() += 1;
            for index in values.keys() {
                *summary.by_period.entry(*index).or_default() += 1;
            }
        }
        summary
    }
}

/// Loads historical values for an entity.
#[derive(Debug)]
pub struct HistoricalLoader<'a, Q: ?Sized> {
    facts: &'a Q,
    scope: ConsolidationScope,
}

impl<'a, Q: FactQuery + ?Sized> HistoricalLoader<'a, Q> {
    /// Loader reading facts of one consolidation scope.
    pub const fn new(facts: &'a Q, scope: ConsolidationScope) -> Self {
        Self { facts, scope }
    }

    /// Load mapped annual facts for the historical periods.
    ///
    /// Facts arrive ordered by fiscal year then ordinal; when several facts
    /// map to the same line and year, the last one wins.
    pub fn load(&self, entity_id: &str, periods: &[Period]) -> Result<HistoricalFacts> {
        let index_by_year: HashMap<i32, usize> = periods
            .iter()
            .filter(|p| p.is_historical && p.kind == PeriodKind::Annual)
            .map(|p| (p.fiscal_year, p.index))
            .collect();

        if index_by_year.is_empty() {
            tracing::warn!(entity_id, "No historical periods to load");
            return Ok(HistoricalFacts::default());
        }

        let mut fiscal_years: Vec<i32> = index_by_year.keys().copied().collect();
        fiscal_years.sort_unstable();
        let filter = FactFilter {
            entity_id: entity_id.to_string(),
            fiscal_years,
            period_kind: PeriodKind::Annual,
            scope: self.scope,
        };
        let facts = self.facts.mapped_facts(&filter)?;
        tracing::debug!(entity_id, facts = facts.len(), "Fetched curated facts");

        let mut loaded = HistoricalFacts::default();
        for fact in facts {
            let (Some(line_id), Some(index)) =
                (fact.standard_line_id, index_by_year.get(&fact.row.period.fiscal_year))
            else {
                continue;
            };
            loaded.insert(line_id, *index, fact.row.amount);
            if let Some(report) = fact.row.report_ref {
                loaded.source_reports.insert(report);
            }
        }

        tracing::debug!(entity_id, lines = loaded.len(), "Loaded historical lines");
        Ok(loaded)
    }
}

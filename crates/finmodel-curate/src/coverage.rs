//! Mapping coverage statistics.

use crate::error::Result;
use crate::mapper::AccountMapper;
use crate::raw::{RawFilingRow, StatementCategory};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Coverage of one statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementCoverage {
    /// Rows seen
    pub total: usize,
    /// Rows mapped
    pub mapped: usize,
    /// Mapped share in percent
    pub coverage: f64,
}

/// An unmapped account and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedAccount {
    /// Reported account name
    pub account_name: String,
    /// Statement it appeared in
    pub statement: StatementCategory,
    /// Occurrences
    pub count: usize,
}

/// Mapping coverage over a set of rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Rows seen
    pub total_rows: usize,
    /// Rows mapped
    pub mapped_rows: usize,
    /// Rows not mapped
    pub unmapped_rows: usize,
    /// Mapped share in percent, 0 when no rows were seen
    pub coverage_percent: f64,
    /// Coverage per statement in first-seen order
    pub by_statement: IndexMap<StatementCategory, StatementCoverage>,
    /// Most frequent unmapped accounts
    pub top_unmapped: Vec<UnmappedAccount>,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 { 0.0 } else { part as f64 / total as f64 * 100.0 }
}

/// Accumulates mapping outcomes row by row.
#[derive(Debug, Clone, Default)]
pub struct CoverageTracker {
    total: usize,
    mapped: usize,
    by_statement: IndexMap<StatementCategory, StatementCoverage>,
    unmapped: IndexMap<(StatementCategory, String), usize>,
}

impl CoverageTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one row.
    pub fn record(&mut self, statement: &StatementCategory, account_name: &str, mapped: bool) {
        self.total += 1;
        let entry = self.by_statement.entry(statement.clone()).or_default();
        entry.total += 1;
        if mapped {
            self.mapped += 1;
            entry.mapped += 1;
        } else {
            *self.unmapped.entry((statement.clone(), account_name.to_string())).or_default() += 1;
        }
    }

    /// Summarize, keeping the `top_n` most frequent unmapped accounts.
    ///
    /// Accounts with equal counts keep the order they were first seen in.
    pub fn report(&self, top_n: usize) -> CoverageReport {
        let by_statement = self
            .by_statement
            .iter()
            .map(|(statement, stats)| {
                let coverage = percent(stats.mapped, stats.total);
                (statement.clone(), StatementCoverage { coverage, ..*stats })
            })
            .collect();

        let mut top_unmapped: Vec<UnmappedAccount> = self
            .unmapped
            .iter()
            .map(|((statement, account_name), count)| UnmappedAccount {
                account_name: account_name.clone(),
                statement: statement.clone(),
                count: *count,
            })
            .collect();
        top_unmapped.sort_by(|a, b| b.count.cmp(&a.count));
        top_unmapped.truncate(top_n);

        CoverageReport {
            total_rows: self.total,
            mapped_rows: self.mapped,
            unmapped_rows: self.total - self.mapped,
            coverage_percent: percent(self.mapped, self.total),
            by_statement,
            top_unmapped,
        }
    }
}

/// Classify every row and report mapping coverage.
pub fn generate_coverage_report(
    mapper: &AccountMapper,
    rows: &[RawFilingRow],
    top_n: usize,
) -> Result<CoverageReport> {
    let mut tracker = CoverageTracker::new();
    for row in rows {
        let result = mapper.classify_row(row)?;
        tracker.record(&row.statement, row.account_name.trim(), result.is_mapped());
    }
    let report = tracker.report(top_n);
    tracing::debug!(
        total = report.total_rows,
        mapped = report.mapped_rows,
        coverage = report.coverage_percent,
        "Coverage report generated"
    );
    Ok(report)
}

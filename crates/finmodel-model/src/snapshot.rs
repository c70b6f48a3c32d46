//! Model snapshots and their persistence.
//!
//! A snapshot is stored as a header row plus one output line per
//! (line, period) value. Saving replaces any snapshot with the same id.

use crate::chart::{ModelStatement, display_name};
use crate::checks::ModelChecks;
use crate::error::{ModelError, Result};
use crate::statement::{Provenance, Statement, StatementLine};

use crate::timeline::{ModelTimeline, TimelineSpec, build_timeline};
use chrono::{DateTime, Utc};
use finmodel_curate::PeriodKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provenance and fingerprint of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Engine version that built it
    pub engine_version: String,
    /// Receipt numbers of the filings used, sorted
    pub source_reports: Vec<String>,
    /// SHA-256 hex digest of the inputs
    pub snapshot_hash: String,
    /// Unit of every line
    pub unit: String,
}

/// A built three-statement model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    /// Snapshot id
    pub snapshot_id: String,
    /// Entity id
    pub entity_id: String,
    /// Timeline
    pub timeline: ModelTimeline,
    /// Income statement
    pub income_statement: Statement,
    /// Balance sheet
    pub balance_sheet: Statement,
    /// Cash flow statement
    pub cash_flow: Statement,
    /// Integrity checks
    pub checks: ModelChecks,
    /// Metadata
    pub metadata: SnapshotMetadata,
}

impl ModelSnapshot {
    /// Statement by kind.
    pub const fn statement(&self, statement: ModelStatement) -> &Statement {
        match statement {
            ModelStatement::IncomeStatement => &self.income_statement,
            ModelStatement::BalanceSheet => &self.balance_sheet,
            ModelStatement::CashFlow => &self.cash_flow,
        }
    }

    /// All statements in model order.
    pub const fn statements(&self) -> [&Statement; 3] {
        [&self.income_statement, &self.balance_sheet, &self.cash_flow]
    }
}

/// Stored snapshot header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    /// Snapshot id
    pub snapshot_id: String,
    /// Entity id
    pub entity_id: String,
    /// Most recent historical year
    pub base_year: i32,
    /// Historical years
    pub historical_years: u32,
    /// Forecast years
    pub forecast_years: u32,
    /// Checks at build time
    pub checks: ModelChecks,
    /// Metadata
    pub metadata: SnapshotMetadata,
}

/// One stored (line, period) value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Snapshot id
    pub snapshot_id: String,
    /// Statement
    pub statement: ModelStatement,
    /// Line id
    pub line_id: String,
    /// Period index
    pub period_index: usize,
    /// Fiscal year of the period
    pub fiscal_year: i32,
    /// Fiscal quarter of the period
    pub fiscal_quarter: Option<u8>,
    /// Period kind
    pub period_kind: PeriodKind,
    /// Value
    pub value: Decimal,
    /// Unit
    pub unit: String,
    /// Position within the statement
    pub display_order: usize,
    /// Historical period
    pub is_historical: bool,
    /// Value origin
    pub provenance: Provenance,
}

/// Persists snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Write the header and lines in one transaction, replacing any snapshot with the same id.
    fn replace_snapshot(&self, header: &SnapshotHeader, lines: &[OutputLine]) -> Result<()>;

    /// Header and lines of a stored snapshot.
    fn load_snapshot_record(&self, snapshot_id: &str) -> Result<Option<(SnapshotHeader, Vec<OutputLine>)>>;
}

/// Outcome of saving a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResult {
    /// Snapshot id, kept on failure
    pub snapshot_id: String,
    /// Output lines written
    pub lines_created: usize,
    /// Write succeeded
    pub success: bool,
    /// Failure description
    pub error: Option<String>,
}

/// Header row of a snapshot.
pub fn header(snapshot: &ModelSnapshot) -> SnapshotHeader {
    let spec = snapshot.timeline.spec();
    SnapshotHeader {
        snapshot_id: snapshot.snapshot_id.clone(),
        entity_id: snapshot.entity_id.clone(),
        base_year: spec.base_year,
        historical_years: spec.historical_years,
        forecast_years: spec.forecast_years,
        checks: snapshot.checks,
        metadata: snapshot.metadata.clone(),
    }
}

/// One output line per present value. Values at an index outside the timeline are skipped.
pub fn explode(snapshot: &ModelSnapshot) -> Vec<OutputLine> {
    let mut lines = Vec::new();
    for statement in snapshot.statements() {
        for line in &statement.lines {
            for (&index, &value) in &line.values {
                let Some(period) = snapshot.timeline.period(index) else {
                    tracing::warn!(line = %line.line_id, index, "Period not found, skipping value");
                    continue;
                };
                lines.push(OutputLine {
                    snapshot_id: snapshot.snapshot_id.clone(),
                    statement: statement.statement,
                    line_id: line.line_id.clone(),
                    period_index: index,
                    fiscal_year: period.fiscal_year,
                    fiscal_quarter: period.fiscal_quarter,
                    period_kind: period.kind,
                    value,
                    unit: line.unit.clone(),
                    display_order: line.display_order,
                    is_historical: period.is_historical,
                    provenance: line.provenance,
                });
            }
        }
    }
    lines
}

/// Save a snapshot. Failures are reported in the result, never returned.
pub fn save_snapshot<S: SnapshotStore + ?Sized>(store: &S, snapshot: &ModelSnapshot) -> SaveResult {
    let lines = explode(snapshot);
    match store.replace_snapshot(&header(snapshot), &lines) {
        Ok(()) => {
            tracing::info!(snapshot_id = %snapshot.snapshot_id, lines = lines.len(), "Snapshot saved");
            SaveResult {
                snapshot_id: snapshot.snapshot_id.clone(),
                lines_created: lines.len(),
                success: true,
                error: None,
            }
        }
        Err(err) => {
            tracing::error!(snapshot_id = %snapshot.snapshot_id, error = %err, "Snapshot save failed");
            SaveResult {
                snapshot_id: snapshot.snapshot_id.clone(),
                lines_created: 0,
                success: false,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Load and reconstruct a stored snapshot.
pub fn load_snapshot<S: SnapshotStore + ?Sized>(store: &S, snapshot_id: &str) -> Result<ModelSnapshot> {
    let (header, output) = store
        .load_snapshot_record(snapshot_id)?
        .ok_or_else(|| ModelError::SnapshotNotFound(snapshot_id.to_string()))?;

    let timeline = build_timeline(&TimelineSpec::annual(
        header.base_year,
        header.historical_years,
        header.forecast_years,
    ))
    .map_err(|err| ModelError::CorruptSnapshot { id: snapshot_id.to_string(), reason: err.to_string() })?;

    let mut by_line: HashMap<(ModelStatement, String), Vec<OutputLine>> = HashMap::new();
    for line in output {
        if timeline.period(line.period_index).is_none() {
            return Err(ModelError::CorruptSnapshot {
                id: snapshot_id.to_string(),
                reason: format!("period index {} outside timeline", line.period_index),
            });
        }
        by_line.entry((line.statement, line.line_id.clone())).or_default().push(line);
    }

    let unit = header.metadata.unit.as_str();
    let income_statement = rebuild(&mut by_line, ModelStatement::IncomeStatement, unit);
    let balance_sheet = rebuild(&mut by_line, ModelStatement::BalanceSheet, unit);
    let cash_flow = rebuild(&mut by_line, ModelStatement::CashFlow, unit);
    if let Some((statement, line_id)) = by_line.into_keys().next() {
        return Err(ModelError::CorruptSnapshot {
            id: snapshot_id.to_string(),
            reason: format!("unknown line {line_id} in {statement}"),
        });
    }

    Ok(ModelSnapshot {
        snapshot_id: header.snapshot_id,
        entity_id: header.entity_id,
        timeline,
        income_statement,
        balance_sheet,
        cash_flow,
        checks: header.checks,
        metadata: header.metadata,
    })
}

type StoredLines = HashMap<(ModelStatement, String), Vec<OutputLine>>;

/// Rebuild a statement in chart order from its stored values.
fn rebuild(stored: &mut StoredLines, statement: ModelStatement, unit: &str) -> Statement {
    let lines = statement
        .lines()
        .iter()
        .enumerate()
        .map(|(order, standard)| {
            let values = stored.remove(&(statement, standard.id.to_string())).unwrap_or_default();
            let provenance = values.first().map(|v| v.provenance).unwrap_or_default();
            StatementLine {
                line_id: standard.id.to_string(),
                display_name: display_name(standard.id).to_string(),
                statement,
                values: values.iter().map(|v| (v.period_index, v.value)).collect(),
                unit: values.first().map_or_else(|| unit.to_string(), |v| v.unit.clone()),
                display_order: order,
                provenance,
            }
        })
        .collect();
    Statement { statement, lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BuilderConfig, ModelBuilder, ModelRequest};
    use crate::chart::ids;
    use crate::testing::{ENTITY, MemoryFacts, fact};
    use rust_decimal_macros::dec;

    fn store() -> MemoryFacts {
        MemoryFacts::new(vec![
            fact("IS.REVENUE", 2023, dec!(250000), "R2023"),
            fact("IS.REVENUE", 2024, dec!(280000), "R2024"),
            fact(ids::TOTAL_ASSETS, 2024, dec!(1000), "R2024"),
            fact(ids::TOTAL_LIABILITIES, 2024, dec!(600), "R2024"),
            fact(ids::TOTAL_EQUITY, 2024, dec!(400), "R2024"),
        ])
    }

    fn build(store: &MemoryFacts) -> ModelSnapshot {
        let request =
            ModelRequest { entity_id: ENTITY.to_string(), base_year: 2024, historical_years: 2, forecast_years: 3 };
        ModelBuilder::new(store, store, BuilderConfig::default()).build_snapshot(&request).unwrap()
    }

    #[test]
    fn test_explode_one_line_per_value() {
        let store = store();
        let snapshot = build(&store);
        let lines = explode(&snapshot);

        // revenue: 2 historical + 3 forecast; each BS line: 1 historical + 3 forecast
        assert_eq!(lines.len(), 5 + 3 * 4);
        let forecast = lines.iter().find(|l| l.line_id == "IS.REVENUE" && l.period_index == 4).unwrap();
        assert_eq!(forecast.fiscal_year, 2027);
        assert!(!forecast.is_historical);
        assert_eq!(forecast.value, dec!(280000));
        assert_eq!(forecast.period_kind, PeriodKind::Annual);
    }

    #[test]
    fn test_explode_skips_index_outside_timeline() {
        let store = store();
        let mut snapshot = build(&store);
        let expected = explode(&snapshot).len();
        snapshot.income_statement.lines[0].values.insert(99, dec!(1));
        assert_eq!(explode(&snapshot).len(), expected);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let store = store();
        let snapshot = build(&store);

        let saved = save_snapshot(&store, &snapshot);
        assert!(saved.success);
        assert_eq!(saved.lines_created, store.stored_lines(&snapshot.snapshot_id));

        let loaded = load_snapshot(&store, &snapshot.snapshot_id).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_save_failure_reported() {
        let store = store().failing_snapshot_writes();
        let snapshot = build(&store);

        let saved = save_snapshot(&store, &snapshot);
        assert!(!saved.success);
        assert_eq!(saved.snapshot_id, snapshot.snapshot_id);
        assert_eq!(saved.lines_created, 0);
        assert!(saved.error.unwrap().contains("database is locked"));
    }

    #[test]
    fn test_load_missing_snapshot() {
        let store = store();
        let err = load_snapshot(&store, "snapshot-0-deadbeef").unwrap_err();
        assert!(matches!(err, ModelError::SnapshotNotFound(id) if id == "snapshot-0-deadbeef"));
    }

    #[test]
    fn test_load_rejects_out_of_range_index() {
        let store = store();
        let snapshot = build(&store);
        let mut lines = explode(&snapshot);
        lines[0].period_index = 42;
        store.replace_snapshot(&header(&snapshot), &lines).unwrap();

        let err = load_snapshot(&store, &snapshot.snapshot_id).unwrap_err();
        assert!(matches!(err, ModelError::CorruptSnapshot { .. }));
    }
}

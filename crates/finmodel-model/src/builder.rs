//! Three-statement model construction.
//!
//! Every standard line is filled period by period. Historical periods take the
//! loaded value; forecast periods repeat the value at the last historical
//! index, when there is one.

use crate::chart::{ModelStatement, StandardLine};
use crate::checks::run_checks;
use crate::error::{ModelError, Result};
use crate::loader::{HistoricalFacts, HistoricalLoader};
use crate::snapshot::{ModelSnapshot, SnapshotMetadata};
use crate::statement::{Provenance, Statement, StatementLine};
use crate::timeline::{ModelTimeline, TimelineSpec, build_timeline};
use chrono::Utc;
use finmodel_curate::{ConsolidationScope, EntityDirectory, FactQuery};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Engine version recorded in snapshot metadata.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model builder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Allowed absolute error in identity checks
    pub tolerance: Decimal,
    /// Unit recorded on every line
    pub unit: String,
    /// Engine version recorded in snapshots
    pub engine_version: String,
    /// Consolidation scope of the facts used
    pub scope: ConsolidationScope,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            tolerance: Decimal::ONE,
            unit: "KRW".to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            scope: ConsolidationScope::Consolidated,
        }
    }
}

/// What to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Entity id
    pub entity_id: String,
    /// Most recent historical fiscal year
    pub base_year: i32,
    /// Historical years
    pub historical_years: u32,
    /// Forecast years
    pub forecast_years: u32,
}

impl ModelRequest {
    /// Annual timeline parameters of the request.
    pub const fn timeline_spec(&self) -> TimelineSpec {
        TimelineSpec::annual(self.base_year, self.historical_years, self.forecast_years)
    }
}

/// Per-line fill state: historical periods first, then forecast.
#[derive(Debug, Clone, Copy)]
enum LineState {
    Historical,
    Forecast { carry: Option<Decimal> },
}

fn project_line(line: &StandardLine, timeline: &ModelTimeline, facts: &HistoricalFacts) -> BTreeMap<usize, Decimal> {
    let boundary = timeline.boundary_index();
    let mut values = BTreeMap::new();
    let mut state = LineState::Historical;

    for period in timeline.periods() {
        if matches!(state, LineState::Historical) && !period.is_historical {
            state = LineState::Forecast { carry: values.get(&boundary).copied() };
        }
        let value = match state {
            LineState::Historical => facts.value(line.id, period.index),
            LineState::Forecast { carry } => carry,
        };
        if let Some(value) = value {
            values.insert(period.index, value);
        }
    }
    values
}

/// Assemble a statement from the chart and loaded facts.
pub fn build_statement(
    statement: ModelStatement,
    timeline: &ModelTimeline,
    facts: &HistoricalFacts,
    unit: &str,
) -> Statement {
    let lines = statement
        .lines()
        .iter()
        .enumerate()
        .map(|(order, line)| StatementLine {
            line_id: line.id.to_string(),
            display_name: line.display_name.to_string(),
            statement,
            values: project_line(line, timeline, facts),
            unit: unit.to_string(),
            display_order: order,
            provenance: Provenance::Source,
        })
        .collect();
    Statement { statement, lines }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashInput<'a> {
    entity_id: &'a str,
    base_year: i32,
    historical_years: u32,
    forecast_years: u32,
    data_hash: String,
}

/// SHA-256 hex digest identifying the snapshot inputs.
pub fn snapshot_hash(request: &ModelRequest, facts: &HistoricalFacts) -> Result<String> {
    let input = HashInput {
        entity_id: &request.entity_id,
        base_year: request.base_year,
        historical_years: request.historical_years,
        forecast_years: request.forecast_years,
        data_hash: facts.line_ids().collect::<Vec<_>>().join(","),
    };
    let digest = Sha256::digest(serde_json::to_vec(&input)?);
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Millisecond stamp for a snapshot id, strictly increasing within the process.
fn next_id_millis(now: i64) -> i64 {
    match LAST_ID_MILLIS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1))) {
        Ok(last) | Err(last) => now.max(last + 1),
    }
}

/// Snapshot id `snapshot-{millis}-{hash[..8]}`. Ids minted in one process never repeat.
fn mint_snapshot_id(millis: i64, hash: &str) -> String {
    format!("snapshot-{}-{}", next_id_millis(millis), &hash[..8])
}

/// Builds model snapshots from curated facts.
#[derive(Debug)]
pub struct ModelBuilder<'a, Q: ?Sized, D: ?Sized> {
    facts: &'a Q,
    entities: &'a D,
    config: BuilderConfig,
}

impl<'a, Q, D> ModelBuilder<'a, Q, D>
where
    Q: FactQuery + ?Sized,
    D: EntityDirectory + ?Sized,
{
    /// Create a builder.
    pub const fn new(facts: &'a Q, entities: &'a D, config: BuilderConfig) -> Self {
        Self { facts, entities, config }
    }

    /// Builder settings.
    pub const fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Build a snapshot.
    pub fn build_snapshot(&self, request: &ModelRequest) -> Result<ModelSnapshot> {
        tracing::info!(
            entity_id = %request.entity_id,
            base_year = request.base_year,
            historical = request.historical_years,
            forecast = request.forecast_years,
            "Building model"
        );

        if !self.entities.entity_exists(&request.entity_id)? {
            return Err(ModelError::EntityNotFound(request.entity_id.clone()));
        }

        let timeline = build_timeline(&request.timeline_spec())?;
        let facts = HistoricalLoader::new(self.facts, self.config.scope)
            .load(&request.entity_id, timeline.periods())?;
        if facts.is_empty() {
            let range = timeline.range();
            return Err(ModelError::NoCuratedFacts {
                entity_id: request.entity_id.clone(),
                first_year: range.min_year,
                last_year: request.base_year,
            });
        }
        tracing::debug!(lines = facts.len(), periods = timeline.periods().len(), "Loaded historical facts");

        let unit = &self.config.unit;
        let income_statement = build_statement(ModelStatement::IncomeStatement, &timeline, &facts, unit);
        let balance_sheet = build_statement(ModelStatement::BalanceSheet, &timeline, &facts, unit);
        let cash_flow = build_statement(ModelStatement::CashFlow, &timeline, &facts, unit);

        let checks = run_checks(&balance_sheet, &cash_flow, &timeline, self.config.tolerance);
        if !checks.is_valid() {
            tracing::warn!(
                balance_error = %checks.balance.max_error,
                cash_error = %checks.cash_tie_out.max_error,
                "Model checks failed"
            );
        }

        let hash = snapshot_hash(request, &facts)?;
        let created_at = Utc::now();
        let snapshot_id = mint_snapshot_id(created_at.timestamp_millis(), &hash);

        let snapshot = ModelSnapshot {
            snapshot_id,
            entity_id: request.entity_id.clone(),
            timeline,
            income_statement,
            balance_sheet,
            cash_flow,
            checks,
            metadata: SnapshotMetadata {
                created_at,
                engine_version: self.config.engine_version.clone(),
                source_reports: facts.source_reports().map(str::to_string).collect(),
                snapshot_hash: hash,
                unit: self.config.unit.clone(),
            },
        };
        tracing::info!(snapshot_id = %snapshot.snapshot_id, valid = checks.is_valid(), "Model built");
        Ok(snapshot)
    }
}

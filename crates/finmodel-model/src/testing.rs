//! In-memory fact and snapshot store backing the unit tests.

use crate::error::Result as ModelResult;
use crate::snapshot::{OutputLine, SnapshotHeader, SnapshotStore};
use chrono::NaiveDate;
use finmodel_curate::{
    ConsolidationScope, CuratedFact, EntityDirectory, FactFilter, FactQuery, MatchMethod, NormalizedPeriod,
    NormalizedRow, PeriodDates, PeriodKind, Result, StatementCategory, identity_key,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) const ENTITY: &str = "entity-00126380";

/// Mapped annual consolidated fact for the test entity.
pub(crate) fn fact(line_id: &str, fiscal_year: i32, amount: Decimal, report_ref: &str) -> CuratedFact {
    let statement = StatementCategory::from(line_id.split('.').next().unwrap_or_default());
    let end = NaiveDate::from_ymd_opt(fiscal_year, 12, 31).unwrap();
    let dates = if statement.is_point_in_time() {
        PeriodDates::AsOf { date: end }
    } else {
        PeriodDates::Flow { start: NaiveDate::from_ymd_opt(fiscal_year, 1, 1).unwrap(), end }
    };
    let row = NormalizedRow {
        corp_code: "00126380".to_string(),
        stock_code: None,
        entity_id: ENTITY.to_string(),
        period: NormalizedPeriod { kind: PeriodKind::Annual, fiscal_year, fiscal_quarter: None, dates },
        report_code: "11011".to_string(),
        scope: ConsolidationScope::Consolidated,
        statement,
        account_source_id: None,
        account_name: line_id.to_string(),
        account_detail: None,
        amount,
        currency: "KRW".to_string(),
        ordinal: None,
        report_ref: Some(report_ref.to_string()),
        source_priority: 10,
        is_accumulated: false,
        parse_success: true,
        parse_error: None,
    };
    CuratedFact {
        id: identity_key(&row),
        row,
        standard_line_id: Some(line_id.to_string()),
        match_method: MatchMethod::NameExact,
        confidence: 1.0,
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryFacts {
    facts: Vec<CuratedFact>,
    entities: Vec<String>,
    snapshots: Mutex<HashMap<String, (SnapshotHeader, Vec<OutputLine>)>>,
    fail_snapshot_writes: bool,
}

impl MemoryFacts {
    pub(crate) fn new(facts: Vec<CuratedFact>) -> Self {
        Self { facts, entities: vec![ENTITY.to_string()], ..Default::default() }
    }

    pub(crate) fn without_entities(mut self) -> Self {
        self.entities.clear();
        self
    }

    pub(crate) fn failing_snapshot_writes(mut self) -> Self {
        self.fail_snapshot_writes = true;
        self
    }

    pub(crate) fn stored_lines(&self, snapshot_id: &str) -> usize {
        self.snapshots.lock().unwrap().get(snapshot_id).map_or(0, |(_, lines)| lines.len())
    }
}

impl FactQuery for MemoryFacts {
    fn mapped_facts(&self, filter: &FactFilter) -> Result<Vec<CuratedFact>> {
        let mut facts: Vec<CuratedFact> = self
            .facts
            .iter()
            .filter(|f| {
                f.is_mapped()
                    && f.row.entity_id == filter.entity_id
                    && f.row.period.kind == filter.period_kind
                    && f.row.scope == filter.scope
                    && filter.fiscal_years.contains(&f.row.period.fiscal_year)
            })
            .cloned()
            .collect();
        facts.sort_by_key(|f| (f.row.period.fiscal_year, f.row.ordinal));
        Ok(facts)
    }
}

impl EntityDirectory for MemoryFacts {
    fn entity_exists(&self, entity_id: &str) -> Result<bool> {
        Ok(self.entities.iter().any(|e| e == entity_id))
    }
}

impl SnapshotStore for MemoryFacts {
    fn replace_snapshot(&self, header: &SnapshotHeader, lines: &[OutputLine]) -> ModelResult<()> {
        if self.fail_snapshot_writes {
            return Err(crate::ModelError::storage(std::io::Error::other("database is locked")));
        }
        self.snapshots
            .lock()
            .unwrap()
            .insert(header.snapshot_id.clone(), (header.clone(), lines.to_vec()));
        Ok(())
    }

    fn load_snapshot_record(&self, snapshot_id: &str) -> ModelResult<Option<(SnapshotHeader, Vec<OutputLine>)>> {
        Ok(self.snapshots.lock().unwrap().get(snapshot_id).cloned())
    }
}

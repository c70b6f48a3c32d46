//! Curated fact persistence.

use crate::error::Result;
use crate::sqlite::{SqliteStore, invalid_column, scope_column};
use chrono::{NaiveDate, Utc};
use finmodel_curate::{
    CuratedFact, EntityRecord, FactFilter, FactQuery, FactSink, MatchMethod, NormalizedPeriod, NormalizedRow,
    PeriodDates, PeriodKind, StatementCategory, UpsertOutcome,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;

const FACT_COLUMNS: &str = "id, entity_id, corp_code, stock_code, period_kind, fiscal_year, fiscal_quarter,
    period_start, period_end, report_code, scope, statement, account_source_id, account_name,
    account_detail, amount, currency, ordinal, report_ref, source_priority, is_accumulated,
    parse_success, parse_error, standard_line_id, match_method, confidence";

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    row.get::<_, Option<String>>(idx)?
        .map(|text| NaiveDate::from_str(&text).map_err(|e| invalid_column(idx, format!("Invalid date {text}: {e}"))))
        .transpose()
}

fn read_fact(row: &Row<'_>) -> rusqlite::Result<CuratedFact> {
    let kind_text: String = row.get(4)?;
    let kind = PeriodKind::from_db_str(&kind_text)
        .ok_or_else(|| invalid_column(4, format!("Invalid period kind: {kind_text}")))?;
    let end = date_column(row, 8)?.ok_or_else(|| invalid_column(8, "Missing period end".to_string()))?;
    let dates = match date_column(row, 7)? {
        Some(start) => PeriodDates::Flow { start, end },
        None => PeriodDates::AsOf { date: end },
    };
    let amount_text: String = row.get(15)?;
    let amount = Decimal::from_str(&amount_text)
        .map_err(|e| invalid_column(15, format!("Invalid amount {amount_text}: {e}")))?;
    let method_text: String = row.get(24)?;
    let match_method = MatchMethod::from_db_str(&method_text)
        .ok_or_else(|| invalid_column(24, format!("Invalid match method: {method_text}")))?;

    Ok(CuratedFact {
        id: row.get(0)?,
        row: NormalizedRow {
            entity_id: row.get(1)?,
            corp_code: row.get(2)?,
            stock_code: row.get(3)?,
            period: NormalizedPeriod { kind, fiscal_year: row.get(5)?, fiscal_quarter: row.get(6)?, dates },
            report_code: row.get(9)?,
            scope: scope_column(row, 10)?,
            statement: StatementCategory::from(row.get::<_, String>(11)?),
            account_source_id: row.get(12)?,
            account_name: row.get(13)?,
            account_detail: row.get(14)?,
            amount,
            currency: row.get(16)?,
            ordinal: row.get(17)?,
            report_ref: row.get(18)?,
            source_priority: row.get(19)?,
            is_accumulated: row.get(20)?,
            parse_success: row.get(21)?,
            parse_error: row.get(22)?,
        },
        standard_line_id: row.get(23)?,
        match_method,
        confidence: row.get(25)?,
    })
}

fn fact_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<CuratedFact>> {
    conn.query_row(&format!("SELECT {FACT_COLUMNS} FROM curated_facts WHERE id = ?1"), params![id], read_fact)
        .optional()
}

fn write_fact(conn: &Connection, fact: &CuratedFact) -> rusqlite::Result<()> {
    let row = &fact.row;
    let (start, end) = match row.period.dates {
        PeriodDates::AsOf { date } => (None, date),
        PeriodDates::Flow { start, end } => (Some(start), end),
    };
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO curated_facts ({FACT_COLUMNS}, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                     ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27)"
        ),
        params![
            fact.id,
            row.entity_id,
            row.corp_code,
            row.stock_code,
            row.period.kind.to_db_str(),
            row.period.fiscal_year,
            row.period.fiscal_quarter,
            start.map(|d| d.to_string()),
            end.to_string(),
            row.report_code,
            row.scope.to_db_str(),
            row.statement.as_code(),
            row.account_source_id,
            row.account_name,
            row.account_detail,
            row.amount.to_string(),
            row.currency,
            row.ordinal,
            row.report_ref,
            row.source_priority,
            row.is_accumulated,
            row.parse_success,
            row.parse_error,
            fact.standard_line_id,
            fact.match_method.to_db_str(),
            fact.confidence,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl SqliteStore {
    /// Insert or update a fact by identity key, leaving identical facts untouched.
    pub fn put_fact(&self, fact: &CuratedFact) -> Result<UpsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let outcome = match fact_by_id(&tx, &fact.id)? {
            Some(existing) if existing == *fact => UpsertOutcome::Unchanged,
            Some(_) => {
                write_fact(&tx, fact)?;
                UpsertOutcome::Updated
            }
            None => {
                write_fact(&tx, fact)?;
                UpsertOutcome::Inserted
            }
        };
        tx.commit()?;
        Ok(outcome)
    }

    /// Fact by identity key.
    pub fn fact(&self, id: &str) -> Result<Option<CuratedFact>> {
        let conn = self.conn()?;
        Ok(fact_by_id(&conn, id)?)
    }

    /// Mapped facts of an entity, ordered by fiscal year then ordinal.
    pub fn facts_for(&self, filter: &FactFilter) -> Result<Vec<CuratedFact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FACT_COLUMNS} FROM curated_facts
             WHERE entity_id = ?1 AND period_kind = ?2 AND scope = ?3
               AND standard_line_id IS NOT NULL
             ORDER BY fiscal_year, ordinal, id"
        ))?;
        let facts = stmt
            .query_map(
                params![filter.entity_id, filter.period_kind.to_db_str(), filter.scope.to_db_str()],
                read_fact,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(facts
            .into_iter()
            .filter(|fact| filter.fiscal_years.contains(&fact.row.period.fiscal_year))
            .collect())
    }
}

impl FactSink for SqliteStore {
    fn ensure_entity(&self, entity: &EntityRecord) -> finmodel_curate::Result<()> {
        if self.insert_entity(entity)? {
            tracing::info!(entity_id = %entity.id, "Registered entity");
        }
        Ok(())
    }

    fn upsert_fact(&self, fact: &CuratedFact) -> finmodel_curate::Result<UpsertOutcome> {
        Ok(self.put_fact(fact)?)
    }
}

impl FactQuery for SqliteStore {
    fn mapped_facts(&self, filter: &FactFilter) -> finmodel_curate::Result<Vec<CuratedFact>> {
        Ok(self.facts_for(filter)?)
    }
}

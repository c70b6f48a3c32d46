//! Model snapshot persistence.

use crate::error::Result;
use crate::sqlite::{SqliteStore, invalid_column};
use chrono::{DateTime, Utc};
use finmodel_curate::PeriodKind;
use finmodel_model::{ModelStatement, OutputLine, Provenance, SnapshotHeader, SnapshotMetadata, SnapshotStore};
use rusqlite::{OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::str::FromStr;

fn read_header(row: &Row<'_>) -> rusqlite::Result<SnapshotHeader> {
    let created_text: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_text)
        .map_err(|e| invalid_column(5, format!("Invalid timestamp {created_text}: {e}")))?
        .with_timezone(&Utc);
    let reports_text: String = row.get(7)?;
    let source_reports = serde_json::from_str(&reports_text)
        .map_err(|e| invalid_column(7, format!("Invalid source reports: {e}")))?;
    let checks_text: String = row.get(10)?;
    let checks =
        serde_json::from_str(&checks_text).map_err(|e| invalid_column(10, format!("Invalid checks: {e}")))?;

    Ok(SnapshotHeader {
        snapshot_id: row.get(0)?,
        entity_id: row.get(1)?,
        base_year: row.get(2)?,
        historical_years: row.get(3)?,
        forecast_years: row.get(4)?,
        checks,
        metadata: SnapshotMetadata {
            created_at,
            engine_version: row.get(6)?,
            source_reports,
            snapshot_hash: row.get(8)?,
            unit: row.get(9)?,
        },
    })
}

fn read_output_line(row: &Row<'_>) -> rusqlite::Result<OutputLine> {
    let statement_text: String = row.get(1)?;
    let statement = ModelStatement::from_code(&statement_text)
        .ok_or_else(|| invalid_column(1, format!("Invalid statement: {statement_text}")))?;
    let kind_text: String = row.get(6)?;
    let period_kind = PeriodKind::from_db_str(&kind_text)
        .ok_or_else(|| invalid_column(6, format!("Invalid period kind: {kind_text}")))?;
    let value_text: String = row.get(7)?;
    let value =
        Decimal::from_str(&value_text).map_err(|e| invalid_column(7, format!("Invalid value {value_text}: {e}")))?;
    let provenance_text: String = row.get(11)?;
    let provenance = Provenance::from_db_str(&provenance_text)
        .ok_or_else(|| invalid_column(11, format!("Invalid provenance: {provenance_text}")))?;

    Ok(OutputLine {
        snapshot_id: row.get(0)?,
        statement,
        line_id: row.get(2)?,
        period_index: row.get::<_, i64>(3)? as usize,
        fiscal_year: row.get(4)?,
        fiscal_quarter: row.get(5)?,
        period_kind,
        value,
        unit: row.get(8)?,
        display_order: row.get::<_, i64>(9)? as usize,
        is_historical: row.get(10)?,
        provenance,
    })
}

impl SqliteStore {
    /// Replace a snapshot's header and output lines in one transaction.
    pub fn write_snapshot(&self, header: &SnapshotHeader, lines: &[OutputLine]) -> Result<()> {
        let metadata = &header.metadata;
        let source_reports = serde_json::to_string(&metadata.source_reports)?;
        let checks = serde_json::to_string(&header.checks)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM model_output_lines WHERE snapshot_id = ?1", params![header.snapshot_id])?;
        tx.execute(
            "INSERT OR REPLACE INTO model_snapshots
             (snapshot_id, entity_id, base_year, historical_years, forecast_years, created_at,
              engine_version, source_reports, snapshot_hash, unit, checks)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                header.snapshot_id,
                header.entity_id,
                header.base_year,
                header.historical_years,
                header.forecast_years,
                metadata.created_at.to_rfc3339(),
                metadata.engine_version,
                source_reports,
                metadata.snapshot_hash,
                metadata.unit,
                checks,
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO model_output_lines
                 (snapshot_id, statement, line_id, period_index, fiscal_year, fiscal_quarter,
                  period_kind, value, unit, display_order, is_historical, provenance)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?;
            for line in lines {
                stmt.execute(params![
                    line.snapshot_id,
                    line.statement.code(),
                    line.line_id,
                    line.period_index as i64,
                    line.fiscal_year,
                    line.fiscal_quarter,
                    line.period_kind.to_db_str(),
                    line.value.to_string(),
                    line.unit,
                    line.display_order as i64,
                    line.is_historical,
                    line.provenance.to_db_str(),
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(snapshot_id = %header.snapshot_id, lines = lines.len(), "Wrote snapshot");
        Ok(())
    }

    /// Header and output lines of a stored snapshot.
    pub fn read_snapshot(&self, snapshot_id: &str) -> Result<Option<(SnapshotHeader, Vec<OutputLine>)>> {
        let conn = self.conn()?;
        let Some(header) = conn
            .query_row(
                "SELECT snapshot_id, entity_id, base_year, historical_years, forecast_years, created_at,
                        engine_version, source_reports, snapshot_hash, unit, checks
                 FROM model_snapshots WHERE snapshot_id = ?1",
                params![snapshot_id],
                read_header,
            )
            .optional()?
        else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT snapshot_id, statement, line_id, period_index, fiscal_year, fiscal_quarter,
                    period_kind, value, unit, display_order, is_historical, provenance
             FROM model_output_lines
             WHERE snapshot_id = ?1
             ORDER BY statement, display_order, period_index",
        )?;
        let lines =
            stmt.query_map(params![snapshot_id], read_output_line)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Some((header, lines)))
    }

    /// Headers of an entity's snapshots, newest first.
    pub fn snapshot_headers(&self, entity_id: &str) -> Result<Vec<SnapshotHeader>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT snapshot_id, entity_id, base_year, historical_years, forecast_years, created_at,
                    engine_version, source_reports, snapshot_hash, unit, checks
             FROM model_snapshots
             WHERE entity_id = ?1
             ORDER BY created_at DESC, snapshot_id DESC",
        )?;
        let headers = stmt.query_map(params![entity_id], read_header)?.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(headers)
    }
}

impl SnapshotStore for SqliteStore {
    fn replace_snapshot(&self, header: &SnapshotHeader, lines: &[OutputLine]) -> finmodel_model::Result<()> {
        Ok(self.write_snapshot(header, lines)?)
    }

    fn load_snapshot_record(
        &self,
        snapshot_id: &str,
    ) -> finmodel_model::Result<Option<(SnapshotHeader, Vec<OutputLine>)>> {
        Ok(self.read_snapshot(snapshot_id)?)
    }
}

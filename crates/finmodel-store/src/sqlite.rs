//! SQLite store for raw rows, mapping rules, entities, curated facts and snapshots.

use crate::error::{Result, StoreError};
use crate::schema;
use chrono::Utc;
use finmodel_curate::{
    ConsolidationScope, EntityDirectory, EntityRecord, MappingRule, NewMappingRule, RawFilingRow, RawRowQuery,
    RawRowSource, RuleStore, StatementCategory,
};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed implementation of every pipeline storage trait.
///
/// Access is serialized through a mutex so one store can be shared by
/// concurrent transform jobs.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Row counts per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Ingested raw rows
    pub raw_rows: usize,
    /// Registered entities
    pub entities: usize,
    /// Mapping rules
    pub mapping_rules: usize,
    /// Curated facts
    pub curated_facts: usize,
    /// Curated facts with a standard line
    pub mapped_facts: usize,
    /// Model snapshots
    pub snapshots: usize,
    /// Snapshot output lines
    pub output_lines: usize,
}

impl SqliteStore {
    /// Open or create a database file.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::initialize(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Append raw filing rows in one transaction. Returns the number inserted.
    pub fn insert_raw_rows(&self, rows: &[RawFilingRow]) -> Result<usize> {
        let ingested_at = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_filing_rows
                 (corp_code, stock_code, fiscal_year, report_code, consolidation_flag, statement,
                  account_id, account_name, account_detail, current_amount, current_cumulative_amount,
                  prior_amount, prior_prior_amount, currency, ordinal, receipt_no, ingested_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.corp_code,
                    row.stock_code,
                    row.fiscal_year,
                    row.report_code,
                    row.consolidation_flag,
                    row.statement.as_code(),
                    row.account_id,
                    row.account_name,
                    row.account_detail,
                    row.current_amount,
                    row.current_cumulative_amount,
                    row.prior_amount,
                    row.prior_prior_amount,
                    row.currency,
                    row.ordinal,
                    row.receipt_no,
                    ingested_at,
                ])?;
            }
        }
        tx.commit()?;
        tracing::debug!(rows = rows.len(), "Inserted raw rows");
        Ok(rows.len())
    }

    /// Raw rows matching a query, in ingestion order.
    pub fn raw_rows(&self, query: &RawRowQuery) -> Result<Vec<RawFilingRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT corp_code, stock_code, fiscal_year, report_code, consolidation_flag, statement,
                    account_id, account_name, account_detail, current_amount, current_cumulative_amount,
                    prior_amount, prior_prior_amount, currency, ordinal, receipt_no
             FROM raw_filing_rows
             WHERE corp_code = ?1 AND fiscal_year = ?2
               AND (?3 IS NULL OR report_code = ?3)
               AND (?4 IS NULL OR consolidation_flag = ?4)
             ORDER BY id",
        )?;
        let rows = stmt.query_map(
            params![query.corp_code, query.fiscal_year, query.report_code, query.consolidation_flag],
            |row| {
                Ok(RawFilingRow {
                    corp_code: row.get(0)?,
                    stock_code: row.get(1)?,
                    fiscal_year: row.get(2)?,
                    report_code: row.get(3)?,
                    consolidation_flag: row.get(4)?,
                    statement: StatementCategory::from(row.get::<_, String>(5)?),
                    account_id: row.get(6)?,
                    account_name: row.get(7)?,
                    account_detail: row.get(8)?,
                    current_amount: row.get(9)?,
                    current_cumulative_amount: row.get(10)?,
                    prior_amount: row.get(11)?,
                    prior_prior_amount: row.get(12)?,
                    currency: row.get(13)?,
                    ordinal: row.get(14)?,
                    receipt_no: row.get(15)?,
                })
            },
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Registered entity by id.
    pub fn entity(&self, entity_id: &str) -> Result<Option<EntityRecord>> {
        let conn = self.conn()?;
        let entity = conn
            .query_row(
                "SELECT id, corp_code, stock_code, name, default_scope FROM entities WHERE id = ?1",
                params![entity_id],
                |row| {
                    Ok(EntityRecord {
                        id: row.get(0)?,
                        corp_code: row.get(1)?,
                        stock_code: row.get(2)?,
                        name: row.get(3)?,
                        default_scope: scope_column(row, 4)?,
                    })
                },
            )
            .optional()?;
        Ok(entity)
    }

    /// Set an entity's display name.
    pub fn set_entity_name(&self, entity_id: &str, name: &str) -> Result<bool> {
        let updated =
            self.conn()?.execute("UPDATE entities SET name = ?2 WHERE id = ?1", params![entity_id, name])?;
        Ok(updated > 0)
    }

    /// Id of the most recently created snapshot of an entity.
    pub fn latest_snapshot_id(&self, entity_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT snapshot_id FROM model_snapshots
                 WHERE entity_id = ?1
                 ORDER BY created_at DESC, snapshot_id DESC
                 LIMIT 1",
                params![entity_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Delete everything stored for one company.
    pub fn clear_company(&self, corp_code: &str) -> Result<()> {
        let entity_id = finmodel_curate::entity_id_for(corp_code);
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM raw_filing_rows WHERE corp_code = ?1", params![corp_code])?;
        tx.execute("DELETE FROM curated_facts WHERE corp_code = ?1", params![corp_code])?;
        tx.execute(
            "DELETE FROM model_output_lines
             WHERE snapshot_id IN (SELECT snapshot_id FROM model_snapshots WHERE entity_id = ?1)",
            params![entity_id],
        )?;
        tx.execute("DELETE FROM model_snapshots WHERE entity_id = ?1", params![entity_id])?;
        tx.execute("DELETE FROM entities WHERE id = ?1", params![entity_id])?;
        tx.commit()?;
        tracing::info!(corp_code, "Cleared company data");
        Ok(())
    }

    /// Row counts per table.
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            raw_rows: count("SELECT COUNT(*) FROM raw_filing_rows")?,
            entities: count("SELECT COUNT(*) FROM entities")?,
            mapping_rules: count("SELECT COUNT(*) FROM mapping_rules")?,
            curated_facts: count("SELECT COUNT(*) FROM curated_facts")?,
            mapped_facts: count("SELECT COUNT(*) FROM curated_facts WHERE standard_line_id IS NOT NULL")?,
            snapshots: count("SELECT COUNT(*) FROM model_snapshots")?,
            output_lines: count("SELECT COUNT(*) FROM model_output_lines")?,
        })
    }

    fn rules(&self) -> Result<Vec<MappingRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_source_id, account_name_pattern, account_detail_path, statement,
                    standard_line_id, confidence, priority, version
             FROM mapping_rules
             ORDER BY priority ASC, confidence DESC, id ASC",
        )?;
        let rules = stmt.query_map([], |row| {
            Ok(MappingRule {
                id: row.get(0)?,
                account_source_id: row.get(1)?,
                account_name_pattern: row.get(2)?,
                account_detail_path: row.get(3)?,
                statement: row.get::<_, Option<String>>(4)?.map(StatementCategory::from),
                standard_line_id: row.get(5)?,
                confidence: row.get(6)?,
                priority: row.get(7)?,
                version: row.get(8)?,
            })
        })?;
        Ok(rules.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn add_rule(&self, rule: NewMappingRule) -> Result<MappingRule> {
        let mut rule = rule.into_rule(0);
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO mapping_rules
             (account_source_id, account_name_pattern, account_detail_path, statement,
              standard_line_id, confidence, priority, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                rule.account_source_id,
                rule.account_name_pattern,
                rule.account_detail_path,
                rule.statement.as_ref().map(StatementCategory::as_code),
                rule.standard_line_id,
                rule.confidence,
                rule.priority,
                rule.version,
                Utc::now().to_rfc3339(),
            ],
        )?;
        rule.id = conn.last_insert_rowid();
        Ok(rule)
    }

    fn has_entity(&self, entity_id: &str) -> Result<bool> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM entities WHERE id = ?1",
            params![entity_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub(crate) fn insert_entity(&self, entity: &EntityRecord) -> Result<bool> {
        let inserted = self.conn()?.execute(
            "INSERT OR IGNORE INTO entities (id, corp_code, stock_code, name, default_scope, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entity.id,
                entity.corp_code,
                entity.stock_code,
                entity.name,
                entity.default_scope.to_db_str(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }
}

/// Conversion failure for a column that holds an undecodable value.
pub(crate) fn invalid_column(idx: usize, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(StoreError::Parse(reason)))
}

pub(crate) fn scope_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ConsolidationScope> {
    let text: String = row.get(idx)?;
    ConsolidationScope::from_db_str(&text).ok_or_else(|| invalid_column(idx, format!("Invalid scope: {text}")))
}

impl RawRowSource for SqliteStore {
    fn fetch_raw_rows(&self, query: &RawRowQuery) -> finmodel_curate::Result<Vec<RawFilingRow>> {
        Ok(self.raw_rows(query)?)
    }
}

impl RuleStore for SqliteStore {
    fn load_rules(&self) -> finmodel_curate::Result<Vec<MappingRule>> {
        Ok(self.rules()?)
    }

    fn insert_rule(&self, rule: NewMappingRule) -> finmodel_curate::Result<MappingRule> {
        Ok(self.add_rule(rule)?)
    }
}

impl EntityDirectory for SqliteStore {
    fn entity_exists(&self, entity_id: &str) -> finmodel_curate::Result<bool> {
        Ok(self.has_entity(entity_id)?)
    }
}

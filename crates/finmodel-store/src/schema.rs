//! Database schema.

use rusqlite::Connection;

const TABLES: &[&str] = &[
    // Rows as ingested, never rewritten
    "CREATE TABLE IF NOT EXISTS raw_filing_rows (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        corp_code TEXT NOT NULL,
        stock_code TEXT,
        fiscal_year TEXT NOT NULL,
        report_code TEXT NOT NULL,
        consolidation_flag TEXT NOT NULL,
        statement TEXT NOT NULL,
        account_id TEXT,
        account_name TEXT NOT NULL,
        account_detail TEXT,
        current_amount TEXT,
        current_cumulative_amount TEXT,
        prior_amount TEXT,
        prior_prior_amount TEXT,
        currency TEXT,
        ordinal TEXT,
        receipt_no TEXT,
        ingested_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_raw_company_year ON raw_filing_rows(corp_code, fiscal_year)",
    "CREATE TABLE IF NOT EXISTS entities (
        id TEXT PRIMARY KEY,
        corp_code TEXT NOT NULL UNIQUE,
        stock_code TEXT,
        name TEXT,
        default_scope TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS mapping_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_source_id TEXT,
        account_name_pattern TEXT,
        account_detail_path TEXT,
        statement TEXT,
        standard_line_id TEXT NOT NULL,
        confidence REAL NOT NULL,
        priority INTEGER NOT NULL,
        version INTEGER NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS curated_facts (
        id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        corp_code TEXT NOT NULL,
        stock_code TEXT,
        period_kind TEXT NOT NULL,
        fiscal_year INTEGER NOT NULL,
        fiscal_quarter INTEGER,
        period_start TEXT,
        period_end TEXT NOT NULL,
        report_code TEXT NOT NULL,
        scope TEXT NOT NULL,
        statement TEXT NOT NULL,
        account_source_id TEXT,
        account_name TEXT NOT NULL,
        account_detail TEXT,
        amount TEXT NOT NULL,
        currency TEXT NOT NULL,
        ordinal INTEGER,
        report_ref TEXT,
        source_priority INTEGER NOT NULL,
        is_accumulated INTEGER NOT NULL,
        parse_success INTEGER NOT NULL,
        parse_error TEXT,
        standard_line_id TEXT,
        match_method TEXT NOT NULL,
        confidence REAL NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_facts_entity_period
        ON curated_facts(entity_id, period_kind, scope, fiscal_year)",
    "CREATE TABLE IF NOT EXISTS model_snapshots (
        snapshot_id TEXT PRIMARY KEY,
        entity_id TEXT NOT NULL,
        base_year INTEGER NOT NULL,
        historical_years INTEGER NOT NULL,
        forecast_years INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        engine_version TEXT NOT NULL,
        source_reports TEXT NOT NULL,
        snapshot_hash TEXT NOT NULL,
        unit TEXT NOT NULL,
        checks TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_entity ON model_snapshots(entity_id, created_at)",
    "CREATE TABLE IF NOT EXISTS model_output_lines (
        snapshot_id TEXT NOT NULL,
        statement TEXT NOT NULL,
        line_id TEXT NOT NULL,
        period_index INTEGER NOT NULL,
        fiscal_year INTEGER NOT NULL,
        fiscal_quarter INTEGER,
        period_kind TEXT NOT NULL,
        value TEXT NOT NULL,
        unit TEXT NOT NULL,
        display_order INTEGER NOT NULL,
        is_historical INTEGER NOT NULL,
        provenance TEXT NOT NULL,
        PRIMARY KEY (snapshot_id, line_id, period_index)
    )",
];

/// Create every table and index that does not exist yet.
pub(crate) fn initialize(conn: &Connection) -> rusqlite::Result<()> {
    for statement in TABLES {
        conn.execute(statement, [])?;
    }
    Ok(())
}

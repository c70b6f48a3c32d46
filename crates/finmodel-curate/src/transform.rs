//! Transform jobs: raw rows to curated facts.
//!
//! A job covers one company, fiscal year, report code and consolidation flag.
//! Rows are processed sequentially; row-level failures are collected and the
//! loop continues. Only a failure to fetch the batch aborts a job.
//!
//! Within a job the first row holding an identity key wins; later rows with
//! the same key are skipped and reported so re-runs store the same fact.

use crate::coverage::generate_coverage_report;
use crate::error::Result;
use crate::fact::{CuratedFact, EntityRecord, UpsertOutcome, identity_key};
use crate::mapper::AccountMapper;
use crate::normalizer::{NormalizeOptions, normalize_row};
use crate::period::ReportCode;
use crate::raw::{RawFilingRow, RawRowQuery};
use crate::source::{FactSink, RawRowSource};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// One unit of transform work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformJob {
    /// Company code
    pub corp_code: String,
    /// Fiscal year
    pub fiscal_year: String,
    /// Report code
    pub report_code: String,
    /// Consolidation flag (`CFS` / `OFS`)
    pub consolidation_flag: String,
}

impl TransformJob {
    /// Create a job.
    pub fn new(
        corp_code: impl Into<String>,
        fiscal_year: impl Into<String>,
        report_code: impl Into<String>,
        consolidation_flag: impl Into<String>,
    ) -> Self {
        Self {
            corp_code: corp_code.into(),
            fiscal_year: fiscal_year.into(),
            report_code: report_code.into(),
            consolidation_flag: consolidation_flag.into(),
        }
    }

    fn query(&self) -> RawRowQuery {
        RawRowQuery {
            corp_code: self.corp_code.clone(),
            fiscal_year: self.fiscal_year.clone(),
            report_code: Some(self.report_code.clone()),
            consolidation_flag: Some(self.consolidation_flag.clone()),
        }
    }
}

/// Transform settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Row normalization options
    pub normalize: NormalizeOptions,
    /// Unmapped accounts kept in coverage reports
    pub coverage_top_n: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self { normalize: NormalizeOptions::default(), coverage_top_n: 10 }
    }
}

/// Statistics of one transform job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    /// Job that produced this result
    pub job: TransformJob,
    /// Job ran to completion
    pub success: bool,
    /// Raw rows looked at
    pub rows_processed: usize,
    /// Facts inserted or changed
    pub rows_created: usize,
    /// Facts already up to date
    pub rows_unchanged: usize,
    /// Rows without a usable amount, or repeating an earlier row's identity key
    pub rows_skipped: usize,
    /// Rows whose amount failed to parse
    pub parse_errors: usize,
    /// Facts with no standard line
    pub unmapped_rows: usize,
    /// Mapping coverage of the company's rows for the fiscal year
    pub coverage_percent: f64,
    /// Wall time
    pub duration: Duration,
    /// Row- and batch-level error messages
    pub errors: Vec<String>,
}

impl JobResult {
    fn started(job: &TransformJob) -> Self {
        Self {
            job: job.clone(),
            success: false,
            rows_processed: 0,
            rows_created: 0,
            rows_unchanged: 0,
            rows_skipped: 0,
            parse_errors: 0,
            unmapped_rows: 0,
            coverage_percent: 0.0,
            duration: Duration::ZERO,
            errors: Vec::new(),
        }
    }
}

/// A company's jobs across years, report codes and consolidation flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    /// Company code
    pub corp_code: String,
    /// Fiscal years
    pub fiscal_years: Vec<String>,
    /// Report codes, annual only by default
    pub report_codes: Vec<String>,
    /// Consolidation flags, both by default
    pub consolidation_flags: Vec<String>,
}

impl BatchJob {
    /// Annual consolidated and separate jobs for the given years.
    pub fn annual<I, S>(corp_code: impl Into<String>, fiscal_years: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            corp_code: corp_code.into(),
            fiscal_years: fiscal_years.into_iter().map(Into::into).collect(),
            report_codes: vec![ReportCode::ANNUAL.to_string()],
            consolidation_flags: vec!["CFS".to_string(), "OFS".to_string()],
        }
    }

    /// Expand into individual jobs, year-major.
    pub fn jobs(&self) -> Vec<TransformJob> {
        let mut jobs = Vec::new();
        for year in &self.fiscal_years {
            for report_code in &self.report_codes {
                for flag in &self.consolidation_flags {
                    jobs.push(TransformJob::new(&self.corp_code, year, report_code, flag));
                }
            }
        }
        jobs
    }
}

/// Results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Jobs run
    pub total_jobs: usize,
    /// Jobs that completed
    pub success_jobs: usize,
    /// Jobs that aborted
    pub failed_jobs: usize,
    /// Per-job results
    pub results: Vec<JobResult>,
}

enum RowOutcome {
    Skipped,
    Duplicate(String),
    Stored { outcome: UpsertOutcome, mapped: bool, parse_success: bool },
}

/// Drives normalization and mapping over batches of raw rows.
#[derive(Debug)]
pub struct Transformer<'a, S: ?Sized, F: ?Sized> {
    source: &'a S,
    sink: &'a F,
    mapper: &'a AccountMapper,
    options: TransformOptions,
}

impl<'a, S, F> Transformer<'a, S, F>
where
    S: RawRowSource + ?Sized,
    F: FactSink + ?Sized,
{
    /// Create a transformer.
    pub const fn new(
        source: &'a S,
        sink: &'a F,
        mapper: &'a AccountMapper,
        options: TransformOptions,
    ) -> Self {
        Self { source, sink, mapper, options }
    }

    /// Run one job.
    pub fn run(&self, job: &TransformJob) -> JobResult {
        let started = Instant::now();
        let mut result = JobResult::started(job);
        tracing::info!(
            corp_code = %job.corp_code,
            fiscal_year = %job.fiscal_year,
            report_code = %job.report_code,
            fs_div = %job.consolidation_flag,
            "Starting transform job"
        );

        let rows = match self.source.fetch_raw_rows(&job.query()) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::error!(error = %err, "Failed to fetch raw rows");
                result.errors.push(format!("Failed to fetch raw rows: {err}"));
                result.duration = started.elapsed();
                return result;
            }
        };

        let stock_code = rows.iter().find_map(|r| r.stock_code.clone());
        if let Err(err) = self.sink.ensure_entity(&EntityRecord::for_company(&job.corp_code, stock_code)) {
            tracing::error!(error = %err, "Failed to register entity");
            result.errors.push(format!("Failed to register entity: {err}"));
            result.duration = started.elapsed();
            return result;
        }

        let mut seen = HashSet::new();
        for raw in &rows {
            result.rows_processed += 1;
            match self.process_row(raw, &mut seen) {
                Ok(RowOutcome::Skipped) => result.rows_skipped += 1,
                Ok(RowOutcome::Duplicate(key)) => {
                    tracing::warn!(account = %raw.account_name, key = %key, "Duplicate identity key, row skipped");
                    result.rows_skipped += 1;
                    result.errors.push(format!("{}: duplicate identity key {key}", raw.account_name));
                }
                Ok(RowOutcome::Stored { outcome, mapped, parse_success }) => {
                    if outcome.is_change() {
                        result.rows_created += 1;
                    } else {
                        result.rows_unchanged += 1;
                    }
                    if !mapped {
                        result.unmapped_rows += 1;
                    }
                    if !parse_success {
                        result.parse_errors += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(account = %raw.account_name, error = %err, "Row failed");
                    result.errors.push(format!("{}: {err}", raw.account_name));
                }
            }
        }

        match self.coverage_percent(job) {
            Ok(percent) => result.coverage_percent = percent,
            Err(err) => tracing::warn!(error = %err, "Coverage report failed"),
        }

        result.success = true;
        result.duration = started.elapsed();
        tracing::info!(
            processed = result.rows_processed,
            created = result.rows_created,
            unchanged = result.rows_unchanged,
            skipped = result.rows_skipped,
            unmapped = result.unmapped_rows,
            errors = result.errors.len(),
            coverage = result.coverage_percent,
            "Transform job finished"
        );
        result
    }

    fn process_row(&self, raw: &RawFilingRow, seen: &mut HashSet<String>) -> Result<RowOutcome> {
        let Some(row) = normalize_row(raw, &self.options.normalize)? else {
            return Ok(RowOutcome::Skipped);
        };
        let key = identity_key(&row);
        if seen.contains(&key) {
            return Ok(RowOutcome::Duplicate(key));
        }
        let mapping = self.mapper.classify(
            row.account_source_id.as_deref(),
            &row.account_name,
            row.account_detail.as_deref(),
            &row.statement,
        )?;
        let fact = CuratedFact::new(row, &mapping);
        let outcome = self.sink.upsert_fact(&fact)?;
        seen.insert(key);
        Ok(RowOutcome::Stored {
            outcome,
            mapped: fact.is_mapped(),
            parse_success: fact.row.parse_success,
        })
    }

    fn coverage_percent(&self, job: &TransformJob) -> Result<f64> {
        let rows = self
            .source
            .fetch_raw_rows(&RawRowQuery::company_year(&job.corp_code, &job.fiscal_year))?;
        let report = generate_coverage_report(self.mapper, &rows, self.options.coverage_top_n)?;
        Ok(report.coverage_percent)
    }

    /// Run every job of a batch.
    pub fn run_batch(&self, batch: &BatchJob) -> BatchSummary {
        let results: Vec<JobResult> = batch.jobs().iter().map(|job| self.run(job)).collect();
        let success_jobs = results.iter().filter(|r| r.success).count();
        let summary = BatchSummary {
            total_jobs: results.len(),
            success_jobs,
            failed_jobs: results.len() - success_jobs,
            results,
        };
        tracing::info!(
            corp_code = %batch.corp_code,
            total = summary.total_jobs,
            failed = summary.failed_jobs,
            "Batch transform finished"
        );
        summary
    }
}

//! Terminal output.

use finmodel::curate::{BatchSummary, CoverageReport, MappingRule};
use finmodel::model::{CheckResult, ModelSnapshot, SaveResult};
use finmodel::store::StoreStats;
use rust_decimal::Decimal;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn heading(title: &str) {
    println!("\n{RULE}");
    println!("{title}");
    println!("{RULE}\n");
}

pub(crate) fn print_rule(rule: &MappingRule) {
    println!("Added rule #{} → {}", rule.id, rule.standard_line_id);
    if let Some(id) = &rule.account_source_id {
        println!("  Account id:  {id}");
    }
    if let Some(pattern) = &rule.account_name_pattern {
        println!("  Pattern:     {pattern}");
    }
    if let Some(statement) = &rule.statement {
        println!("  Statement:   {statement}");
    }
    println!("  Priority:    {}", rule.priority);
    println!("  Confidence:  {:.2}", rule.confidence);
}

pub(crate) fn print_batch(summary: &BatchSummary) {
    heading("TRANSFORM");
    println!(
        "  {:<6} {:<7} {:<4} {:>9} {:>8} {:>9} {:>8} {:>8} {:>9}",
        "Year", "Report", "Div", "Processed", "Created", "Unchanged", "Skipped", "Unmapped", "Coverage"
    );
    for result in &summary.results {
        let job = &result.job;
        println!(
            "  {:<6} {:<7} {:<4} {:>9} {:>8} {:>9} {:>8} {:>8} {:>8.1}%{}",
            job.fiscal_year,
            job.report_code,
            job.consolidation_flag,
            result.rows_processed,
            result.rows_created,
            result.rows_unchanged,
            result.rows_skipped,
            result.unmapped_rows,
            result.coverage_percent,
            if result.success { "" } else { "  FAILED" },
        );
        for error in &result.errors {
            println!("      ! {error}");
        }
    }
    println!(
        "\n  Jobs: {} total, {} succeeded, {} failed",
        summary.total_jobs, summary.success_jobs, summary.failed_jobs
    );
}

pub(crate) fn print_coverage(report: &CoverageReport) {
    heading("MAPPING COVERAGE");
    println!(
        "  Rows: {} total, {} mapped, {} unmapped ({:.1}%)\n",
        report.total_rows, report.mapped_rows, report.unmapped_rows, report.coverage_percent
    );
    for (statement, coverage) in &report.by_statement {
        println!(
            "  {:<5} {:>6} / {:<6} {:>6.1}%",
            statement.to_string(),
            coverage.mapped,
            coverage.total,
            coverage.coverage
        );
    }
    if !report.top_unmapped.is_empty() {
        println!("\n  Top unmapped accounts:");
        for account in &report.top_unmapped {
            println!("    {:>4}  [{}] {}", account.count, account.statement, account.account_name);
        }
    }
}

fn print_check(name: &str, check: &CheckResult) {
    println!(
        "  {:<14} {}  max error {} (tolerance {})",
        name,
        if check.passed { "PASS" } else { "FAIL" },
        check.max_error,
        check.tolerance
    );
}

fn format_value(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.round().to_string())
}

pub(crate) fn print_snapshot(snapshot: &ModelSnapshot) {
    heading(&format!("MODEL SNAPSHOT: {}", snapshot.snapshot_id));
    let metadata = &snapshot.metadata;
    println!("  Entity:          {}", snapshot.entity_id);
    println!("  Created:         {}", metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Engine version:  {}", metadata.engine_version);
    println!("  Unit:            {}", metadata.unit);
    println!("  Source reports:  {}", metadata.source_reports.join(", "));
    println!("  Hash:            {}", metadata.snapshot_hash);
    println!();
    print_check("Balance", &snapshot.checks.balance);
    print_check("Cash tie-out", &snapshot.checks.cash_tie_out);

    let periods = snapshot.timeline.periods();
    for statement in snapshot.statements() {
        heading(&statement.statement.to_string());
        print!("  {:<32}", "");
        for period in periods {
            print!(" {:>18}", period.label);
        }
        println!();
        for line in statement.lines.iter().filter(|line| !line.values.is_empty()) {
            print!("  {:<32}", line.display_name);
            for period in periods {
                print!(" {:>18}", format_value(line.value(period.index)));
            }
            println!();
        }
    }
    println!();
}

pub(crate) fn print_save(result: &SaveResult) {
    if result.success {
        println!("Saved snapshot {} ({} lines)", result.snapshot_id, result.lines_created);
    } else {
        println!(
            "Failed to save snapshot {}: {}",
            result.snapshot_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
}

pub(crate) fn print_stats(stats: &StoreStats) {
    heading("DATABASE");
    println!("  Raw rows:        {}", stats.raw_rows);
    println!("  Entities:        {}", stats.entities);
    println!("  Mapping rules:   {}", stats.mapping_rules);
    println!("  Curated facts:   {} ({} mapped)", stats.curated_facts, stats.mapped_facts);
    println!("  Snapshots:       {}", stats.snapshots);
    println!("  Output lines:    {}", stats.output_lines);
    println!();
}

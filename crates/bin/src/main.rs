//! Finmodel CLI binary.
//!
//! Provides a command-line interface for the curate-and-model pipeline.

mod db;
mod ingest;
mod report;

use clap::{Parser, Subcommand};
use finmodel::PipelineConfig;
use finmodel::curate::{
    AccountMapper, BatchJob, NewMappingRule, RawRowQuery, StatementCategory, Transformer, entity_id_for,
    generate_coverage_report,
};
use finmodel::model::{ModelBuilder, ModelRequest, load_snapshot, save_snapshot};
use finmodel::seed::seed_default_rules;
use finmodel::store::SqliteStore;
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "finmodel")]
#[command(about = "Finmodel: curated DART filings into three-statement models", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Pipeline configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and seed the default mapping rules
    Init,

    /// Load raw filing rows from a CSV file
    Ingest {
        /// CSV file with one row per reported account
        #[arg(long)]
        file: PathBuf,
    },

    /// Add a mapping rule
    AddRule {
        /// Target standard line id, e.g. IS.REVENUE
        #[arg(long)]
        line: String,

        /// Exact account id to match
        #[arg(long)]
        account_id: Option<String>,

        /// Account name, matched exactly and as a regular expression
        #[arg(long)]
        pattern: Option<String>,

        /// Restrict to a statement (BS, IS, CIS, CF, SCE)
        #[arg(long)]
        statement: Option<String>,

        /// Priority, lower is tried first
        #[arg(long)]
        priority: Option<i32>,

        /// Confidence between 0 and 1
        #[arg(long)]
        confidence: Option<f64>,
    },

    /// Normalize, map and store facts for a company
    Transform {
        /// Company code
        #[arg(long)]
        corp: String,

        /// Fiscal years, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<String>,

        /// Report codes, comma separated (default: annual)
        #[arg(long, value_delimiter = ',')]
        report_codes: Vec<String>,

        /// Consolidation flags, comma separated (default: CFS,OFS)
        #[arg(long, value_delimiter = ',')]
        fs_div: Vec<String>,
    },

    /// Show mapping coverage of a company's raw rows
    Coverage {
        /// Company code
        #[arg(long)]
        corp: String,

        /// Fiscal year
        #[arg(long)]
        year: String,

        /// Unmapped accounts to list
        #[arg(long)]
        top: Option<usize>,
    },

    /// Build and save a three-statement model
    Build {
        /// Company code
        #[arg(long)]
        corp: String,

        /// Most recent historical fiscal year
        #[arg(long)]
        base_year: i32,

        /// Historical years
        #[arg(long, default_value = "5")]
        historical: u32,

        /// Forecast years
        #[arg(long, default_value = "5")]
        forecast: u32,

        /// Print the snapshot after saving
        #[arg(long)]
        show: bool,
    },

    /// Show a saved snapshot
    Show {
        /// Snapshot id (default: the company's latest)
        snapshot_id: Option<String>,

        /// Company code
        #[arg(long)]
        corp: Option<String>,

        /// Output format (json or text)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Show database statistics
    Stats,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    let store = Arc::new(db::open_store(cli.db.as_deref())?);

    match cli.command {
        Commands::Init => {
            let seeded = seed_default_rules(store.as_ref())?;
            println!("Database ready, {} default rules seeded", seeded);
        }
        Commands::Ingest { file } => {
            let rows = ingest::read_rows(File::open(&file)?)?;
            let inserted = store.insert_raw_rows(&rows)?;
            println!("Ingested {} rows from {}", inserted, file.display());
        }
        Commands::AddRule { line, account_id, pattern, statement, priority, confidence } => {
            let mut rule = NewMappingRule::new(line);
            rule.account_source_id = account_id;
            rule.account_name_pattern = pattern;
            rule.statement = statement.map(StatementCategory::from);
            rule.priority = priority;
            rule.confidence = confidence;

            let mapper = AccountMapper::with_config(store.clone(), config.mapper);
            report::print_rule(&mapper.add_rule(rule)?);
        }
        Commands::Transform { corp, years, report_codes, fs_div } => {
            let mut batch = BatchJob::annual(corp, years);
            if !report_codes.is_empty() {
                batch.report_codes = report_codes;
            }
            if !fs_div.is_empty() {
                batch.consolidation_flags = fs_div;
            }

            let mapper = AccountMapper::with_config(store.clone(), config.mapper);
            let transformer = Transformer::new(store.as_ref(), store.as_ref(), &mapper, config.transform);
            let summary = transformer.run_batch(&batch);
            report::print_batch(&summary);
            if summary.failed_jobs > 0 {
                return Err(format!("{} of {} jobs failed", summary.failed_jobs, summary.total_jobs).into());
            }
        }
        Commands::Coverage { corp, year, top } => {
            let rows = store.raw_rows(&RawRowQuery::company_year(corp, year))?;
            let mapper = AccountMapper::with_config(store.clone(), config.mapper);
            let report =
                generate_coverage_report(&mapper, &rows, top.unwrap_or(config.transform.coverage_top_n))?;
            report::print_coverage(&report);
        }
        Commands::Build { corp, base_year, historical, forecast, show } => {
            let request = ModelRequest {
                entity_id: entity_id_for(&corp),
                base_year,
                historical_years: historical,
                forecast_years: forecast,
            };
            let builder = ModelBuilder::new(store.as_ref(), store.as_ref(), config.builder);
            let snapshot = builder.build_snapshot(&request)?;

            let saved = save_snapshot(store.as_ref(), &snapshot);
            report::print_save(&saved);
            if show {
                report::print_snapshot(&snapshot);
            }
            if !saved.success {
                return Err(format!("snapshot {} was not saved", saved.snapshot_id).into());
            }
        }
        Commands::Show { snapshot_id, corp, format } => {
            let snapshot_id = resolve_snapshot_id(&store, snapshot_id, corp.as_deref())?;
            let snapshot = load_snapshot(store.as_ref(), &snapshot_id)?;
            match format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&snapshot)?),
                _ => report::print_snapshot(&snapshot),
            }
        }
        Commands::Stats => {
            report::print_stats(&store.stats()?);
        }
    }

    Ok(())
}

fn resolve_snapshot_id(
    store: &SqliteStore,
    snapshot_id: Option<String>,
    corp: Option<&str>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(id) = snapshot_id {
        return Ok(id);
    }
    let corp = corp.ok_or("either a snapshot id or --corp is required")?;
    let entity_id = entity_id_for(corp);
    store
        .latest_snapshot_id(&entity_id)?
        .ok_or_else(|| format!("no snapshots for {entity_id}").into())
}

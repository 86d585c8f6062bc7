//! CLI entry point for the cleaning agent.

use anyhow::{anyhow, Result};
use clap::{Parser, ValueEnum};
use clean_agent::config::batch_size_from_signed;
use clean_agent::orchestrator::render_prompts;
use clean_agent::{
    source_for_path, CleaningConfig, CleaningOutcome, DataCleaner, ExtractionMode, ModelClient,
    Pipeline, PromptTemplate, RuleBasedCleaner, TableSource,
};
use clean_agent::sources::{SpreadsheetSource, SqliteQuerySource};
use dotenv::dotenv;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

#[cfg(feature = "ai")]
use clean_agent::ai::{ChatClient, ChatConfig, Provider};
#[cfg(feature = "ai")]
use clean_agent::sources::HttpJsonSource;

/// CLI-compatible model provider enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    /// Groq (GROQ_API_KEY)
    Groq,
    /// OpenRouter (OPENROUTER_API_KEY)
    #[value(name = "openrouter")]
    OpenRouter,
}

#[cfg(feature = "ai")]
impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Groq => Provider::Groq,
            CliProvider::OpenRouter => Provider::OpenRouter,
        }
    }
}

/// CLI-compatible extraction mode enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliExtraction {
    /// One JSON array per batch response
    PerBatch,
    /// Everything between the first '[' and the last ']'
    FirstToLast,
    /// Per batch, reading answers without a JSON array as CSV
    #[value(name = "per-batch-tables")]
    PerBatchTables,
}

impl From<CliExtraction> for ExtractionMode {
    fn from(cli: CliExtraction) -> Self {
        match cli {
            CliExtraction::PerBatch => ExtractionMode::PerBatch,
            CliExtraction::FirstToLast => ExtractionMode::FirstToLast,
            CliExtraction::PerBatchTables => ExtractionMode::PerBatchWithTableFallback,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "AI-assisted batch data cleaning",
    long_about = "Cleans a table with deterministic rules, then sends it to a language model \
                  in fixed-size row batches and recovers the cleaned records.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  GROQ_API_KEY          API key for Groq (default provider)\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter\n\n\
                  EXAMPLES:\n  \
                  # Clean a CSV file in batches of 20 rows\n  \
                  clean-agent -i people.csv\n\n  \
                  # Preview the prompts without calling the model\n  \
                  clean-agent -i people.csv --dry-run\n\n  \
                  # Fetch a JSON table and write the result as CSV\n  \
                  clean-agent --api-url https://example.com/people -o cleaned.csv\n\n  \
                  # Clean the result of a SQLite query\n  \
                  clean-agent --db people.db --query \"SELECT * FROM people\""
)]
struct Args {
    /// Path to a CSV, JSON or spreadsheet file
    #[arg(
        short,
        long,
        required_unless_present_any = ["api_url", "db"],
        conflicts_with_all = ["api_url", "db"]
    )]
    input: Option<String>,

    /// Worksheet to read from a spreadsheet input (defaults to the first)
    #[arg(long, requires = "input")]
    sheet: Option<String>,

    /// URL returning the table as JSON
    #[arg(long, conflicts_with = "db")]
    api_url: Option<String>,

    /// SQLite database file to query
    #[arg(long, requires = "query")]
    db: Option<String>,

    /// Query whose result is the table to clean
    #[arg(long, requires = "db")]
    query: Option<String>,

    /// Rows per model call
    #[arg(short, long, allow_negative_numbers = true)]
    batch_size: Option<i64>,

    /// Model provider
    #[arg(long, value_enum, default_value = "groq")]
    provider: CliProvider,

    /// Model name (defaults to the provider's default)
    #[arg(short, long)]
    model: Option<String>,

    /// How records are recovered from the model output
    #[arg(long, value_enum)]
    extraction: Option<CliExtraction>,

    /// Skip the rule-based cleaning pass
    #[arg(long)]
    no_rules: bool,

    /// JSON configuration file; command-line flags override it
    #[arg(short, long)]
    config: Option<String>,

    /// Write the cleaned table to this CSV file
    #[arg(short, long)]
    output: Option<String>,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the summary and records are printed.
    #[arg(long)]
    json: bool,

    /// Print the batch plan and prompts without calling the model
    #[arg(long)]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout holds only JSON.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    let config = build_config(&args)?;
    let source = open_source(&args)?;

    info!("Loading {}", source.describe());
    let data = source.load()?;
    info!("Table loaded: {:?}", data.shape());

    if args.dry_run {
        return run_dry_run(&config, &data);
    }

    let pipeline = build_pipeline(&args, config)?;
    run_pipeline(&pipeline, &args, &data)
}

/// Config file first, then command-line overrides.
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let mut config = match &args.config {
        Some(path) => CleaningConfig::from_json_file(path)?,
        None => CleaningConfig::default(),
    };

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size_from_signed(batch_size)?;
    }
    if let Some(extraction) = args.extraction {
        config.extraction_mode = extraction.into();
    }
    if args.no_rules {
        config.rule_based_cleaning = false;
    }

    config.validate()?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn open_source(args: &Args) -> Result<Box<dyn TableSource>> {
    if let Some(url) = &args.api_url {
        #[cfg(feature = "ai")]
        return Ok(Box::new(HttpJsonSource::new(url)));
        #[cfg(not(feature = "ai"))]
        return Err(anyhow!("Cannot fetch {}: HTTP support not compiled in", url));
    }

    if let (Some(db), Some(query)) = (&args.db, &args.query) {
        if !Path::new(db).exists() {
            return Err(anyhow!("Database file not found: {}", db));
        }
        return Ok(Box::new(SqliteQuerySource::new(db, query)));
    }

    let path = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("One of --input, --api-url or --db is required"))?;
    if !Path::new(path).exists() {
        return Err(anyhow!("Input file not found: {}", path));
    }
    if let Some(sheet) = &args.sheet {
        return Ok(Box::new(SpreadsheetSource::new(path).with_sheet(sheet)));
    }
    Ok(source_for_path(path)?)
}

/// Show what would be sent to the model.
///
/// Uses `println!` on purpose: this output is the point of `--dry-run` and must
/// not depend on the log level.
fn run_dry_run(config: &CleaningConfig, data: &DataFrame) -> Result<()> {
    let table = if config.rule_based_cleaning {
        DataCleaner.clean(data)?
    } else {
        data.clone()
    };

    let template = PromptTemplate::new(config.prompt_template.clone())?;
    let prompts = render_prompts(&template, &table, config.batch_size)?;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Batch plan");
    println!("{}\n", "=".repeat(80));
    println!("  Rows loaded:      {}", data.height());
    println!("  Rows after rules: {}", table.height());
    println!("  Batch size:       {}", config.batch_size);
    println!("  Model calls:      {}", prompts.len());
    println!("  Extraction:       {:?}", config.extraction_mode);

    for (span, prompt) in &prompts {
        println!("\n{}", "-".repeat(80));
        println!(
            "Batch {}/{} (rows {}..{})",
            span.index + 1,
            prompts.len(),
            span.start,
            span.end
        );
        println!("{}", "-".repeat(80));
        println!("{}", prompt);
    }

    Ok(())
}

#[cfg(feature = "ai")]
fn build_model_client(args: &Args) -> Result<Arc<dyn ModelClient>> {
    let mut builder = ChatConfig::builder().provider(args.provider.into());
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    let config = builder.build();

    info!(
        "Using {} model {}",
        config.provider.display_name(),
        config.model
    );
    Ok(Arc::new(ChatClient::from_env(config)?))
}

#[cfg(not(feature = "ai"))]
fn build_model_client(_args: &Args) -> Result<Arc<dyn ModelClient>> {
    Err(anyhow!(
        "AI support not compiled in. Rebuild with --features ai, or use --dry-run."
    ))
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
    let client = build_model_client(args)?;
    let mut builder = Pipeline::builder().config(config).model_client(client);

    if !args.quiet {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] Batch {}/{} {}: {}",
                update.fraction_done() * 100.0,
                update.batch_index + 1,
                update.batch_count,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

fn run_pipeline(pipeline: &Pipeline, args: &Args, data: &DataFrame) -> Result<()> {
    let mut outcome = match pipeline.run(data) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Some(raw) = e.raw_output() {
                debug!("Raw model output:\n{}", raw);
            }
            return Err(anyhow!("Cleaning failed [{}]: {}", e.error_code(), e));
        }
    };

    if let Some(path) = &args.output {
        let mut file = std::fs::File::create(path)?;
        CsvWriter::new(&mut file).finish(&mut outcome.table)?;
        info!("Cleaned table written to {}", path);
    }

    if args.json {
        let report = serde_json::json!({
            "summary": outcome.summary,
            "records": outcome.records,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&outcome);
    Ok(())
}

fn print_human_readable_summary(outcome: &CleaningOutcome) {
    let summary = &outcome.summary;

    println!("\n{}", "=".repeat(80));
    println!("CLEANING SUMMARY");
    println!("{}", "=".repeat(80));
    println!(
        "  Input:             {} rows x {} columns",
        summary.rows_before, summary.columns_before
    );
    println!("  After rules:       {} rows", summary.rows_after_rules);
    println!("  Model calls:       {}", summary.batches);
    println!("  Records recovered: {}", summary.records_recovered);
    println!("  Duration:          {} ms", summary.duration_ms);

    if outcome.table.height() > 0 {
        println!("\n{}", outcome.table);
    } else {
        println!("\n  The model returned no records.");
    }
}

//! CLI entry point for the retail sales cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use polars::prelude::*;
use sales_cleaner::loader::load_raw_table;
use sales_cleaner::reporting::{Aggregator, CleaningReport, ReportGenerator};
use sales_cleaner::utils::column_names;
use sales_cleaner::{Pipeline, PipelineConfig, PipelineResult};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Retail sales cleaning pipeline",
    long_about = "Cleans a messy retail/sales CSV export into a typed, analysis-ready table.\n\n\
                  EXAMPLES:\n  \
                  # Clean with the built-in retail schema\n  \
                  sales-cleaner -i sales.csv\n\n  \
                  # Use a JSON configuration and a semicolon-delimited file\n  \
                  sales-cleaner -i sales.csv -c cleaning.json --delimiter ';'\n\n  \
                  # Preview column coverage without processing\n  \
                  sales-cleaner -i sales.csv --dry-run\n\n  \
                  # Machine-readable output\n  \
                  sales-cleaner -i sales.csv --json | jq .summary"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: PathBuf,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// JSON configuration file
    ///
    /// Fields missing from the file keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Field delimiter of the input file (overrides the configuration)
    #[arg(long)]
    delimiter: Option<char>,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "cleaned_sales"
    #[arg(long)]
    output_name: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a JSON report to the output directory
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Remove exact duplicate rows after admission
    #[arg(long)]
    dedupe: bool,

    /// Show column coverage and configuration without processing
    #[arg(long)]
    dry_run: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the JSON report.
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

    let config = build_config(&args)?;

    info!("Loading dataset from: {}", args.input.display());
    let data = load_raw_table(&args.input, &config.csv)?;

    if args.dry_run {
        run_dry_run(&args, &config, &data);
        return Ok(());
    }

    let pipeline = build_pipeline(&args, config.clone())?;
    run_pipeline(&pipeline, &config, &args, &data)
}

/// Load the configuration file (if any) and apply CLI overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            PipelineConfig::from_json_file(path)?
        }
        None => PipelineConfig::default(),
    };

    config.output_dir = args.output.clone();
    if let Some(name) = &args.output_name {
        config.output_name = Some(name.clone());
    }
    if let Some(delimiter) = args.delimiter {
        config.csv.delimiter = delimiter;
    }
    if args.dedupe {
        config.remove_duplicates = true;
    }

    config.validate()?;
    Ok(config)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// Show what the pipeline would see without running it.
///
/// Uses `println!` on purpose: this output is the point of `--dry-run` and
/// must show regardless of log level.
fn run_dry_run(args: &Args, config: &PipelineConfig, data: &DataFrame) {
    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaning configuration");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input.display());
    println!("  Rows: {}", data.height());
    println!("  Columns: {}", data.width());
    println!();

    println!("COLUMN COVERAGE");
    println!("{}", "-".repeat(40));
    println!(
        "{:<22} {:<12} {:<10} {:<10} {:<12}",
        "Column", "Kind", "Present", "Blank", "Imputation"
    );
    println!("{}", "-".repeat(70));
    for spec in &config.columns {
        let (present, blank) = match data.column(&spec.name) {
            Ok(col) => ("yes", col.null_count().to_string()),
            Err(_) => ("NO", "-".to_string()),
        };
        let policy = config
            .imputation
            .get(&spec.name)
            .map_or("keep", |p| p.as_str());
        println!(
            "{:<22} {:<12} {:<10} {:<10} {:<12}",
            truncate_str(&spec.name, 21),
            format!("{:?}", spec.kind).to_lowercase(),
            present,
            blank,
            policy
        );
    }

    let extra: Vec<String> = column_names(data)
        .into_iter()
        .filter(|name| config.column_spec(name).is_none())
        .collect();
    if !extra.is_empty() {
        println!("  Pass-through columns: {}", extra.join(", "));
    }
    println!();

    println!("RULES");
    println!("{}", "-".repeat(40));
    println!("  Required fields: {}", config.required_fields.join(", "));
    println!("  Date formats: {}", config.date_formats.join(" | "));
    println!("  Missing markers: {}", config.missing_markers.join(", "));
    println!("  Canonical map entries: {}", config.canonical_map.len());
    println!("  Remove duplicates: {}", config.remove_duplicates);
    println!();

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    let generator = ReportGenerator::new(config.output_dir.clone(), config.output_name.clone());
    println!("  - {}/{}.csv", config.output_dir.display(), generator.output_name());
    if args.emit_report {
        println!(
            "  - {}/{}_report.json",
            config.output_dir.display(),
            generator.output_name()
        );
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute the cleaning, run without --dry-run");
    println!("{}", "=".repeat(80));
}

/// Truncate a string to max length with ellipsis
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Run the pipeline, write outputs and print results.
fn run_pipeline(
    pipeline: &Pipeline,
    config: &PipelineConfig,
    args: &Args,
    data: &DataFrame,
) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting cleaning pipeline...");
    info!("{}", "=".repeat(80));

    let mut result: PipelineResult = pipeline.process(data).map_err(|e| {
        error!("Pipeline failed: {}", e);
        anyhow!("Pipeline failed: {}", e)
    })?;

    let generator = ReportGenerator::new(config.output_dir.clone(), config.output_name.clone());
    let output_path = generator.write_cleaned_csv(&mut result.cleaned)?;

    let aggregates = Aggregator::new(config.report.clone()).summarize(&result.cleaned)?;
    let report =
        ReportGenerator::build_report(&args.input, Some(&output_path), &result, aggregates);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if args.emit_report {
        let report_path = generator.write_report(&report)?;
        info!("Report written to: {}", report_path.display());
    }

    print_human_readable_summary(&report, data.width(), result.cleaned.width());
    Ok(())
}

/// Print a human-readable summary of the cleaning results.
fn print_human_readable_summary(report: &CleaningReport, columns_in: usize, columns_out: usize) {
    let summary = &report.summary;
    let aggregates = &report.aggregates;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file, summary.rows_before, columns_in
    );
    if let Some(output_file) = &report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, summary.rows_after, columns_out
        );
    }
    println!();

    println!("Processing Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({:.1}% removed)",
        summary.rows_before, summary.rows_after, summary.rows_removed_percent
    );
    println!("  Dropped by admission: {}", summary.rows_dropped_by_admission);
    if summary.rows_dropped_by_policy > 0 {
        println!("  Dropped by policy: {}", summary.rows_dropped_by_policy);
    }
    if summary.duplicates_removed > 0 {
        println!("  Duplicates removed: {}", summary.duplicates_removed);
    }
    println!("  Cells coerced to missing: {}", summary.cells_coerced_to_missing);
    println!("  Cells imputed: {}", summary.cells_imputed);
    println!();

    let touched: Vec<_> = report
        .columns
        .iter()
        .filter(|c| c.coerced_to_missing > 0 || c.imputed > 0)
        .collect();
    if !touched.is_empty() {
        println!("Columns:");
        for col in touched {
            println!(
                "  - {}: {} unreadable, {} imputed",
                col.name, col.coerced_to_missing, col.imputed
            );
        }
        println!();
    }

    println!("Revenue:");
    println!("  Total: {:.2} over {} orders", aggregates.total_revenue, aggregates.order_count);
    if let Some(aov) = aggregates.average_order_value {
        println!("  Average order value: {:.2}", aov);
    }
    if let Some(margin) = aggregates.average_margin {
        println!("  Average margin: {:.1}%", margin);
    }
    for group in aggregates.revenue_by_region.iter().take(5) {
        println!("  {:<20} {:>12.2} ({} orders)", group.key, group.revenue, group.orders);
    }
    println!();

    if !report.diagnostics.column_errors.is_empty() {
        println!("Column Errors:");
        for err in &report.diagnostics.column_errors {
            println!("  x [{}] {}: {}", err.stage, err.column, err.message);
        }
        println!();
    }

    if !report.diagnostics.warnings.is_empty() {
        println!("Warnings:");
        for warning in &report.diagnostics.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}

//! CLI entry point for the forecast-accuracy metrics pipeline.

use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use clap::Parser;
use sop_metrics::config::{MEAN_ACTUAL_RANGE, NOISE_LEVEL_RANGE, RECORD_COUNT_RANGE};
use sop_metrics::{
    AnalysisReport, AnalysisResult, CsvDatasetSource, Pipeline, PipelineConfig, ReportGenerator,
};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "S&OP Forecast Accuracy Metrics",
    long_about = "Computes MAPE, WMAPE, BIAS and Forecast Accuracy for a demand series.\n\n\
                  Without --input a seeded synthetic series is generated from\n\
                  --records, --mean-actual and --noise-level.\n\n\
                  EXAMPLES:\n  \
                  # Synthetic data with the default parameters\n  \
                  sop-metrics\n\n  \
                  # Larger, noisier synthetic series with an HTML report\n  \
                  sop-metrics --records 400 --noise-level 25 --html -o reports/\n\n  \
                  # Real data from a CSV with Date, Actual and Forecast columns\n  \
                  sop-metrics -i demand.csv --json | jq .metrics"
)]
struct Args {
    /// Path to a CSV file with Date, Actual and Forecast columns
    ///
    /// If not specified, a synthetic series is generated
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Number of synthetic records (dashboard range 100 - 500)
    #[arg(long, default_value = "100")]
    records: usize,

    /// Mean of the synthetic actual demand (dashboard range 300 - 700)
    #[arg(long, default_value = "500")]
    mean_actual: u32,

    /// Forecast noise level in percent (dashboard range 0 - 30)
    #[arg(long, default_value = "10")]
    noise_level: u32,

    /// Seed of the synthetic generator
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Date of the first synthetic record (YYYY-MM-DD)
    #[arg(long)]
    start_date: Option<NaiveDate>,

    /// Number of error-distribution bins
    #[arg(long, default_value = "5")]
    bins: usize,

    /// Output directory for written files
    #[arg(short, long, default_value = "./outputs")]
    output: PathBuf,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "sop_report"
    #[arg(long)]
    output_name: Option<String>,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    /// Useful for piping to other tools: `... --json | jq .metrics.MAPE`
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <output_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Write an HTML report with the embedded error-distribution chart
    #[arg(long)]
    html: bool,

    /// Write the plain-text report
    #[arg(long)]
    text: bool,

    /// Export the dataset with its error columns as CSV
    #[arg(long)]
    save_dataset: bool,

    /// Print the first N rows of the dataset with its error columns
    #[arg(long, value_name = "N")]
    preview: Option<usize>,

    /// Print how every metric is computed and exit
    #[arg(long)]
    explain: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
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

    if args.explain {
        print!("{}", ReportGenerator::render_explanations());
        return Ok(());
    }

    if let Some(input) = &args.input {
        if !input.exists() {
            return Err(anyhow!("Input file not found: {}", input.display()));
        }
    }

    // Files are written by the CLI below; the pipeline keeps results in memory
    let mut config_builder = PipelineConfig::builder()
        .record_count(args.records)
        .mean_actual(args.mean_actual)
        .noise_level(args.noise_level)
        .seed(args.seed)
        .bin_count(args.bins)
        .render_charts(args.html)
        .generate_reports(true)
        .save_to_disk(false)
        .output_dir(&args.output);

    if let Some(date) = args.start_date {
        config_builder = config_builder.start_date(date);
    }

    if let Some(ref name) = args.output_name {
        config_builder = config_builder.output_name(name);
    }

    let config = config_builder.build()?;

    if args.input.is_none() && !config.within_dashboard_ranges() {
        warn!(
            "Generator inputs are outside the usual ranges (records {:?}, mean {:?}, noise {:?})",
            RECORD_COUNT_RANGE, MEAN_ACTUAL_RANGE, NOISE_LEVEL_RANGE
        );
    }

    let pipeline = build_pipeline(&args, config.clone())?;
    run_pipeline(pipeline, &args, &config)
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if let Some(input) = &args.input {
        builder = builder.source(CsvDatasetSource::new(input));
    }

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

/// Run pipeline and print results
fn run_pipeline(pipeline: Pipeline, args: &Args, config: &PipelineConfig) -> Result<()> {
    info!("{}", "=".repeat(60));
    info!("Analyzing {}", pipeline.source_description());
    info!("{}", "=".repeat(60));

    let mut result = match pipeline.run() {
        Ok(result) => result,
        Err(e) => {
            error!("Analysis failed: {}", e);
            if let Some(row) = e.row_index() {
                error!("Fix row {} of the input and run again", row);
            }
            return Err(anyhow!("Analysis failed: {}", e));
        }
    };

    let report = result
        .report
        .clone()
        .ok_or_else(|| anyhow!("Analysis finished without a report"))?;

    let written = write_outputs(&mut result, &report, args, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_summary(&result, args.preview);
    if !written.is_empty() {
        println!("FILES WRITTEN");
        println!("{}", "-".repeat(40));
        for path in &written {
            println!("  - {}", path.display());
        }
        println!();
    }

    Ok(())
}

/// Write the artifacts requested on the command line.
fn write_outputs(
    result: &mut AnalysisResult,
    report: &AnalysisReport,
    args: &Args,
    config: &PipelineConfig,
) -> Result<Vec<PathBuf>> {
    let reporter = ReportGenerator::from_config(config);
    let mut written = Vec::new();

    if args.emit_report {
        written.push(reporter.write_report_to_file(report)?);
    }

    if args.text {
        written.push(reporter.write_text_report(&result.summary)?);
    }

    if args.html {
        let chart = result.charts.as_ref().map(|c| &c.error_distribution);
        written.push(reporter.write_html_report(&result.summary, chart)?);
    }

    if args.save_dataset {
        written.push(reporter.write_dataset_csv(&mut result.dataset)?);
    }

    for path in &written {
        info!("Wrote {}", display_relative(path, reporter.output_dir()));
    }
    Ok(written)
}

fn display_relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Print the human-readable summary.
///
/// Uses `println!` on purpose: this is the primary output of the command and
/// must stay visible regardless of the log level.
fn print_summary(result: &AnalysisResult, preview: Option<usize>) {
    println!("\n{}", "=".repeat(60));
    println!("FORECAST ACCURACY");
    println!("{}\n", "=".repeat(60));

    println!("METRICS ({} rows)", result.dataset.height());
    println!("{}", "-".repeat(40));
    for line in result.summary.display_lines() {
        println!("  {}", line);
    }
    println!();

    println!("ERROR DISTRIBUTION");
    println!("{}", "-".repeat(40));
    let max_count = result.histogram.max_count().max(1);
    for (label, count) in result.histogram.pairs() {
        let bar_len = count * 30 / max_count;
        println!("  {:<24} {:>5} {}", label, count, "#".repeat(bar_len));
    }
    println!();

    if let Some(rows) = preview {
        println!("DATA PREVIEW");
        println!("{}", "-".repeat(40));
        println!("{}", result.dataset.head(Some(rows)));
        println!();
    }

    if !result.warnings.is_empty() {
        println!("WARNINGS");
        println!("{}", "-".repeat(40));
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
        println!();
    }

    println!("Completed in {}ms", result.duration_ms);
}

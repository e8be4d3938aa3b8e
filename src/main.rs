use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use stock_outliers::config::Settings;
use stock_outliers::logging::init_tracing;
use stock_outliers::pipeline::{BatchReport, FileOutcome, Pipeline, SkipReason};
use stock_outliers::CancellationToken;

const DEFAULT_CONFIG: &str = "config/settings.yaml";

/// Samples 30 consecutive rows from each exchange CSV and writes the rows
/// lying more than two standard deviations from the window mean.
#[derive(Parser)]
#[command(name = "stock-outliers")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input root with one subdirectory per exchange
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving outliers_<file>.csv
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum CSV files per exchange directory
    #[arg(short = 'n', long)]
    file_limit: Option<usize>,

    /// Seed for reproducible window offsets
    #[arg(long)]
    seed: Option<u64>,

    /// Debug logging unless STOCK_OUTLIERS_LOG is set
    #[arg(short, long)]
    verbose: bool,
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None if PathBuf::from(DEFAULT_CONFIG).exists() => Settings::load(DEFAULT_CONFIG)?,
        None => Settings::default(),
    };

    if let Some(input) = &cli.input {
        settings.input_path = input.clone();
    }
    if let Some(output) = &cli.output {
        settings.output_path = output.clone();
    }
    if let Some(file_limit) = cli.file_limit {
        settings.file_limit = file_limit;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    settings.validate()?;
    Ok(settings)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = load_settings(&cli)?;
    let pipeline = Pipeline::from_settings(&settings);
    let report = pipeline.process_batch(settings.file_limit, &CancellationToken::new());

    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!(
        "\nProcessed {} files from {} directories in {} ms",
        report.files.len(),
        report.directories.len(),
        (report.finished_at - report.started_at).num_milliseconds()
    );
    println!(
        "Written: {}  Skipped: {}  Failed: {}  Outliers: {}",
        report.written(),
        report.skipped(),
        report.failed(),
        report.total_outliers()
    );

    println!("\n{:<50} {:<10} {}", "File", "Status", "Detail");
    println!("{:-<80}", "");
    for file in &report.files {
        let (status, detail) = match &file.outcome {
            FileOutcome::Written {
                output,
                outliers,
                rejected,
            } => (
                "written",
                format!(
                    "{} outliers, {} rows rejected -> {}",
                    outliers,
                    rejected,
                    output.display()
                ),
            ),
            FileOutcome::Skipped(reason) => (
                "skipped",
                match reason {
                    SkipReason::ShortFile => "fewer rows than the window".to_string(),
                    SkipReason::NoValidRows => "no valid rows in window".to_string(),
                    SkipReason::Cancelled => "cancelled".to_string(),
                },
            ),
            FileOutcome::Failed(err) => ("failed", err.to_string()),
        };
        println!("{:<50} {:<10} {}", file.path.display(), status, detail);
    }

    for err in &report.discovery_errors {
        println!("discovery error: {}", err);
    }
}

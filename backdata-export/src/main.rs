use anyhow::{Context, Result};
use backdata_core::config::DEFAULT_CONFIG_FILE;
use backdata_core::{ExportConfig, Exporter};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

mod formatter;

#[derive(Parser)]
#[command(name = "backdata-export")]
#[command(about = "Convert the backdata workbook into dashboard JSON files", long_about = None)]
#[command(version)]
struct Cli {
    /// Workbook to read (defaults to the configured workbook)
    #[arg(value_name = "WORKBOOK")]
    workbook: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory the JSON files are written to
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Run only the named job (repeatable)
    #[arg(long, value_name = "JOB")]
    only: Vec<String>,

    /// List the configured jobs and exit
    #[arg(long)]
    list_jobs: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ExportConfig> {
    if let Some(config_path) = path {
        return ExportConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    // Fall back to the default file in the working directory, then to built-in jobs
    let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_config_path.exists() {
        ExportConfig::from_file(&default_config_path).with_context(|| {
            format!(
                "Failed to load config from {}",
                default_config_path.display()
            )
        })
    } else {
        debug!("no {DEFAULT_CONFIG_FILE} found, using built-in jobs");
        Ok(ExportConfig::default())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    let workbook = cli
        .workbook
        .clone()
        .unwrap_or_else(|| config.global.workbook.clone());
    let out_dir = cli
        .out_dir
        .clone()
        .unwrap_or_else(|| config.global.output_dir.clone());

    let mut exporter = Exporter::with_config(config);
    exporter
        .select_jobs(&cli.only)
        .context("Invalid job selection")?;

    if cli.list_jobs {
        match cli.format {
            OutputFormat::Human => formatter::print_jobs_human(exporter.config(), &exporter.job_names()),
            OutputFormat::Json => formatter::print_jobs_json(exporter.config(), &exporter.job_names())?,
        }
        return Ok(());
    }

    let report = exporter
        .run(&workbook, &out_dir)
        .with_context(|| format!("Failed to export workbook: {}", workbook.display()))?;

    match cli.format {
        OutputFormat::Human => formatter::print_human(&report),
        OutputFormat::Json => formatter::print_json(&report)?,
    }

    // Skipped sheets are not failures
    let exit_code = if report.has_failures() { 1 } else { 0 };
    std::process::exit(exit_code);
}

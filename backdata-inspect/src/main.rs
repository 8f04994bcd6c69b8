use anyhow::{Context, Result};
use backdata_core::columns::DiscoveryLayout;
use backdata_core::reader::{self, Workbook};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

mod probe;

#[derive(Parser)]
#[command(name = "backdata-inspect")]
#[command(about = "Probe the structure of the backdata workbook")]
#[command(version)]
struct Cli {
    /// Path to the workbook
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List sheets with their used size
    Sheets,
    /// Print the first rows of a sheet
    Peek {
        #[arg(short, long)]
        sheet: String,
        #[arg(long, default_value_t = 10)]
        rows: usize,
        #[arg(long, default_value_t = 12)]
        cols: usize,
    },
    /// Search sheet names and header cells for a keyword
    Find {
        keyword: String,
        /// 1-based header row to search
        #[arg(long, default_value_t = 1)]
        header_row: usize,
    },
    /// Preview the columns discovered under a category marker
    Columns {
        #[arg(short, long)]
        sheet: String,
        #[arg(long, default_value = "월평균")]
        marker: String,
        #[arg(long, default_value_t = 1)]
        category_row: usize,
        #[arg(long, default_value_t = 2)]
        label_row: usize,
        /// Keep only columns holding a number in this row
        #[arg(long)]
        probe_row: Option<usize>,
    },
    /// Count rows per period and per year
    Periods {
        #[arg(short, long)]
        sheet: String,
        /// Column number, letters or header label
        #[arg(short, long)]
        column: String,
        #[arg(long, default_value_t = 1)]
        header_row: usize,
    },
    /// Match store-list names against the store names in sales records
    Match {
        #[arg(long, default_value = "매장")]
        stores_sheet: String,
        #[arg(long, default_value = "매장명")]
        stores_column: String,
        #[arg(long, default_value = "실적")]
        records_sheet: String,
        #[arg(long, default_value = "매장명")]
        records_column: String,
        #[arg(long, default_value_t = 1)]
        header_row: usize,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
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

/// Load only the named sheets; every command but `sheets` and `find` needs one or two
fn load(path: &Path, sheets: &[&str]) -> Result<Workbook> {
    let workbook = if sheets.is_empty() {
        reader::read_workbook(path)
    } else {
        reader::read_workbook_filtered(path, |name| sheets.contains(&name))
    };
    let workbook = workbook.with_context(|| format!("Failed to read file: {}", path.display()))?;
    debug!(
        file = %path.display(),
        loaded = workbook.sheets.len(),
        total = workbook.sheet_names.len(),
        "workbook loaded"
    );
    Ok(workbook)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Sheets => {
            let workbook = load(&cli.file, &[])?;
            let summaries = probe::sheet_summaries(&workbook);
            emit(&cli.format, &summaries, || {
                for s in &summaries {
                    match &s.error {
                        Some(reason) => {
                            println!("{} {}", s.name.cyan().bold(), format!("unreadable: {reason}").red())
                        }
                        None => println!(
                            "{} {}x{} {}",
                            s.name.cyan().bold(),
                            s.rows,
                            s.columns,
                            format!("({} merged)", s.merged_regions).bright_black()
                        ),
                    }
                }
            })
        }
        Command::Peek { sheet, rows, cols } => {
            let workbook = load(&cli.file, &[sheet.as_str()])?;
            let sheet = probe::require_sheet(&workbook, sheet)?;
            let peeked = probe::peek(sheet, *rows, *cols);
            emit(&cli.format, &peeked, || {
                for row in &peeked {
                    println!("{} {}", format!("{:>4}", row.row).yellow(), row.cells.join(" | "));
                }
            })
        }
        Command::Find {
            keyword,
            header_row,
        } => {
            let workbook = load(&cli.file, &[])?;
            let hits = probe::find_keyword(&workbook, keyword, header_row.saturating_sub(1));
            emit(&cli.format, &hits, || {
                if hits.is_empty() {
                    println!("{}", format!("No match for '{keyword}'").yellow());
                }
                for hit in &hits {
                    match &hit.cell {
                        Some(cell) => println!("{} {} {}", hit.sheet.cyan().bold(), cell.yellow(), hit.text),
                        None => println!("{} {}", hit.sheet.cyan().bold(), "(sheet name)".bright_black()),
                    }
                }
            })
        }
        Command::Columns {
            sheet,
            marker,
            category_row,
            label_row,
            probe_row,
        } => {
            let workbook = load(&cli.file, &[sheet.as_str()])?;
            let sheet = probe::require_sheet(&workbook, sheet)?;
            let layout = DiscoveryLayout {
                category_row: category_row.saturating_sub(1),
                label_row: label_row.saturating_sub(1),
                marker: marker.clone(),
                probe_row: probe_row.map(|row| row.saturating_sub(1)),
            };
            let columns = probe::preview_columns(sheet, &layout, *label_row);
            emit(&cli.format, &columns, || {
                if columns.is_empty() {
                    println!("{}", format!("No columns under '{marker}'").yellow());
                }
                for column in &columns {
                    println!(
                        "{:>4} {} {}",
                        column.column.yellow(),
                        column.label.cyan(),
                        format!("e.g. {}", column.sample).bright_black()
                    );
                }
            })
        }
        Command::Periods {
            sheet,
            column,
            header_row,
        } => {
            let workbook = load(&cli.file, &[sheet.as_str()])?;
            let sheet = probe::require_sheet(&workbook, sheet)?;
            let header_row = header_row.saturating_sub(1);
            let column = probe::parse_column_arg(column).resolve(sheet, header_row)?;
            let dist = probe::period_distribution(sheet, column, header_row);
            emit(&cli.format, &dist, || {
                println!("{}", "By year:".bold().underline());
                for (year, rows) in &dist.by_year {
                    println!("  {} {}", year.to_string().cyan(), rows);
                }
                println!("{}", "By period:".bold().underline());
                for (period, rows) in &dist.by_period {
                    println!("  {} {}", period.cyan(), rows);
                }
                if dist.unparsed > 0 {
                    println!("  {} {}", "Unparsed:".yellow().bold(), dist.unparsed);
                }
            })
        }
        Command::Match {
            stores_sheet,
            stores_column,
            records_sheet,
            records_column,
            header_row,
        } => {
            let workbook = load(&cli.file, &[stores_sheet.as_str(), records_sheet.as_str()])?;
            let header_row = header_row.saturating_sub(1);

            let sheet = probe::require_sheet(&workbook, stores_sheet)?;
            let column = probe::parse_column_arg(stores_column).resolve(sheet, header_row)?;
            let stores = probe::column_values(sheet, column, header_row);

            let sheet = probe::require_sheet(&workbook, records_sheet)?;
            let column = probe::parse_column_arg(records_column).resolve(sheet, header_row)?;
            let records = probe::column_values(sheet, column, header_row);

            let report = probe::match_stores(&stores, &records);
            emit(&cli.format, &report, || {
                for store in &report.stores {
                    let marker = if store.matched.is_empty() {
                        "MISS".red().bold()
                    } else {
                        "OK".green().bold()
                    };
                    println!("{} {} {}", marker, store.store.cyan(), store.matched.join(", "));
                }
                if !report.unmatched.is_empty() {
                    println!();
                    println!("{}", "Unmatched record names:".bold().underline());
                    for name in &report.unmatched {
                        println!("  {}", name);
                    }
                }
            })
        }
    }
}

/// Print `value` as JSON, or run the human printer
fn emit<T: Serialize>(format: &OutputFormat, value: &T, human: impl FnOnce()) -> Result<()> {
    match format {
        OutputFormat::Human => human(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

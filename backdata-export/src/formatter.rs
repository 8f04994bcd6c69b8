//! Output formatters for export reports

use anyhow::Result;
use backdata_core::{ExportConfig, ExportReport, JobStatus};
use colored::*;

/// Print the report in human-readable format with colors
pub fn print_human(report: &ExportReport) {
    println!(
        "{}",
        format!("Exporting: {}", report.workbook.display()).bold()
    );
    println!("{} {}", "Output:".bold(), report.output_dir.display());
    println!();

    for job in &report.jobs {
        match &job.status {
            JobStatus::Written { files } => {
                println!(
                    "{} {} {}",
                    "OK".green().bold(),
                    job.name.cyan().bold(),
                    format!("[{}]", job.kind).bright_black()
                );
                for file in files {
                    println!(
                        "    {} ({} records)",
                        file.path.display(),
                        file.records
                    );
                }
            }
            JobStatus::Skipped { reason } => {
                println!("{} {} {}", "SKIP".yellow().bold(), job.name.cyan().bold(), reason);
            }
            JobStatus::Failed { error } => {
                println!("{} {} {}", "FAIL".red().bold(), job.name.cyan().bold(), error);
            }
        }
    }

    let (written, skipped, failed) = report.counts();
    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Written:".green().bold(), written);
    if skipped > 0 {
        println!("  {} {}", "Skipped:".yellow().bold(), skipped);
    }
    if failed > 0 {
        println!("  {} {}", "Failed:".red().bold(), failed);
    }
}

/// Print the report in JSON format
pub fn print_json(report: &ExportReport) -> Result<()> {
    let (written, skipped, failed) = report.counts();
    let output = serde_json::json!({
        "workbook": report.workbook.display().to_string(),
        "output_dir": report.output_dir.display().to_string(),
        "jobs": report.jobs,
        "summary": {
            "total": report.jobs.len(),
            "written": written,
            "skipped": skipped,
            "failed": failed,
        }
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

pub fn print_jobs_human(config: &ExportConfig, selected: &[&str]) {
    for job in config.jobs.iter().filter(|j| selected.contains(&j.name.as_str())) {
        println!(
            "{} {} {} {}",
            job.name.cyan().bold(),
            format!("[{}]", job.kind.label()).bright_black(),
            job.sheet,
            format!("-> {}", job.outputs().join(", ")).bright_black()
        );
    }
}

pub fn print_jobs_json(config: &ExportConfig, selected: &[&str]) -> Result<()> {
    let jobs: Vec<_> = config
        .jobs
        .iter()
        .filter(|j| selected.contains(&j.name.as_str()))
        .map(|job| {
            serde_json::json!({
                "name": job.name,
                "kind": job.kind.label(),
                "sheet": job.sheet,
                "outputs": job.outputs(),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&jobs)?);
    Ok(())
}

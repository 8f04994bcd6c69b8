//! Runs the configured jobs against one workbook

use crate::config::ExportConfig;
use crate::error::ExtractError;
use crate::extract::{ExtractContext, SheetExtractor, registry};
use crate::output::write_json;
use crate::reader::{self, Workbook};
use anyhow::{Result, bail};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Main export interface
pub struct Exporter {
    config: ExportConfig,
    extractors: Vec<Box<dyn SheetExtractor>>,
    context: ExtractContext,
}

impl Exporter {
    /// Create an exporter with the built-in job list
    pub fn new() -> Self {
        Self::with_config(ExportConfig::default())
    }

    pub fn with_config(config: ExportConfig) -> Self {
        let extractors = registry::create_extractors(&config);
        let context = ExtractContext {
            aliases: config.store_aliases(),
        };
        Self {
            config,
            extractors,
            context,
        }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Restrict the run to the named jobs
    pub fn select_jobs(&mut self, names: &[String]) -> Result<(), ExtractError> {
        if names.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = names.iter().find(|n| self.config.job(n).is_none()) {
            return Err(ExtractError::InvalidConfig(format!("unknown job '{unknown}'")));
        }
        self.extractors
            .retain(|extractor| names.iter().any(|n| n == extractor.name()));
        Ok(())
    }

    /// Names of the jobs that will run
    pub fn job_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    /// Read the workbook and run every selected job. Only an unreadable
    /// workbook is an error; job failures are recorded in the report.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, workbook: P, out_dir: Q) -> Result<ExportReport> {
        let workbook_path = workbook.as_ref();
        let out_dir = out_dir.as_ref();

        let wanted: HashSet<&str> = self.extractors.iter().map(|e| e.sheet()).collect();
        info!(workbook = %workbook_path.display(), sheets = wanted.len(), "loading workbook");
        let workbook = reader::read_workbook_filtered(workbook_path, |name| wanted.contains(name))?;
        Ok(self.run_loaded(&workbook, out_dir))
    }

    /// Run every selected job against an already loaded workbook
    pub fn run_loaded(&self, workbook: &Workbook, out_dir: &Path) -> ExportReport {
        let mut jobs = Vec::with_capacity(self.extractors.len());
        for extractor in &self.extractors {
            let status = match self.run_job(workbook, extractor.as_ref(), out_dir) {
                Ok(files) => {
                    info!(job = extractor.name(), files = files.len(), "job finished");
                    JobStatus::Written { files }
                }
                Err(e) => match e.downcast_ref::<ExtractError>() {
                    Some(ExtractError::SheetNotFound(_)) => {
                        warn!(job = extractor.name(), "skipping: {e}");
                        JobStatus::Skipped {
                            reason: e.to_string(),
                        }
                    }
                    _ => {
                        error!(job = extractor.name(), "job failed: {e:#}");
                        JobStatus::Failed {
                            error: format!("{e:#}"),
                        }
                    }
                },
            };
            jobs.push(JobReport {
                name: extractor.name().to_string(),
                sheet: extractor.sheet().to_string(),
                kind: extractor.kind().to_string(),
                status,
            });
        }

        ExportReport {
            workbook: workbook.path.clone(),
            output_dir: out_dir.to_path_buf(),
            jobs,
        }
    }

    fn run_job(
        &self,
        workbook: &Workbook,
        extractor: &dyn SheetExtractor,
        out_dir: &Path,
    ) -> Result<Vec<WrittenFile>> {
        let name = extractor.sheet();
        let sheet = match workbook.get_sheet(name) {
            Some(sheet) => sheet,
            None if workbook.has_sheet(name) => bail!(
                "sheet '{name}' could not be read: {}",
                workbook.load_error(name).unwrap_or("not loaded")
            ),
            None => return Err(ExtractError::SheetNotFound(name.to_string()).into()),
        };
        info!(job = extractor.name(), sheet = %sheet.name, "running job");

        // all documents are built before the first file is written
        let outputs = extractor.extract(sheet, &self.context)?;
        let mut written = Vec::with_capacity(outputs.len());
        for output in outputs {
            let path = out_dir.join(&output.file_name);
            write_json(&path, &output.document, self.config.global.pretty)?;
            written.push(WrittenFile {
                path,
                records: output.records,
            });
        }
        Ok(written)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one export run
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub workbook: PathBuf,
    pub output_dir: PathBuf,
    pub jobs: Vec<JobReport>,
}

impl ExportReport {
    pub fn has_failures(&self) -> bool {
        self.jobs.iter().any(|j| matches!(j.status, JobStatus::Failed { .. }))
    }

    /// (written, skipped, failed)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.jobs
            .iter()
            .fold((0, 0, 0), |(w, s, f), job| match job.status {
                JobStatus::Written { .. } => (w + 1, s, f),
                JobStatus::Skipped { .. } => (w, s + 1, f),
                JobStatus::Failed { .. } => (w, s, f + 1),
            })
    }

    pub fn job(&self, name: &str) -> Option<&JobReport> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub name: String,
    pub sheet: String,
    pub kind: String,
    #[serde(flatten)]
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Written { files: Vec<WrittenFile> },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub records: usize,
}

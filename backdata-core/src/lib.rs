//! backdata-core: extraction of dashboard JSON from the retail backdata workbook
//!
//! Each configured job reads one sheet, locates its columns, filters and sums
//! rows where needed, and writes one or more JSON documents.

pub mod aggregate;
pub mod columns;
pub mod config;
pub mod error;
pub mod exporter;
pub mod extract;
pub mod normalize;
pub mod output;
pub mod reader;

pub use config::{ExportConfig, JobConfig, JobKind};
pub use error::ExtractError;
pub use exporter::{ExportReport, Exporter, JobReport, JobStatus, WrittenFile};
pub use extract::{OutputFile, SheetExtractor};

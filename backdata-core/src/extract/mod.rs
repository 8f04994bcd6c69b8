//! Sheet extractors

pub mod competitor;
pub mod group_sales;
pub mod performance;
pub mod registry;
pub mod table;

use crate::normalize::StoreAliases;
use crate::reader::{CellValue, Sheet};
use anyhow::Result;
use serde_json::Value;

/// Trait that every sheet-to-JSON conversion implements
pub trait SheetExtractor: Send + Sync {
    /// Job name from configuration
    fn name(&self) -> &str;

    /// Sheet the job reads
    fn sheet(&self) -> &str;

    /// Short kind label used in reports
    fn kind(&self) -> &'static str;

    /// Convert the sheet into one or more JSON documents
    fn extract(&self, sheet: &Sheet, ctx: &ExtractContext) -> Result<Vec<OutputFile>>;
}

/// Shared state handed to every extractor
#[derive(Debug, Clone, Default)]
pub struct ExtractContext {
    pub aliases: StoreAliases,
}

/// A JSON document ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFile {
    /// Path relative to the output directory
    pub file_name: String,
    pub document: Value,
    /// Number of top-level records in the document
    pub records: usize,
}

/// JSON rendering of a cell: integral numbers as integers, dates as `YYYY-MM-DD`
pub fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::Null,
        CellValue::Number(n) => number_to_json(*n),
        CellValue::Text(s) => Value::String(s.clone()),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::DateTime(_) => Value::String(cell.display_text()),
        CellValue::Error(e) => Value::String(e.clone()),
    }
}

pub fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// 0-based row for a 1-based configured row
pub(crate) fn zero_based(row: usize) -> usize {
    row.saturating_sub(1)
}

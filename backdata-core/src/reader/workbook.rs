//! Workbook data structures

use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use std::path::PathBuf;

static EMPTY: CellValue = CellValue::Empty;

/// Represents the sheets loaded from one workbook file
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub path: PathBuf,
    pub sheets: Vec<Sheet>,
    /// Every sheet name in workbook order, including sheets that were not loaded
    pub sheet_names: Vec<String>,
    /// Wanted sheets that calamine failed to read, with the reason
    pub load_errors: HashMap<String, String>,
}

impl Workbook {
    /// Get a loaded sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names present in the file
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheet_names.iter().map(String::as_str).collect()
    }

    /// Whether the file contains a sheet with this name (loaded or not)
    pub fn has_sheet(&self, name: &str) -> bool {
        self.sheet_names.iter().any(|s| s == name)
    }

    pub fn load_error(&self, name: &str) -> Option<&str> {
        self.load_errors.get(name).map(String::as_str)
    }
}

/// Represents a worksheet as a dense grid addressed by absolute 0-based (row, col)
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
    /// Merged cell ranges: (start_row, start_col, end_row, end_col)
    pub merged_cells: Vec<(u32, u32, u32, u32)>,
}

impl Sheet {
    /// Build a sheet from rows of values (used by tests and probes)
    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: name.into(),
            rows,
            merged_cells: Vec::new(),
        }
    }

    /// Number of rows, counting from row 0
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Get a cell value; cells outside the grid are `Empty`
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Get a whole row; rows outside the grid are empty slices
    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Merged region containing the cell, if any
    pub fn merged_region_at(&self, row: usize, col: usize) -> Option<(u32, u32, u32, u32)> {
        let (row, col) = (row as u32, col as u32);
        self.merged_cells
            .iter()
            .copied()
            .find(|&(r0, c0, r1, c1)| row >= r0 && row <= r1 && col >= c0 && col <= c1)
    }

    /// Cell value with merged regions resolved to their top-left cell
    pub fn get_merged(&self, row: usize, col: usize) -> &CellValue {
        match self.merged_region_at(row, col) {
            Some((r0, c0, _, _)) => self.get(r0 as usize, c0 as usize),
            None => self.get(row, col),
        }
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Excel date serial (days since 1899-12-30, fractional part is time of day)
    DateTime(f64),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Whether the cell holds a number
    pub fn is_number(&self) -> bool {
        matches!(self, CellValue::Number(_))
    }

    /// Trimmed text, only for non-blank text cells
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Numeric coercion that never fails: anything that is not a finite number
    /// (or text parsing to one) becomes 0.0
    pub fn to_number_or_zero(&self) -> f64 {
        let value = match self {
            CellValue::Number(n) => *n,
            CellValue::Boolean(b) => f64::from(u8::from(*b)),
            CellValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            CellValue::Empty | CellValue::DateTime(_) | CellValue::Error(_) => 0.0,
        };
        if value.is_finite() { value } else { 0.0 }
    }

    /// Calendar date for date cells
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::DateTime(serial) => serial_to_date(*serial),
            _ => None,
        }
    }

    /// Text rendering used for prefix filters and header labels.
    /// Integral numbers render without a decimal part, dates as `YYYY-MM-DD`.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::DateTime(serial) => match serial_to_date(*serial) {
                Some(date) => date.format("%Y-%m-%d").to_string(),
                None => format_number(*serial),
            },
            CellValue::Error(e) => e.clone(),
        }
    }
}

/// Render a number the way the dashboard expects integers (no trailing `.0`)
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Convert an Excel 1900-system serial to a date
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31, the last date Excel can represent
    if !serial.is_finite() || !(0.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

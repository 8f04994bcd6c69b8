//! Error conditions callers branch on

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("column {column} not found in header row {row} of sheet '{sheet}'")]
    ColumnNotFound {
        sheet: String,
        column: String,
        row: usize,
    },

    #[error("invalid period '{0}' (expected YYYYMM)")]
    InvalidPeriod(String),

    #[error("configuration error: {0}")]
    InvalidConfig(String),

    #[error("output path '{0}' must be a relative path inside the output directory")]
    InvalidOutputPath(String),
}

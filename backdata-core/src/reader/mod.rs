//! Excel/ODS file reader using calamine

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

pub mod ods_parser;
pub mod parser_utils;
pub mod workbook;
pub mod xml_parser;

pub use workbook::{CellValue, Sheet, Workbook};

/// Read every sheet of a workbook
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    read_workbook_filtered(path, |_| true)
}

/// Read a workbook, loading only the sheets accepted by `wanted`.
/// All sheet names are still recorded so callers can tell "missing" from "not loaded".
/// A sheet calamine cannot read is recorded in `load_errors` instead of failing the file.
pub fn read_workbook_filtered<P, F>(path: P, wanted: F) -> Result<Workbook>
where
    P: AsRef<Path>,
    F: Fn(&str) -> bool,
{
    let path = path.as_ref();
    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

    // calamine does not expose merged regions through the generic reader,
    // so XLSX and ODS archives are also opened as zip for the sheet XML
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let is_xlsx = extension == "xlsx" || extension == "xlsm";
    let is_ods = extension == "ods";

    let mut archive = if is_xlsx || is_ods {
        let file =
            File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
        Some(zip::ZipArchive::new(BufReader::new(file)).context("Failed to open zip archive")?)
    } else {
        None
    };

    let sheet_paths = match archive.as_mut() {
        Some(archive_ref) if is_xlsx => xml_parser::extract_sheet_paths_from_xlsx(archive_ref)
            .unwrap_or_else(|e| {
                warn!("could not resolve worksheet parts: {e}");
                HashMap::new()
            }),
        _ => HashMap::new(),
    };

    let sheet_names = excel.sheet_names();
    let mut sheets = Vec::new();
    let mut load_errors = HashMap::new();

    for (index, sheet_name) in sheet_names.iter().enumerate() {
        if !wanted(sheet_name) {
            continue;
        }

        let range = match excel.worksheet_range(sheet_name) {
            Ok(range) => range,
            Err(e) => {
                warn!("could not read sheet '{sheet_name}': {e}");
                load_errors.insert(sheet_name.clone(), e.to_string());
                continue;
            }
        };
        let mut sheet = parse_sheet(sheet_name, &range);

        if let Some(ref mut archive_ref) = archive {
            let merged = if is_ods {
                ods_parser::extract_merged_cells_from_ods(archive_ref, sheet_name)
            } else {
                let sheet_path = sheet_paths
                    .get(sheet_name)
                    .cloned()
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", index + 1));
                xml_parser::extract_merged_cells_from_xlsx(archive_ref, &sheet_path)
            };
            match merged {
                Ok(merged) => sheet.merged_cells = merged,
                Err(e) => warn!("could not read merged cells of '{sheet_name}': {e}"),
            }
        }

        debug!(
            sheet = %sheet.name,
            rows = sheet.height(),
            cols = sheet.width(),
            merged = sheet.merged_cells.len(),
            "loaded sheet"
        );
        sheets.push(sheet);
    }

    Ok(Workbook {
        path: path.to_path_buf(),
        sheets,
        sheet_names,
        load_errors,
    })
}

/// Convert a calamine range into a dense grid addressed from A1, so column and
/// row positions match what a user sees in the spreadsheet
fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let (start_row, start_col) = match range.start() {
        Some((r, c)) => (r as usize, c as usize),
        None => return Sheet::from_rows(name, Vec::new()),
    };

    let mut rows: Vec<Vec<CellValue>> = vec![Vec::new(); start_row];
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(parse_cell_value));
        // Trailing empties carry no information
        while matches!(cells.last(), Some(CellValue::Empty)) {
            cells.pop();
        }
        rows.push(cells);
    }

    Sheet::from_rows(name, rows)
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{ExcelDateTime, ExcelDateTimeType};

    #[test]
    fn test_parse_sheet_pads_to_absolute_positions() {
        let mut range: Range<Data> = Range::new((1, 2), (2, 3));
        range.set_value((1, 2), Data::String("매장명".into()));
        range.set_value((2, 3), Data::Float(1500.0));

        let sheet = parse_sheet("단체", &range);

        assert_eq!(sheet.get(1, 2), &CellValue::Text("매장명".into()));
        assert_eq!(sheet.get(2, 3), &CellValue::Number(1500.0));
        assert_eq!(sheet.get(0, 0), &CellValue::Empty);
        assert_eq!(sheet.height(), 3);
    }

    #[test]
    fn test_parse_cell_value() {
        assert_eq!(parse_cell_value(&Data::Int(7)), CellValue::Number(7.0));
        assert_eq!(parse_cell_value(&Data::Empty), CellValue::Empty);
        assert_eq!(
            parse_cell_value(&Data::Error(calamine::CellErrorType::Div0)),
            CellValue::Error("#DIV/0!".into())
        );
    }

    #[test]
    fn test_date_and_duration_cells() {
        let date = Data::DateTime(ExcelDateTime::new(45658.0, ExcelDateTimeType::DateTime, false));
        assert_eq!(parse_cell_value(&date), CellValue::DateTime(45658.0));
        assert_eq!(parse_cell_value(&date).display_text(), "2025-01-01");

        let elapsed = Data::DateTime(ExcelDateTime::new(1.5, ExcelDateTimeType::TimeDelta, false));
        assert_eq!(parse_cell_value(&elapsed), CellValue::Number(1.5));
    }
}

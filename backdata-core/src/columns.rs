//! Header-driven column discovery and declarative column references

use crate::error::ExtractError;
use crate::reader::parser_utils::{column_letters, parse_column_letters};
use crate::reader::{CellValue, Sheet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Where to look for a run of columns grouped under a category header.
/// Rows are 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryLayout {
    /// Row holding category labels such as `월평균`, usually merged across the run
    pub category_row: usize,
    /// Row holding one label per column (brand names)
    pub label_row: usize,
    /// Substring a category must contain for its columns to be in scope
    pub marker: String,
    /// When set, a column is kept only if its cell in this row is numeric
    pub probe_row: Option<usize>,
}

/// A column found by discovery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredColumn {
    /// 0-based column index
    pub index: usize,
    pub label: String,
}

/// Find the labelled columns under the first category containing the marker.
///
/// The category row is walked left to right. A text cell starts a new category,
/// an empty cell continues the previous one, and cells inside a merged region
/// read as the region's top-left value. The scan ends at the first category
/// outside the marker once the run has started.
pub fn discover_columns(sheet: &Sheet, layout: &DiscoveryLayout) -> Vec<DiscoveredColumn> {
    let mut columns = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<String> = None;
    let mut started = false;

    for col in 0..sheet.width() {
        match sheet.get_merged(layout.category_row, col) {
            CellValue::Text(s) if !s.trim().is_empty() => current = Some(s.trim().to_string()),
            // empty cells and non-text values leave the category unchanged
            _ => {}
        }

        let in_scope = current
            .as_deref()
            .is_some_and(|category| category.contains(layout.marker.as_str()));
        if !in_scope {
            if started {
                break;
            }
            continue;
        }
        started = true;

        let Some(label) = sheet.get(layout.label_row, col).as_text() else {
            continue;
        };
        if let Some(probe_row) = layout.probe_row {
            if !sheet.get(probe_row, col).is_number() {
                debug!(column = %column_letters(col), label, "no numeric value in probe row");
                continue;
            }
        }
        if seen.insert(label.to_string()) {
            columns.push(DiscoveredColumn {
                index: col,
                label: label.to_string(),
            });
        }
    }

    debug!(
        sheet = %sheet.name,
        marker = %layout.marker,
        found = columns.len(),
        "column discovery finished"
    );
    columns
}

/// A column named in configuration: a 1-based number, letters like `"T"`,
/// or a header label looked up in the job's header row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Number(usize),
    Letters(String),
    Header { header: String },
}

impl ColumnRef {
    pub fn letters(letters: &str) -> Self {
        ColumnRef::Letters(letters.to_string())
    }

    pub fn header(header: &str) -> Self {
        ColumnRef::Header {
            header: header.to_string(),
        }
    }

    /// Check the reference without a sheet; header lookups always pass
    pub fn validate(&self) -> Result<(), ExtractError> {
        match self {
            ColumnRef::Number(0) => Err(ExtractError::InvalidConfig(
                "column numbers start at 1".to_string(),
            )),
            ColumnRef::Letters(letters) if parse_column_letters(letters).is_none() => {
                Err(ExtractError::InvalidConfig(format!(
                    "'{letters}' is not a column (expected 1 to 3 uppercase letters)"
                )))
            }
            ColumnRef::Header { header } if header.trim().is_empty() => Err(
                ExtractError::InvalidConfig("column header must not be empty".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// 0-based column index in `sheet`; `header_row` is 0-based
    pub fn resolve(&self, sheet: &Sheet, header_row: usize) -> Result<usize, ExtractError> {
        let not_found = || ExtractError::ColumnNotFound {
            sheet: sheet.name.clone(),
            column: self.to_string(),
            row: header_row + 1,
        };
        match self {
            ColumnRef::Number(n) => n.checked_sub(1).ok_or_else(not_found),
            ColumnRef::Letters(letters) => parse_column_letters(letters).ok_or_else(not_found),
            ColumnRef::Header { header } => sheet
                .row(header_row)
                .iter()
                .position(|cell| cell.display_text().trim() == header.trim())
                .ok_or_else(not_found),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Number(n) => write!(f, "#{n}"),
            ColumnRef::Letters(letters) => write!(f, "{letters}"),
            ColumnRef::Header { header } => write!(f, "'{header}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    /// Competitor layout: A = store, B..D under 월평균, E..F under 전년비
    fn competitor_sheet() -> Sheet {
        let mut sheet = Sheet::from_rows(
            "경쟁사",
            vec![
                vec![
                    text("구분"),
                    text("월평균 (단위: 천원)"),
                    CellValue::Empty,
                    CellValue::Empty,
                    text("전년비"),
                    CellValue::Empty,
                ],
                vec![
                    text("백화점"),
                    text("MLB"),
                    text(" 디스커버리 "),
                    text("MLB"),
                    text("MLB"),
                    text("NBA"),
                ],
                vec![
                    text("롯데본점"),
                    CellValue::Number(5200.0),
                    CellValue::Number(3100.0),
                    CellValue::Number(1.0),
                    CellValue::Number(0.9),
                    CellValue::Number(1.1),
                ],
            ],
        );
        sheet.merged_cells.push((0, 1, 0, 3));
        sheet
    }

    fn layout() -> DiscoveryLayout {
        DiscoveryLayout {
            category_row: 0,
            label_row: 1,
            marker: "월평균".to_string(),
            probe_row: None,
        }
    }

    #[test]
    fn test_discovers_run_under_marker() {
        let columns = discover_columns(&competitor_sheet(), &layout());
        assert_eq!(
            columns,
            vec![
                DiscoveredColumn {
                    index: 1,
                    label: "MLB".into()
                },
                DiscoveredColumn {
                    index: 2,
                    label: "디스커버리".into()
                },
            ]
        );
    }

    #[test]
    fn test_unmerged_blank_cells_carry_category() {
        let mut sheet = competitor_sheet();
        sheet.merged_cells.clear();
        let labels: Vec<String> = discover_columns(&sheet, &layout())
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["MLB", "디스커버리"]);
    }

    #[test]
    fn test_no_marker_yields_nothing() {
        let mut layout = layout();
        layout.marker = "주간".to_string();
        assert!(discover_columns(&competitor_sheet(), &layout).is_empty());
        assert!(discover_columns(&Sheet::from_rows("빈시트", vec![]), &layout).is_empty());
    }

    #[test]
    fn test_non_text_category_cells_are_ignored() {
        let sheet = Sheet::from_rows(
            "경쟁사",
            vec![
                vec![text("월평균"), CellValue::Number(2025.0), text("합계")],
                vec![text("A"), text("B"), text("C")],
            ],
        );
        let labels: Vec<String> = discover_columns(&sheet, &layout())
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["A", "B"]);
    }

    #[test]
    fn test_probe_row_requires_numbers() {
        let mut sheet = competitor_sheet();
        sheet.rows[2][2] = text("-");
        let mut layout = layout();
        layout.probe_row = Some(2);
        let labels: Vec<String> = discover_columns(&sheet, &layout)
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["MLB"]);
    }

    #[test]
    fn test_column_ref_resolution() {
        let sheet = competitor_sheet();
        assert_eq!(ColumnRef::Number(3).resolve(&sheet, 1).unwrap(), 2);
        assert_eq!(ColumnRef::letters("T").resolve(&sheet, 1).unwrap(), 19);
        assert_eq!(ColumnRef::header("백화점").resolve(&sheet, 1).unwrap(), 0);
        assert_eq!(ColumnRef::header("디스커버리").resolve(&sheet, 1).unwrap(), 2);

        let err = ColumnRef::header("판매액").resolve(&sheet, 1).unwrap_err();
        assert!(matches!(err, ExtractError::ColumnNotFound { row: 2, .. }));
    }

    #[test]
    fn test_column_ref_validation() {
        assert!(ColumnRef::Number(0).validate().is_err());
        assert!(ColumnRef::letters("t").validate().is_err());
        assert!(ColumnRef::letters("ABCD").validate().is_err());
        assert!(ColumnRef::header(" ").validate().is_err());
        assert!(ColumnRef::letters("AB").validate().is_ok());
    }
}

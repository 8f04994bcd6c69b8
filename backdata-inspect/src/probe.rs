//! Workbook probes behind the inspect subcommands

use backdata_core::aggregate::Totals;
use backdata_core::columns::{ColumnRef, DiscoveredColumn, DiscoveryLayout, discover_columns};
use backdata_core::normalize::{Period, match_store_name};
use backdata_core::reader::parser_utils::{column_letters, parse_column_letters};
use backdata_core::reader::{Sheet, Workbook};
use backdata_core::ExtractError;
use serde::Serialize;

#[derive(Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub merged_regions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One entry per sheet in workbook order, unreadable sheets included
pub fn sheet_summaries(workbook: &Workbook) -> Vec<SheetSummary> {
    workbook
        .sheet_names
        .iter()
        .filter_map(|name| match workbook.get_sheet(name) {
            Some(sheet) => Some(SheetSummary {
                name: sheet.name.clone(),
                rows: sheet.height(),
                columns: sheet.width(),
                merged_regions: sheet.merged_cells.len(),
                error: None,
            }),
            None => workbook.load_error(name).map(|reason| SheetSummary {
                name: name.clone(),
                rows: 0,
                columns: 0,
                merged_regions: 0,
                error: Some(reason.to_string()),
            }),
        })
        .collect()
}

#[derive(Serialize)]
pub struct PeekRow {
    /// 1-based row number
    pub row: usize,
    pub cells: Vec<String>,
}

/// The first `rows` rows, `cols` columns wide, as display text
pub fn peek(sheet: &Sheet, rows: usize, cols: usize) -> Vec<PeekRow> {
    (0..rows.min(sheet.height()))
        .map(|row| PeekRow {
            row: row + 1,
            cells: (0..cols).map(|col| sheet.get(row, col).display_text()).collect(),
        })
        .collect()
}

#[derive(Debug, PartialEq, Serialize)]
pub struct KeywordHit {
    pub sheet: String,
    /// Cell reference like `C1`, or `None` when the sheet name itself matched
    pub cell: Option<String>,
    pub text: String,
}

/// Search sheet names and one header row of every sheet for a keyword
pub fn find_keyword(workbook: &Workbook, keyword: &str, header_row: usize) -> Vec<KeywordHit> {
    let mut hits = Vec::new();
    for sheet in &workbook.sheets {
        if sheet.name.contains(keyword) {
            hits.push(KeywordHit {
                sheet: sheet.name.clone(),
                cell: None,
                text: sheet.name.clone(),
            });
        }
        for (col, cell) in sheet.row(header_row).iter().enumerate() {
            let text = cell.display_text();
            if text.contains(keyword) {
                hits.push(KeywordHit {
                    sheet: sheet.name.clone(),
                    cell: Some(format!("{}{}", column_letters(col), header_row + 1)),
                    text,
                });
            }
        }
    }
    hits
}

#[derive(Serialize)]
pub struct ColumnPreview {
    pub column: String,
    pub label: String,
    /// First data value under the label, for eyeballing alignment
    pub sample: String,
}

pub fn preview_columns(
    sheet: &Sheet,
    layout: &DiscoveryLayout,
    sample_row: usize,
) -> Vec<ColumnPreview> {
    discover_columns(sheet, layout)
        .into_iter()
        .map(|DiscoveredColumn { index, label }| ColumnPreview {
            column: column_letters(index),
            label,
            sample: sheet.get(sample_row, index).display_text(),
        })
        .collect()
}

#[derive(Debug, Default, Serialize)]
pub struct PeriodDistribution {
    /// (period, rows) in first-seen order
    pub by_period: Vec<(String, usize)>,
    pub by_year: Vec<(u16, usize)>,
    /// Rows whose period cell could not be parsed
    pub unparsed: usize,
}

/// Count rows below the header by period and by year
pub fn period_distribution(sheet: &Sheet, column: usize, header_row: usize) -> PeriodDistribution {
    let mut by_period = Totals::new();
    let mut by_year = Totals::new();
    let mut unparsed = 0;

    for row in header_row + 1..sheet.height() {
        let cell = sheet.get(row, column);
        if cell.is_empty() {
            continue;
        }
        match Period::from_cell(cell) {
            Some(period) => {
                by_period.add(period, 1.0);
                by_year.add(period.year, 1.0);
            }
            None => unparsed += 1,
        }
    }

    let mut by_period: Vec<(String, usize)> = by_period
        .into_entries()
        .into_iter()
        .map(|(period, count)| (period.to_string(), count as usize))
        .collect();
    by_period.sort();
    let mut by_year: Vec<(u16, usize)> = by_year
        .into_entries()
        .into_iter()
        .map(|(year, count)| (year, count as usize))
        .collect();
    by_year.sort();

    PeriodDistribution {
        by_period,
        by_year,
        unparsed,
    }
}

#[derive(Debug, Default, Serialize)]
pub struct StoreMatch {
    pub store: String,
    /// Distinct record names that refer to this store
    pub matched: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct MatchReport {
    pub stores: Vec<StoreMatch>,
    /// Record names no store claims
    pub unmatched: Vec<String>,
}

/// Pair store-list names with the store names used in sales records
pub fn match_stores(stores: &[String], records: &[String]) -> MatchReport {
    let mut distinct: Vec<&String> = Vec::new();
    for name in records {
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }

    let report_stores: Vec<StoreMatch> = stores
        .iter()
        .map(|store| StoreMatch {
            store: store.clone(),
            matched: distinct
                .iter()
                .filter(|record| match_store_name(store, record))
                .map(|record| record.to_string())
                .collect(),
        })
        .collect();

    let unmatched = distinct
        .into_iter()
        .filter(|record| !stores.iter().any(|store| match_store_name(store, record)))
        .cloned()
        .collect();

    MatchReport {
        stores: report_stores,
        unmatched,
    }
}

/// Non-blank trimmed values of one column below the header
pub fn column_values(sheet: &Sheet, column: usize, header_row: usize) -> Vec<String> {
    (header_row + 1..sheet.height())
        .map(|row| sheet.get(row, column).display_text().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Column argument as typed on the command line: `3`, `T`, or a header label
pub fn parse_column_arg(arg: &str) -> ColumnRef {
    let arg = arg.trim();
    if let Ok(number) = arg.parse::<usize>() {
        ColumnRef::Number(number)
    } else if parse_column_letters(arg).is_some() {
        ColumnRef::letters(arg)
    } else {
        ColumnRef::header(arg)
    }
}

pub fn require_sheet<'a>(workbook: &'a Workbook, name: &str) -> anyhow::Result<&'a Sheet> {
    if let Some(reason) = workbook.load_error(name) {
        anyhow::bail!("sheet '{name}' could not be read: {reason}");
    }
    workbook
        .get_sheet(name)
        .ok_or_else(|| ExtractError::SheetNotFound(name.to_string()).into())
}

//! Generic row-to-object transcription

use super::{ExtractContext, OutputFile, SheetExtractor, cell_to_json, zero_based};
use crate::columns::ColumnRef;
use crate::config::TableJob;
use crate::reader::Sheet;
use anyhow::Result;
use serde_json::{Map, Value, json};
use tracing::debug;

pub struct TableExtractor {
    name: String,
    sheet: String,
    output: String,
    job: TableJob,
}

impl TableExtractor {
    pub fn new(name: &str, sheet: &str, output: &str, job: &TableJob) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            output: output.to_string(),
            job: job.clone(),
        }
    }
}

impl SheetExtractor for TableExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self) -> &str {
        &self.sheet
    }

    fn kind(&self) -> &'static str {
        "table"
    }

    fn extract(&self, sheet: &Sheet, _ctx: &ExtractContext) -> Result<Vec<OutputFile>> {
        Ok(vec![transcribe(sheet, &self.job, &self.output)?])
    }
}

/// Header text used as a JSON key; blank headers have no key
fn header_key(sheet: &Sheet, row: usize, col: usize) -> Option<String> {
    let text = sheet.get(row, col).display_text();
    (!text.trim().is_empty()).then_some(text)
}

/// Transcribe the rows below `job.header_row` into `{headers, data, total_rows}`
pub fn transcribe(sheet: &Sheet, job: &TableJob, file_name: &str) -> Result<OutputFile> {
    let header_row = zero_based(job.header_row);
    let header_cells = sheet.row(header_row);

    // (column, key) pairs in output order
    let (headers, columns): (Vec<Value>, Vec<(usize, String)>) = if job.columns.is_empty() {
        let headers = header_cells.iter().map(cell_to_json).collect();
        let columns = (0..header_cells.len())
            .filter_map(|col| header_key(sheet, header_row, col).map(|key| (col, key)))
            .collect();
        (headers, columns)
    } else {
        let mut columns = Vec::with_capacity(job.columns.len());
        for name in &job.columns {
            let col = ColumnRef::header(name).resolve(sheet, header_row)?;
            columns.push((col, name.clone()));
        }
        let headers = job.columns.iter().map(|c| Value::String(c.clone())).collect();
        (headers, columns)
    };

    let filter = match &job.filter {
        Some(filter) => Some((filter.column.resolve(sheet, header_row)?, &filter.prefixes)),
        None => None,
    };

    let mut data = Vec::new();
    let mut filtered_out = 0usize;
    for row in header_row + 1..sheet.height() {
        if let Some((col, prefixes)) = filter {
            let text = sheet.get(row, col).display_text();
            if !prefixes.iter().any(|p| text.trim().starts_with(p.as_str())) {
                filtered_out += 1;
                continue;
            }
        }

        let mut object = Map::new();
        let mut has_data = false;
        for (col, key) in &columns {
            let value = cell_to_json(sheet.get(row, *col));
            has_data |= !(value.is_null() || value == "");
            object.insert(key.clone(), value);
        }
        if has_data {
            data.push(Value::Object(object));
        }
    }

    debug!(
        sheet = %sheet.name,
        rows = data.len(),
        filtered_out,
        "transcribed sheet"
    );

    let records = data.len();
    Ok(OutputFile {
        file_name: file_name.to_string(),
        document: json!({
            "headers": headers,
            "data": data,
            "total_rows": records,
        }),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrefixFilter;
    use crate::error::ExtractError;
    use crate::reader::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn store_sheet() -> Sheet {
        Sheet::from_rows(
            "매장",
            vec![
                vec![text("매장코드"), text("매장명"), CellValue::Empty, text("오픈일")],
                vec![
                    CellValue::Number(1001.0),
                    text("롯데본점"),
                    text("메모"),
                    CellValue::DateTime(45658.0),
                ],
                vec![CellValue::Empty, text(""), CellValue::Empty, CellValue::Empty],
                vec![
                    CellValue::Number(1002.0),
                    text("신세계강남"),
                    CellValue::Empty,
                    CellValue::Number(0.5),
                ],
            ],
        )
    }

    #[test]
    fn test_transcribe_whole_sheet() {
        let file = transcribe(&store_sheet(), &TableJob::default(), "store_data.json").unwrap();
        assert_eq!(file.records, 2);
        assert_eq!(
            file.document,
            json!({
                "headers": ["매장코드", "매장명", null, "오픈일"],
                "data": [
                    {"매장코드": 1001, "매장명": "롯데본점", "오픈일": "2025-01-01"},
                    {"매장코드": 1002, "매장명": "신세계강남", "오픈일": 0.5},
                ],
                "total_rows": 2,
            })
        );
    }

    #[test]
    fn test_repeated_header_keeps_last_value() {
        let sheet = Sheet::from_rows(
            "실적",
            vec![
                vec![text("판매액"), text("판매액")],
                vec![CellValue::Number(1.0), CellValue::Number(2.0)],
            ],
        );
        let file = transcribe(&sheet, &TableJob::default(), "out.json").unwrap();
        assert_eq!(file.document["data"], json!([{"판매액": 2}]));
    }

    #[test]
    fn test_projection_and_prefix_filter() {
        let sheet = Sheet::from_rows(
            "매장별스타일판매",
            vec![
                vec![text("일자"), text("매장명"), text("품번"), text("판매액합계")],
                vec![CellValue::Number(20230105.0), text("롯데본점"), text("A1"), CellValue::Number(10.0)],
                vec![CellValue::Number(20240105.0), text("롯데본점"), text("A2"), CellValue::Number(20.0)],
                vec![text("2025-03-01"), text("신세계강남"), text("A3"), CellValue::Number(30.0)],
            ],
        );
        let job = TableJob {
            header_row: 1,
            columns: vec!["매장명".into(), "판매액합계".into()],
            filter: Some(PrefixFilter {
                column: ColumnRef::header("일자"),
                prefixes: vec!["2024".into(), "2025".into()],
            }),
        };

        let file = transcribe(&sheet, &job, "style.json").unwrap();
        assert_eq!(
            file.document,
            json!({
                "headers": ["매장명", "판매액합계"],
                "data": [
                    {"매장명": "롯데본점", "판매액합계": 20},
                    {"매장명": "신세계강남", "판매액합계": 30},
                ],
                "total_rows": 2,
            })
        );
    }

    #[test]
    fn test_missing_projected_column_fails() {
        let job = TableJob {
            columns: vec!["시즌".into()],
            ..TableJob::default()
        };
        let err = transcribe(&store_sheet(), &job, "out.json").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtractError>(),
            Some(ExtractError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let sheet = Sheet::from_rows("주간회의", vec![vec![text("주차"), text("내용")]]);
        let file = transcribe(&sheet, &TableJob::default(), "weekly.json").unwrap();
        assert_eq!(file.records, 0);
        assert_eq!(file.document["total_rows"], json!(0));
    }
}

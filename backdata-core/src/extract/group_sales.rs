//! Small group sales summed per store

use super::{ExtractContext, OutputFile, SheetExtractor, number_to_json, zero_based};
use crate::aggregate::Totals;
use crate::config::GroupSalesJob;
use crate::reader::Sheet;
use anyhow::Result;
use serde_json::{Map, Value, json};
use tracing::debug;

pub struct GroupSalesExtractor {
    name: String,
    sheet: String,
    output: String,
    job: GroupSalesJob,
}

impl GroupSalesExtractor {
    pub fn new(name: &str, sheet: &str, output: &str, job: &GroupSalesJob) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            output: output.to_string(),
            job: job.clone(),
        }
    }
}

impl SheetExtractor for GroupSalesExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self) -> &str {
        &self.sheet
    }

    fn kind(&self) -> &'static str {
        "group_sales"
    }

    fn extract(&self, sheet: &Sheet, ctx: &ExtractContext) -> Result<Vec<OutputFile>> {
        let header_row = zero_based(self.job.header_row);
        let store_col = self.job.store_column.resolve(sheet, header_row)?;
        let period_col = self.job.period_column.resolve(sheet, header_row)?;
        let value_col = self.job.value_column.resolve(sheet, header_row)?;

        let mut totals = Totals::new();
        let mut out_of_range = 0usize;
        for row in header_row + 1..sheet.height() {
            let store = sheet.get(row, store_col).display_text();
            if store.trim().is_empty() {
                continue;
            }
            if !self.job.range.accepts(sheet.get(row, period_col)) {
                out_of_range += 1;
                continue;
            }
            totals.add(
                ctx.aliases.normalize(&store),
                sheet.get(row, value_col).to_number_or_zero(),
            );
        }

        debug!(
            sheet = %sheet.name,
            range = %self.job.range,
            stores = totals.len(),
            out_of_range,
            "summed group sales"
        );

        let stores: Vec<Value> = totals
            .iter()
            .map(|(store, total)| {
                let mut record = Map::new();
                record.insert(self.job.key_label.clone(), Value::String(store.clone()));
                record.insert(self.job.value_label.clone(), number_to_json(total));
                Value::Object(record)
            })
            .collect();

        let records = stores.len();
        Ok(vec![OutputFile {
            file_name: self.output.clone(),
            document: json!({
                "stores": stores,
                "total_stores": records,
            }),
            records,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::ColumnRef;
    use crate::normalize::{Period, PeriodRange, StoreAliases, default_aliases};
    use crate::reader::CellValue;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn row(store: CellValue, period: CellValue, value: CellValue) -> Vec<CellValue> {
        vec![CellValue::Empty, store, period, value]
    }

    fn job() -> GroupSalesJob {
        GroupSalesJob {
            header_row: 1,
            store_column: ColumnRef::letters("B"),
            period_column: ColumnRef::letters("C"),
            value_column: ColumnRef::header("판매액"),
            range: PeriodRange::new(
                Period::new(2025, 1).unwrap(),
                Period::new(2025, 11).unwrap(),
            ),
            key_label: "매장명".to_string(),
            value_label: "소량단체판매액".to_string(),
        }
    }

    fn group_sheet() -> Sheet {
        Sheet::from_rows(
            "단체",
            vec![
                vec![text("No"), text("매장"), text("월"), text("판매액")],
                row(text("롯데본점"), CellValue::Number(202501.0), CellValue::Number(1000.0)),
                row(text("더현대 서울"), text("202503"), CellValue::Number(500.0)),
                row(text("롯데본점"), CellValue::Number(202511.0), text("250")),
                row(text("롯데본점"), CellValue::Number(202512.0), CellValue::Number(9999.0)),
                row(text("현대서울"), CellValue::Number(202502.0), text("n/a")),
                row(CellValue::Empty, CellValue::Number(202501.0), CellValue::Number(7.0)),
                row(text("신세계강남"), text("합계"), CellValue::Number(7.0)),
                row(text("더현대서울"), CellValue::Number(202504.0), CellValue::Number(0.5)),
            ],
        )
    }

    #[test]
    fn test_group_sales_totals() {
        let ctx = ExtractContext {
            aliases: StoreAliases::new(&default_aliases()),
        };
        let extractor = GroupSalesExtractor::new("단체", "단체", "group.json", &job());
        let files = extractor.extract(&group_sheet(), &ctx).unwrap();

        assert_eq!(
            files[0].document,
            json!({
                "stores": [
                    {"매장명": "롯데본점", "소량단체판매액": 1250},
                    {"매장명": "더현대서울", "소량단체판매액": 500.5},
                ],
                "total_stores": 2,
            })
        );
        assert_eq!(files[0].records, 2);
    }

    #[test]
    fn test_custom_labels() {
        let mut job = job();
        job.key_label = "store".to_string();
        job.value_label = "sales".to_string();
        let extractor = GroupSalesExtractor::new("단체", "단체", "group.json", &job);
        let files = extractor
            .extract(&group_sheet(), &ExtractContext::default())
            .unwrap();

        // without aliases the spelling variants stay separate
        assert_eq!(files[0].records, 4);
        assert_eq!(
            files[0].document["stores"][0],
            json!({"store": "롯데본점", "sales": 1250})
        );
    }

    #[test]
    fn test_unknown_header_fails() {
        let mut job = job();
        job.value_column = ColumnRef::header("금액");
        let extractor = GroupSalesExtractor::new("단체", "단체", "group.json", &job);
        assert!(
            extractor
                .extract(&group_sheet(), &ExtractContext::default())
                .is_err()
        );
    }
}

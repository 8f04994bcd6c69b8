//! Store performance: transcription, per-period summary and yearly comparison

use super::table::transcribe;
use super::{ExtractContext, OutputFile, SheetExtractor, number_to_json, zero_based};
use crate::aggregate::Totals;
use crate::config::{PerformanceJob, SummaryConfig, YearlyConfig};
use crate::normalize::{Period, match_store_name};
use crate::reader::Sheet;
use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tracing::debug;

pub struct PerformanceExtractor {
    name: String,
    sheet: String,
    output: String,
    job: PerformanceJob,
}

impl PerformanceExtractor {
    pub fn new(name: &str, sheet: &str, output: &str, job: &PerformanceJob) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            output: output.to_string(),
            job: job.clone(),
        }
    }

    /// Rows with a store name; the period is `None` when it cannot be parsed
    fn sales_rows(&self, sheet: &Sheet) -> Result<Vec<SalesRow>> {
        let header_row = zero_based(self.job.table.header_row);
        let store_col = self.job.store_column.resolve(sheet, header_row)?;
        let period_col = self.job.period_column.resolve(sheet, header_row)?;
        let value_col = self.job.value_column.resolve(sheet, header_row)?;

        let rows = (header_row + 1..sheet.height())
            .filter_map(|row| {
                let store = sheet.get(row, store_col).display_text().trim().to_string();
                (!store.is_empty()).then(|| SalesRow {
                    period: Period::from_cell(sheet.get(row, period_col)),
                    store,
                    amount: sheet.get(row, value_col).to_number_or_zero(),
                })
            })
            .collect();
        Ok(rows)
    }
}

struct SalesRow {
    period: Option<Period>,
    store: String,
    amount: f64,
}

impl SheetExtractor for PerformanceExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self) -> &str {
        &self.sheet
    }

    fn kind(&self) -> &'static str {
        "performance"
    }

    fn extract(&self, sheet: &Sheet, ctx: &ExtractContext) -> Result<Vec<OutputFile>> {
        let mut files = vec![transcribe(sheet, &self.job.table, &self.output)?];
        if self.job.summary.is_none() && self.job.yearly.is_none() {
            return Ok(files);
        }

        let rows = self.sales_rows(sheet)?;
        if let Some(summary) = &self.job.summary {
            files.push(summarize(&rows, summary, ctx));
        }
        if let Some(yearly) = &self.job.yearly {
            files.push(yearly_report(&rows, yearly, ctx));
        }
        Ok(files)
    }
}

/// Sum sales per (period, normalized store)
fn summarize(rows: &[SalesRow], config: &SummaryConfig, ctx: &ExtractContext) -> OutputFile {
    let mut totals = Totals::new();
    for row in rows {
        let Some(period) = row.period else {
            continue;
        };
        if config.range.is_some_and(|range| !range.contains(period)) {
            continue;
        }
        totals.add((period, ctx.aliases.normalize(&row.store)), row.amount);
    }

    let records: Vec<Value> = totals
        .iter()
        .map(|((period, store), total)| {
            json!({
                "판매시점": period.to_string(),
                "매장명": store,
                "판매액": number_to_json(total),
            })
        })
        .collect();
    debug!(records = records.len(), "summarized performance");

    let count = records.len();
    OutputFile {
        file_name: config.output.clone(),
        document: json!({
            "records": records,
            "total_records": count,
        }),
        records: count,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPerformance {
    /// `"1월"` .. `"12월"`
    pub month: String,
    /// Revenue in units of 10,000
    pub revenue: i64,
    /// Previous year's revenue for the same month, same unit
    pub target: i64,
    pub growth_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePerformance {
    pub monthly_performance: Vec<MonthlyPerformance>,
    pub year_to_date_revenue: i64,
    pub year_to_date_last_year: i64,
    /// Year-to-date growth in percent, one decimal
    pub growth_rate: f64,
}

/// Monthly revenue against the previous year for one store's rows
pub fn store_performance<I>(rows: I, year: u16, through_month: u8) -> StorePerformance
where
    I: IntoIterator<Item = (Period, f64)>,
{
    let mut current = [0.0f64; 12];
    let mut last_year = [0.0f64; 12];
    for (period, amount) in rows {
        let slot = usize::from(period.month) - 1;
        if period.year == year {
            current[slot] += amount;
        } else if period.year + 1 == year {
            last_year[slot] += amount;
        }
    }

    let mut monthly_performance = Vec::with_capacity(12);
    let mut year_to_date_revenue = 0;
    let mut year_to_date_last_year = 0;
    for month in 1..=12u8 {
        let slot = usize::from(month) - 1;
        let revenue = in_ten_thousands(current[slot]);
        let target = in_ten_thousands(last_year[slot]);
        monthly_performance.push(MonthlyPerformance {
            month: format!("{month}월"),
            revenue,
            target,
            growth_rate: growth(revenue, target),
        });
        if month <= through_month {
            year_to_date_revenue += revenue;
            year_to_date_last_year += target;
        }
    }

    StorePerformance {
        monthly_performance,
        year_to_date_revenue,
        year_to_date_last_year,
        growth_rate: (growth(year_to_date_revenue, year_to_date_last_year) * 10.0).round() / 10.0,
    }
}

fn in_ten_thousands(amount: f64) -> i64 {
    (amount / 10_000.0).round() as i64
}

fn growth(current: i64, previous: i64) -> f64 {
    if previous > 0 {
        (current - previous) as f64 / previous as f64 * 100.0
    } else {
        0.0
    }
}

/// Yearly comparison for each configured store, or for every store in the sheet
fn yearly_report(rows: &[SalesRow], config: &YearlyConfig, ctx: &ExtractContext) -> OutputFile {
    let dated: Vec<(Period, &SalesRow)> = rows
        .iter()
        .filter_map(|row| row.period.map(|period| (period, row)))
        .collect();

    let mut stores = Map::new();
    if config.stores.is_empty() {
        let mut groups: Vec<(String, Vec<(Period, f64)>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for (period, row) in &dated {
            let name = ctx.aliases.normalize(&row.store);
            let slot = *index.entry(name.clone()).or_insert_with(|| {
                groups.push((name, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push((*period, row.amount));
        }
        for (name, sales) in groups {
            let report = store_performance(sales, config.year, config.through_month);
            stores.insert(name, json!(report));
        }
    } else {
        for name in &config.stores {
            let report = store_performance(
                dated
                    .iter()
                    .filter(|(_, row)| match_store_name(name, &row.store))
                    .map(|(period, row)| (*period, row.amount)),
                config.year,
                config.through_month,
            );
            stores.insert(name.clone(), json!(report));
        }
    }

    let count = stores.len();
    OutputFile {
        file_name: config.output.clone(),
        document: json!({
            "year": config.year,
            "throughMonth": config.through_month,
            "stores": stores,
        }),
        records: count,
    }
}

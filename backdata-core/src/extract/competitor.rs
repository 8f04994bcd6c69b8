//! Competitor brand monthly averages per department store

use super::{ExtractContext, OutputFile, SheetExtractor, zero_based};
use crate::columns::{DiscoveredColumn, DiscoveryLayout, discover_columns};
use crate::config::CompetitorJob;
use crate::reader::{CellValue, Sheet};
use anyhow::Result;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

pub struct CompetitorExtractor {
    name: String,
    sheet: String,
    output: String,
    job: CompetitorJob,
}

impl CompetitorExtractor {
    pub fn new(name: &str, sheet: &str, output: &str, job: &CompetitorJob) -> Self {
        Self {
            name: name.to_string(),
            sheet: sheet.to_string(),
            output: output.to_string(),
            job: job.clone(),
        }
    }

    fn layout(&self) -> DiscoveryLayout {
        DiscoveryLayout {
            category_row: zero_based(self.job.category_row),
            label_row: zero_based(self.job.label_row),
            marker: self.job.marker.clone(),
            probe_row: self.job.probe_row.map(zero_based),
        }
    }
}

struct StoreRow {
    name: String,
    values: Vec<f64>,
}

impl SheetExtractor for CompetitorExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn sheet(&self) -> &str {
        &self.sheet
    }

    fn kind(&self) -> &'static str {
        "competitor"
    }

    fn extract(&self, sheet: &Sheet, ctx: &ExtractContext) -> Result<Vec<OutputFile>> {
        let layout = self.layout();
        let brands = discover_columns(sheet, &layout);
        if brands.is_empty() {
            warn!(
                sheet = %sheet.name,
                marker = %layout.marker,
                "no brand columns found under the marker"
            );
        }

        let store_col = self.job.store_column.resolve(sheet, layout.label_row)?;
        // Header labels repeated inside the table body are not stores
        let header_echo: Vec<&str> = [layout.category_row, layout.label_row]
            .iter()
            .filter_map(|&row| sheet.get(row, store_col).as_text())
            .collect();

        let mut stores = Vec::new();
        for row in zero_based(self.job.data_start_row)..sheet.height() {
            let cell = sheet.get(row, store_col);
            let name = match cell {
                CellValue::Text(_) => cell.as_text(),
                _ => None,
            };
            let Some(name) = name else {
                if self.job.stop_at_blank {
                    break;
                }
                continue;
            };
            if name.chars().all(|c| c.is_ascii_digit()) || header_echo.contains(&name) {
                debug!(row = row + 1, name, "skipping non-store row");
                continue;
            }

            let name = if self.job.normalize_stores {
                ctx.aliases.normalize(name)
            } else {
                name.to_string()
            };
            let values = brands
                .iter()
                .map(|brand| sheet.get(row, brand.index).to_number_or_zero())
                .collect();
            stores.push(StoreRow { name, values });
        }

        let records = stores.len();
        let mut document = json!({
            "brands": brands.iter().map(|b| b.label.as_str()).collect::<Vec<_>>(),
            "stores": stores.iter().map(|s| store_json(s, &brands)).collect::<Vec<_>>(),
            "total_stores": records,
        });
        if self.job.rankings {
            document["brand_rankings"] = rankings(&stores, &brands);
        }

        Ok(vec![OutputFile {
            file_name: self.output.clone(),
            document,
            records,
        }])
    }
}

fn store_json(store: &StoreRow, brands: &[DiscoveredColumn]) -> Value {
    let averages: Map<String, Value> = brands
        .iter()
        .zip(&store.values)
        .map(|(brand, value)| (brand.label.clone(), json!(value)))
        .collect();
    json!({
        "백화점": store.name,
        "브랜드별_월평균": averages,
    })
}

/// Stores ranked by each brand's monthly average, highest first; zero values are left out
fn rankings(stores: &[StoreRow], brands: &[DiscoveredColumn]) -> Value {
    let mut by_brand = Map::new();
    for (i, brand) in brands.iter().enumerate() {
        let mut ranked: Vec<(&str, f64)> = stores
            .iter()
            .map(|s| (s.name.as_str(), s.values[i]))
            .filter(|(_, value)| *value > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let entries: Vec<Value> = ranked
            .iter()
            .enumerate()
            .map(|(rank, (store, value))| {
                json!({
                    "백화점": store,
                    "월평균": value,
                    "순위": rank + 1,
                })
            })
            .collect();
        by_brand.insert(brand.label.clone(), Value::Array(entries));
    }
    Value::Object(by_brand)
}

//! Export job configuration

use crate::columns::ColumnRef;
use crate::error::ExtractError;
use crate::normalize::{Period, PeriodRange, StoreAliases, conflicting_alias, default_aliases};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Default configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "backdata.toml";

/// Main export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    /// Extra store aliases (canonical -> variants); a variant listed here
    /// overrides the built-in table
    #[serde(default)]
    pub aliases: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_jobs")]
    pub jobs: Vec<JobConfig>,
}

impl ExportConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ExportConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in aliases with the configured ones applied on top
    pub fn store_aliases(&self) -> StoreAliases {
        StoreAliases::new(&default_aliases()).overlay(&self.aliases)
    }

    pub fn job(&self, name: &str) -> Option<&JobConfig> {
        self.jobs.iter().find(|job| job.name == name)
    }

    /// Check the configuration for mistakes that would otherwise surface mid-run
    pub fn validate(&self) -> Result<(), ExtractError> {
        if let Some((variant, first, second)) = conflicting_alias(&self.aliases) {
            return Err(invalid(format!(
                "alias '{variant}' is listed under both '{first}' and '{second}'"
            )));
        }

        let mut names = HashSet::new();
        let mut outputs = HashSet::new();

        for job in &self.jobs {
            if !names.insert(job.name.as_str()) {
                return Err(invalid(format!("duplicate job name '{}'", job.name)));
            }
            if job.sheet.trim().is_empty() {
                return Err(invalid(format!("job '{}' has an empty sheet name", job.name)));
            }
            for output in job.outputs() {
                check_output_path(output)?;
                if !outputs.insert(output) {
                    return Err(invalid(format!(
                        "output '{}' is written by more than one job",
                        output
                    )));
                }
            }
            job.kind.validate().map_err(|e| match e {
                ExtractError::InvalidConfig(message) => {
                    invalid(format!("job '{}': {}", job.name, message))
                }
                other => other,
            })?;
        }

        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            aliases: BTreeMap::new(),
            jobs: default_jobs(),
        }
    }
}

fn invalid(message: String) -> ExtractError {
    ExtractError::InvalidConfig(message)
}

fn check_output_path(output: &str) -> Result<(), ExtractError> {
    let path = Path::new(output);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if output.trim().is_empty() || escapes {
        return Err(ExtractError::InvalidOutputPath(output.to_string()));
    }
    Ok(())
}

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Workbook used when none is given on the command line
    #[serde(default = "default_workbook")]
    pub workbook: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Indent JSON output instead of writing one line per file
    #[serde(default)]
    pub pretty: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            output_dir: default_output_dir(),
            pretty: false,
        }
    }
}

fn default_workbook() -> PathBuf {
    PathBuf::from("backdata.xlsx")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("public/data")
}

/// One sheet-to-JSON conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: String,
    pub sheet: String,
    /// File name relative to the output directory
    pub output: String,
    #[serde(flatten)]
    pub kind: JobKind,
}

impl JobConfig {
    /// Every file this job writes
    pub fn outputs(&self) -> Vec<&str> {
        let mut outputs = vec![self.output.as_str()];
        if let JobKind::Performance(perf) = &self.kind {
            if let Some(summary) = &perf.summary {
                outputs.push(summary.output.as_str());
            }
            if let Some(yearly) = &perf.yearly {
                outputs.push(yearly.output.as_str());
            }
        }
        outputs
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobKind {
    Table(TableJob),
    Competitor(CompetitorJob),
    GroupSales(GroupSalesJob),
    Performance(PerformanceJob),
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Table(_) => "table",
            JobKind::Competitor(_) => "competitor",
            JobKind::GroupSales(_) => "group_sales",
            JobKind::Performance(_) => "performance",
        }
    }

    fn validate(&self) -> Result<(), ExtractError> {
        match self {
            JobKind::Table(table) => table.validate(),
            JobKind::Competitor(job) => {
                check_row("category_row", job.category_row)?;
                check_row("label_row", job.label_row)?;
                check_row("data_start_row", job.data_start_row)?;
                if let Some(row) = job.probe_row {
                    check_row("probe_row", row)?;
                }
                if job.marker.trim().is_empty() {
                    return Err(invalid("marker must not be empty".to_string()));
                }
                job.store_column.validate()
            }
            JobKind::GroupSales(job) => {
                check_row("header_row", job.header_row)?;
                job.store_column.validate()?;
                job.period_column.validate()?;
                job.value_column.validate()?;
                check_range(&job.range)
            }
            JobKind::Performance(job) => {
                job.table.validate()?;
                job.store_column.validate()?;
                job.period_column.validate()?;
                job.value_column.validate()?;
                if let Some(range) = job.summary.as_ref().and_then(|s| s.range.as_ref()) {
                    check_range(range)?;
                }
                if let Some(yearly) = &job.yearly {
                    if !(1..=12).contains(&yearly.through_month) {
                        return Err(invalid(format!(
                            "through_month must be between 1 and 12, got {}",
                            yearly.through_month
                        )));
                    }
                    if Period::new(yearly.year, 1).is_none() {
                        return Err(invalid(format!("year {} is out of range", yearly.year)));
                    }
                }
                Ok(())
            }
        }
    }
}

fn check_row(field: &str, row: usize) -> Result<(), ExtractError> {
    if row == 0 {
        return Err(invalid(format!("{field} is 1-based, 0 is not a row")));
    }
    Ok(())
}

fn check_range(range: &PeriodRange) -> Result<(), ExtractError> {
    if !range.is_valid() {
        return Err(invalid(format!("period range {range} ends before it starts")));
    }
    Ok(())
}

/// Row-to-object transcription of a sheet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableJob {
    /// 1-based row holding the headers; data starts on the next row
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    /// Keep only these headers, in this order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<PrefixFilter>,
}

impl Default for TableJob {
    fn default() -> Self {
        Self {
            header_row: default_header_row(),
            columns: Vec::new(),
            filter: None,
        }
    }
}

impl TableJob {
    fn validate(&self) -> Result<(), ExtractError> {
        check_row("header_row", self.header_row)?;
        if let Some(filter) = &self.filter {
            filter.column.validate()?;
            if filter.prefixes.is_empty() {
                return Err(invalid("filter needs at least one prefix".to_string()));
            }
        }
        Ok(())
    }
}

/// Keep rows whose cell text starts with one of the prefixes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixFilter {
    pub column: ColumnRef,
    pub prefixes: Vec<String>,
}

/// Brand monthly averages per department store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorJob {
    #[serde(default = "default_category_row")]
    pub category_row: usize,
    #[serde(default = "default_label_row")]
    pub label_row: usize,
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Keep a brand column only if this row holds a number in it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_row: Option<usize>,
    #[serde(default = "default_competitor_store_column")]
    pub store_column: ColumnRef,
    #[serde(default = "default_data_start_row")]
    pub data_start_row: usize,
    /// End the table at the first blank or numeric store cell instead of skipping it
    #[serde(default)]
    pub stop_at_blank: bool,
    /// Add per-brand store rankings
    #[serde(default)]
    pub rankings: bool,
    #[serde(default = "default_true")]
    pub normalize_stores: bool,
}

impl Default for CompetitorJob {
    fn default() -> Self {
        Self {
            category_row: default_category_row(),
            label_row: default_label_row(),
            marker: default_marker(),
            probe_row: None,
            store_column: default_competitor_store_column(),
            data_start_row: default_data_start_row(),
            stop_at_blank: false,
            rankings: false,
            normalize_stores: true,
        }
    }
}

/// Sales summed per store over a period range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSalesJob {
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    pub store_column: ColumnRef,
    pub period_column: ColumnRef,
    pub value_column: ColumnRef,
    pub range: PeriodRange,
    #[serde(default = "default_key_label")]
    pub key_label: String,
    #[serde(default = "default_value_label")]
    pub value_label: String,
}

/// Performance sheet transcription plus optional derived reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceJob {
    #[serde(flatten)]
    pub table: TableJob,
    #[serde(default = "default_performance_store_column")]
    pub store_column: ColumnRef,
    #[serde(default = "default_performance_period_column")]
    pub period_column: ColumnRef,
    #[serde(default = "default_performance_value_column")]
    pub value_column: ColumnRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<SummaryConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly: Option<YearlyConfig>,
}

impl Default for PerformanceJob {
    fn default() -> Self {
        Self {
            table: TableJob::default(),
            store_column: default_performance_store_column(),
            period_column: default_performance_period_column(),
            value_column: default_performance_value_column(),
            summary: None,
            yearly: None,
        }
    }
}

/// Sales summed per (period, store)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<PeriodRange>,
}

/// Monthly revenue against the previous year, per store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyConfig {
    pub output: String,
    pub year: u16,
    /// Last month counted in the year-to-date totals
    #[serde(default = "default_through_month")]
    pub through_month: u8,
    /// Store-list names to report; empty means every store in the sheet
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stores: Vec<String>,
}

fn default_header_row() -> usize {
    1
}

fn default_category_row() -> usize {
    1
}

fn default_label_row() -> usize {
    2
}

fn default_data_start_row() -> usize {
    3
}

fn default_marker() -> String {
    "월평균".to_string()
}

fn default_competitor_store_column() -> ColumnRef {
    ColumnRef::letters("D")
}

fn default_true() -> bool {
    true
}

fn default_key_label() -> String {
    "매장명".to_string()
}

fn default_value_label() -> String {
    "소량단체판매액".to_string()
}

fn default_performance_store_column() -> ColumnRef {
    ColumnRef::header("매장명")
}

fn default_performance_period_column() -> ColumnRef {
    ColumnRef::header("판매시점")
}

fn default_performance_value_column() -> ColumnRef {
    ColumnRef::header("판매액")
}

fn default_through_month() -> u8 {
    11
}

fn table_job(name: &str, sheet: &str, output: &str) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        sheet: sheet.to_string(),
        output: output.to_string(),
        kind: JobKind::Table(TableJob::default()),
    }
}

/// The dashboard's standard job list
pub fn default_jobs() -> Vec<JobConfig> {
    let style_columns = ["매장명", "품번", "제품명", "판매액합계", "일자", "시즌"];

    vec![
        table_job("매장", "매장", "store_data.json"),
        table_job("아이템시즌별판매", "아이템시즌별판매", "item_season_data.json"),
        JobConfig {
            name: "매장별스타일판매".to_string(),
            sheet: "매장별스타일판매".to_string(),
            output: "store_style_sales_data.json".to_string(),
            kind: JobKind::Table(TableJob {
                header_row: 1,
                columns: style_columns.iter().map(|c| c.to_string()).collect(),
                filter: Some(PrefixFilter {
                    column: ColumnRef::header("일자"),
                    prefixes: vec!["2024".to_string(), "2025".to_string()],
                }),
            }),
        },
        table_job("매장별재고", "매장별재고", "store_inventory_data.json"),
        JobConfig {
            name: "실적".to_string(),
            sheet: "실적".to_string(),
            output: "performance_data.json".to_string(),
            kind: JobKind::Performance(PerformanceJob {
                summary: Some(SummaryConfig {
                    output: "performance_summary.json".to_string(),
                    range: None,
                }),
                yearly: Some(YearlyConfig {
                    output: "performance_yearly.json".to_string(),
                    year: 2025,
                    through_month: default_through_month(),
                    stores: Vec::new(),
                }),
                ..PerformanceJob::default()
            }),
        },
        table_job("주간회의", "주간회의", "weekly_meeting_data.json"),
        JobConfig {
            name: "단체".to_string(),
            sheet: "단체".to_string(),
            output: "group_sales_data.json".to_string(),
            kind: JobKind::GroupSales(GroupSalesJob {
                header_row: 1,
                store_column: ColumnRef::letters("B"),
                period_column: ColumnRef::letters("C"),
                value_column: ColumnRef::letters("T"),
                range: PeriodRange::new(
                    Period {
                        year: 2025,
                        month: 1,
                    },
                    Period {
                        year: 2025,
                        month: 11,
                    },
                ),
                key_label: default_key_label(),
                value_label: default_value_label(),
            }),
        },
        JobConfig {
            name: "경쟁사".to_string(),
            sheet: "경쟁사".to_string(),
            output: "competitor_data_v2.json".to_string(),
            kind: JobKind::Competitor(CompetitorJob::default()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ExportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.jobs.len(), 8);
        assert_eq!(config.global.output_dir, PathBuf::from("public/data"));
        assert!(!config.global.pretty);
    }

    #[test]
    fn test_parse_jobs_from_toml() {
        let toml_str = r#"
            [global]
            workbook = "data/backdata.xlsx"
            pretty = true

            [aliases]
            "롯데잠실" = ["롯데 잠실", "잠실롯데"]

            [[jobs]]
            kind = "group_sales"
            name = "단체 매출"
            sheet = "단체"
            output = "group_sales_data.json"
            store_column = "B"
            period_column = 3
            value_column = { header = "판매액" }
            range = { start = "202501", end = "202511" }

            [[jobs]]
            kind = "competitor"
            name = "경쟁사"
            sheet = "경쟁사"
            output = "competitor.json"
            store_column = "K"
            probe_row = 3
            rankings = true
        "#;

        let config: ExportConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.global.workbook, PathBuf::from("data/backdata.xlsx"));
        assert_eq!(config.global.output_dir, PathBuf::from("public/data"));
        assert_eq!(config.jobs.len(), 2);

        match &config.jobs[0].kind {
            JobKind::GroupSales(job) => {
                assert_eq!(job.store_column, ColumnRef::letters("B"));
                assert_eq!(job.period_column, ColumnRef::Number(3));
                assert_eq!(job.value_column, ColumnRef::header("판매액"));
                assert_eq!(job.key_label, "매장명");
            }
            other => panic!("unexpected job kind {}", other.label()),
        }
        match &config.jobs[1].kind {
            JobKind::Competitor(job) => {
                assert_eq!(job.marker, "월평균");
                assert_eq!(job.data_start_row, 3);
                assert_eq!(job.probe_row, Some(3));
                assert!(job.rankings);
            }
            other => panic!("unexpected job kind {}", other.label()),
        }

        let aliases = config.store_aliases();
        assert_eq!(aliases.normalize("잠실롯데"), "롯데잠실");
        assert_eq!(aliases.normalize("현대서울"), "더현대서울");
    }

    #[test]
    fn test_missing_jobs_fall_back_to_defaults() {
        let config: ExportConfig = toml::from_str("[global]\noutput_dir = \"out\"").unwrap();
        assert_eq!(config.jobs.len(), default_jobs().len());
        assert!(config.job("경쟁사").is_some());
    }

    #[test]
    fn test_validation() {
        let config = ExportConfig::default();

        let mut bad = config.clone();
        bad.jobs.push(table_job("매장", "다른시트", "other.json"));
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.jobs.push(table_job("중복", "매장", "store_data.json"));
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.jobs.push(table_job("상위경로", "매장", "../store.json"));
        assert!(matches!(
            bad.validate(),
            Err(ExtractError::InvalidOutputPath(_))
        ));

        let mut bad = config.clone();
        bad.jobs.push(table_job("절대경로", "매장", "/tmp/store.json"));
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.jobs[0].sheet = " ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        if let JobKind::GroupSales(job) = &mut bad.jobs[6].kind {
            std::mem::swap(&mut job.range.start, &mut job.range.end);
        }
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        if let JobKind::Performance(job) = &mut bad.jobs[4].kind {
            if let Some(yearly) = job.yearly.as_mut() {
                yearly.through_month = 13;
            }
        }
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        if let JobKind::Competitor(job) = &mut bad.jobs[7].kind {
            job.store_column = ColumnRef::letters("d");
        }
        assert!(bad.validate().is_err());

        let mut bad = config;
        if let JobKind::Competitor(job) = &mut bad.jobs[7].kind {
            job.label_row = 0;
        }
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_configured_aliases_fold_the_same_way_every_run() {
        let config: ExportConfig = toml::from_str(
            r#"
            [aliases]
            "더현대판교" = ["더현대"]
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
        for _ in 0..100 {
            let aliases = config.store_aliases();
            assert_eq!(aliases.normalize("더현대"), "더현대판교");
            assert_eq!(aliases.normalize("더현대 서울"), "더현대서울");
        }
    }

    #[test]
    fn test_alias_listed_under_two_stores_is_rejected() {
        let config: ExportConfig = toml::from_str(
            r#"
            [aliases]
            "더현대판교" = ["더현대"]
            "더현대서울" = ["더현대"]
            "#,
        )
        .unwrap();
        match config.validate() {
            Err(ExtractError::InvalidConfig(message)) => assert!(message.contains("'더현대'")),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_nested_output_paths_are_allowed() {
        assert!(check_output_path("reports/2025/summary.json").is_ok());
        assert!(check_output_path("./summary.json").is_ok());
        assert!(check_output_path("").is_err());
    }

    #[test]
    fn test_outputs_include_derived_reports() {
        let config = ExportConfig::default();
        let outputs = config.job("실적").unwrap().outputs();
        assert_eq!(
            outputs,
            vec![
                "performance_data.json",
                "performance_summary.json",
                "performance_yearly.json"
            ]
        );
    }
}

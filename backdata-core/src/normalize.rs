//! Store-name and period normalization

use crate::error::ExtractError;
use crate::reader::CellValue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A calendar month, rendered as `YYYYMM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub year: u16,
    pub month: u8,
}

impl Period {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        ((1000..=9999).contains(&year) && (1..=12).contains(&month)).then_some(Self { year, month })
    }

    /// Parse the period encodings found in the workbook: `202501`, `20250115`,
    /// `2025-01`, `2025.01`, `2025/01`, `2025-01-15`
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.chars().all(|c| c.is_ascii_digit()) {
            return match text.len() {
                6 | 8 => Self::new(text[..4].parse().ok()?, text[4..6].parse().ok()?),
                _ => None,
            };
        }

        let mut parts = text.split(['-', '.', '/']);
        let year = parts.next()?.trim();
        let month = parts.next()?.trim();
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    /// Read a period from a cell: `202501` stored as a number, as text, or a date cell
    pub fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Number(n) if n.fract() == 0.0 && *n >= 0.0 => {
                Self::parse(&format!("{}", *n as u64))
            }
            CellValue::Text(s) => Self::parse(s),
            CellValue::DateTime(_) => {
                let date = cell.as_date()?;
                use chrono::Datelike;
                Self::new(u16::try_from(date.year()).ok()?, date.month() as u8)
            }
            _ => None,
        }
    }

    /// The same month one year earlier
    pub fn previous_year(self) -> Self {
        Self {
            year: self.year - 1,
            month: self.month,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ExtractError::InvalidPeriod(s.to_string()))
    }
}

impl TryFrom<String> for Period {
    type Error = ExtractError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

/// Inclusive range of periods used to accept or reject rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start: Period,
    pub end: Period,
}

impl PeriodRange {
    pub fn new(start: Period, end: Period) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, period: Period) -> bool {
        self.start <= period && period <= self.end
    }

    /// Accept a row by its period cell; unparseable periods are rejected
    pub fn accepts(&self, cell: &CellValue) -> bool {
        Period::from_cell(cell).is_some_and(|p| self.contains(p))
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Folds observed spelling variants of a store onto one canonical name
#[derive(Debug, Clone, Default)]
pub struct StoreAliases {
    /// whitespace-free variant -> canonical
    lookup: HashMap<String, String>,
}

impl StoreAliases {
    /// Build from a canonical -> variants table. A canonical name always maps to
    /// itself, even when another entry lists it as a variant.
    pub fn new(table: &BTreeMap<String, Vec<String>>) -> Self {
        let mut aliases = Self::default();
        aliases.apply(table);
        aliases
    }

    /// Apply a second table on top; its entries win over existing ones
    pub fn overlay(mut self, table: &BTreeMap<String, Vec<String>>) -> Self {
        self.apply(table);
        self
    }

    fn apply(&mut self, table: &BTreeMap<String, Vec<String>>) {
        for (canonical, variants) in table {
            let canonical = canonical.trim();
            for variant in variants {
                self.lookup.insert(squash(variant), canonical.to_string());
            }
        }
        for canonical in table.keys() {
            let canonical = canonical.trim();
            self.lookup.insert(squash(canonical), canonical.to_string());
        }
    }

    /// Canonical name for a raw store name; unknown names come back trimmed
    pub fn normalize(&self, name: &str) -> String {
        let trimmed = name.trim();
        self.lookup
            .get(&squash(trimmed))
            .cloned()
            .unwrap_or_else(|| trimmed.to_string())
    }
}

/// First variant of `table` claimed by two different canonical names, as
/// `(variant, first canonical, second canonical)`. Comparison ignores whitespace.
pub fn conflicting_alias(table: &BTreeMap<String, Vec<String>>) -> Option<(String, String, String)> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    for canonical in table.keys() {
        owners.insert(squash(canonical), canonical.trim());
    }
    for (canonical, variants) in table {
        let canonical = canonical.trim();
        for variant in variants {
            let key = squash(variant);
            match owners.get(&key) {
                Some(owner) if *owner != canonical => {
                    return Some((variant.trim().to_string(), owner.to_string(), canonical.to_string()));
                }
                Some(_) => {}
                None => {
                    owners.insert(key, canonical);
                }
            }
        }
    }
    None
}

/// Alias table for store names that differ between the store list and the competitor sheet
pub fn default_aliases() -> BTreeMap<String, Vec<String>> {
    let table: [(&str, &[&str]); 3] = [
        ("더현대서울", &["더현대 서울", "현대서울", "더현대"]),
        ("더현대울산", &["더현대 울산", "현대울산"]),
        ("갤러리아광교", &["갤러리아 광교"]),
    ];
    table
        .iter()
        .map(|(canonical, variants)| {
            (
                canonical.to_string(),
                variants.iter().map(|v| v.to_string()).collect(),
            )
        })
        .collect()
}

fn squash(name: &str) -> String {
    name.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Whether a sales-record store name refers to a store from the store list.
/// Channel-prefixed names carry the store in brackets, e.g. `29CM(롯데본점)`.
pub fn match_store_name(store: &str, candidate: &str) -> bool {
    static BRACKETED: OnceLock<Regex> = OnceLock::new();
    let re = BRACKETED.get_or_init(|| Regex::new(r"\(([^)]+)\)").unwrap());

    if store.is_empty() || candidate.is_empty() {
        return false;
    }
    match re.captures(candidate) {
        Some(caps) => &caps[1] == store || candidate.contains(store),
        None => candidate.contains(store) || store.contains(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parsing() {
        assert_eq!(Period::parse("202501"), Period::new(2025, 1));
        assert_eq!(Period::parse(" 202511 "), Period::new(2025, 11));
        assert_eq!(Period::parse("20250115"), Period::new(2025, 1));
        assert_eq!(Period::parse("2025-03"), Period::new(2025, 3));
        assert_eq!(Period::parse("2025.7"), Period::new(2025, 7));
        assert_eq!(Period::parse("2025/12/31"), Period::new(2025, 12));
        assert_eq!(Period::parse("202513"), None);
        assert_eq!(Period::parse("2025"), None);
        assert_eq!(Period::parse("합계"), None);
        assert_eq!(Period::parse(""), None);
    }

    #[test]
    fn test_period_from_cell() {
        assert_eq!(
            Period::from_cell(&CellValue::Number(202501.0)),
            Period::new(2025, 1)
        );
        assert_eq!(
            Period::from_cell(&CellValue::Text("202502".into())),
            Period::new(2025, 2)
        );
        // 45689 = 2025-02-01
        assert_eq!(
            Period::from_cell(&CellValue::DateTime(45689.0)),
            Period::new(2025, 2)
        );
        assert_eq!(Period::from_cell(&CellValue::Number(2025.5)), None);
        assert_eq!(Period::from_cell(&CellValue::Empty), None);
    }

    #[test]
    fn test_period_range_is_inclusive() {
        let range = PeriodRange::new(
            "202501".parse().unwrap(),
            "202511".parse().unwrap(),
        );
        assert!(range.accepts(&CellValue::Number(202501.0)));
        assert!(range.accepts(&CellValue::Text("202511".into())));
        assert!(!range.accepts(&CellValue::Number(202512.0)));
        assert!(!range.accepts(&CellValue::Number(202412.0)));
        assert!(!range.accepts(&CellValue::Text("unknown".into())));
        assert_eq!(range.to_string(), "202501..=202511");
    }

    #[test]
    fn test_period_serde_as_string() {
        let range: PeriodRange =
            toml::from_str("start = \"202401\"\nend = \"2024-12\"").unwrap();
        assert_eq!(range.start, Period::new(2024, 1).unwrap());
        assert_eq!(range.end, Period::new(2024, 12).unwrap());
        assert!(toml::from_str::<PeriodRange>("start = \"x\"\nend = \"202412\"").is_err());
    }

    #[test]
    fn test_alias_folding() {
        let aliases = StoreAliases::new(&default_aliases());
        assert_eq!(aliases.normalize("더현대 서울"), "더현대서울");
        assert_eq!(aliases.normalize(" 현대서울 "), "더현대서울");
        assert_eq!(aliases.normalize("더현대서울"), "더현대서울");
        assert_eq!(aliases.normalize("갤러리아  광교"), "갤러리아광교");
        assert_eq!(aliases.normalize(" 롯데본점 "), "롯데본점");
    }

    #[test]
    fn test_overlay_wins_over_built_in_variants() {
        let configured = BTreeMap::from([("더현대판교".to_string(), vec!["더현대".to_string()])]);
        for _ in 0..50 {
            let aliases = StoreAliases::new(&default_aliases()).overlay(&configured);
            assert_eq!(aliases.normalize("더현대"), "더현대판교");
            assert_eq!(aliases.normalize("현대서울"), "더현대서울");
        }
    }

    #[test]
    fn test_canonical_name_maps_to_itself() {
        let table = BTreeMap::from([
            ("롯데본점".to_string(), vec!["롯데잠실".to_string()]),
            ("롯데잠실".to_string(), vec!["잠실롯데".to_string()]),
        ]);
        let aliases = StoreAliases::new(&table);
        assert_eq!(aliases.normalize("롯데잠실"), "롯데잠실");
        assert_eq!(aliases.normalize("잠실롯데"), "롯데잠실");
    }

    #[test]
    fn test_conflicting_alias() {
        assert_eq!(conflicting_alias(&default_aliases()), None);

        let table = BTreeMap::from([
            ("더현대서울".to_string(), vec!["현대 서울".to_string()]),
            ("현대백화점".to_string(), vec!["현대서울".to_string()]),
        ]);
        assert_eq!(
            conflicting_alias(&table),
            Some(("현대서울".to_string(), "더현대서울".to_string(), "현대백화점".to_string()))
        );

        let table = BTreeMap::from([
            ("롯데본점".to_string(), vec!["롯데잠실".to_string()]),
            ("롯데잠실".to_string(), vec![]),
        ]);
        assert!(conflicting_alias(&table).is_some());
    }

    #[test]
    fn test_store_matching() {
        assert!(match_store_name("롯데본점", "29CM(롯데본점)"));
        assert!(match_store_name("롯데본점", "롯데본점"));
        assert!(match_store_name("롯데본점", "롯데본점 팝업"));
        assert!(match_store_name("신세계강남점", "강남점"));
        assert!(!match_store_name("롯데본점", "29CM(신세계강남)"));
        assert!(!match_store_name("롯데본점", ""));
    }
}

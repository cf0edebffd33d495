use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Static per-country attributes from the snapshot's leading metadata columns.
/// All four values are carried through verbatim in `meta`; `name` and
/// `population` are resolved out of them once at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryInfo {
    pub name: String,
    pub population: u64,
    /// The metadata columns exactly as they appeared: (header, value).
    pub meta: Vec<(String, String)>,
}

/// Country metadata keyed by uppercase iso3 code.
#[derive(Debug, Clone, Default)]
pub struct CountryTable {
    rows: BTreeMap<String, CountryInfo>,
}

impl CountryTable {
    pub fn new(rows: BTreeMap<String, CountryInfo>) -> Self {
        CountryTable { rows }
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rows.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&CountryInfo> {
        self.rows.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Display name for a code, falling back to the code itself.
    pub fn name_of<'a>(&'a self, code: &'a str) -> &'a str {
        self.rows
            .get(code)
            .map(|c| c.name.as_str())
            .unwrap_or(code)
    }

    pub fn population_of(&self, code: &str) -> u64 {
        self.rows.get(code).map(|c| c.population).unwrap_or(0)
    }
}

/// Cumulative case counts: one row per calendar day (ascending), one column
/// per country. Values are non-decreasing per column barring upstream data
/// corrections, which are passed through untouched.
#[derive(Debug, Clone)]
pub struct CaseTable {
    dates: Vec<NaiveDate>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl CaseTable {
    pub fn new(dates: Vec<NaiveDate>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        for (code, values) in &columns {
            if values.len() != dates.len() {
                bail!(
                    "column `{}` has {} values but there are {} dates",
                    code,
                    values.len(),
                    dates.len()
                );
            }
        }
        Ok(CaseTable { dates, columns })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Number of date rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, code: &str) -> Option<&[f64]> {
        self.columns.get(code).map(Vec::as_slice)
    }

    /// Latest cumulative value for a country, if the table has any rows.
    pub fn latest(&self, code: &str) -> Option<f64> {
        self.columns.get(code).and_then(|v| v.last().copied())
    }
}

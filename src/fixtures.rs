//! Shared in-memory test data.

use crate::snapshot::CovidData;
use crate::table::{CaseTable, CountryInfo, CountryTable};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub(crate) const META_HEADERS: [&str; 4] = ["UID", "Country/Region", "Lat", "Population"];

fn info(name: &str, population: u64) -> CountryInfo {
    CountryInfo {
        name: name.to_string(),
        population,
        meta: META_HEADERS
            .iter()
            .map(|h| {
                let v = match *h {
                    "Country/Region" => name.to_string(),
                    "Population" => population.to_string(),
                    _ => "0".to_string(),
                };
                ((*h).to_string(), v)
            })
            .collect(),
    }
}

/// Three countries, ten days of strictly increasing cumulative counts
/// starting 2021-03-01.
pub(crate) fn sample_data() -> CovidData {
    sample_data_for(&["CAN", "USA", "MEX"])
}

/// Like [`sample_data`], restricted to a subset of its countries.
pub(crate) fn sample_data_for(codes: &[&str]) -> CovidData {
    // (code, name, population, base count, growth/day)
    let catalog: [(&str, &str, u64, f64, f64); 3] = [
        ("CAN", "Canada", 38_000_000, 1_000.0, 100.0),
        ("USA", "US", 331_000_000, 50_000.0, 1_000.0),
        ("MEX", "Mexico", 126_000_000, 2_000.0, 50.0),
    ];

    let start = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
    let dates: Vec<NaiveDate> = (0..10).map(|i| start + chrono::Days::new(i)).collect();

    let mut rows = BTreeMap::new();
    let mut columns = BTreeMap::new();
    for (code, name, population, base, growth) in catalog {
        if !codes.contains(&code) {
            continue;
        }
        rows.insert(code.to_string(), info(name, population));
        columns.insert(
            code.to_string(),
            (0..10).map(|i| base + growth * i as f64).collect(),
        );
    }

    CovidData {
        countries: CountryTable::new(rows),
        cases: CaseTable::new(dates, columns).unwrap(),
    }
}

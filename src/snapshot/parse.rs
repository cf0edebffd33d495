use super::CovidData;
use crate::table::{CaseTable, CountryInfo, CountryTable};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::warn;

/// Leading columns after the iso3 index, interpreted positionally.
/// The 4th is the population; the others are carried through verbatim.
const META_COLS: usize = 4;

/// Accepts the aggregator's ISO form and the raw upstream `M/D/YY` form.
fn parse_header_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%y"))
        .ok()
}

/// Read a snapshot CSV and reshape it into the metadata table and the
/// date-indexed cumulative table.
pub(super) fn load_snapshot(path: &Path) -> Result<CovidData> {
    let file =
        File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(BufReader::new(file));

    let headers = rdr
        .headers()
        .with_context(|| format!("failed to read header row of `{}`", path.display()))?
        .clone();
    if headers.len() < 1 + META_COLS + 1 {
        bail!(
            "snapshot has {} columns; expected iso3, {} metadata columns and at least one date",
            headers.len(),
            META_COLS
        );
    }

    let meta_headers: Vec<String> = headers
        .iter()
        .skip(1)
        .take(META_COLS)
        .map(str::to_string)
        .collect();

    // Date columns keep their record index so cells can be pulled out after
    // sorting chronologically.
    let mut date_cols: Vec<(usize, NaiveDate)> = Vec::new();
    for (idx, h) in headers.iter().enumerate().skip(1 + META_COLS) {
        match parse_header_date(h) {
            Some(d) => date_cols.push((idx, d)),
            None => warn!(column = h, "unparsable date header; column ignored"),
        }
    }
    if date_cols.is_empty() {
        bail!("no parsable date columns in `{}`", path.display());
    }
    date_cols.sort_by_key(|&(_, d)| d);
    let dates: Vec<NaiveDate> = date_cols.iter().map(|&(_, d)| d).collect();

    let name_pos = meta_headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("Country/Region"))
        .unwrap_or(0);

    let mut rows: BTreeMap<String, CountryInfo> = BTreeMap::new();
    let mut columns: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for (line, result) in rdr.records().enumerate() {
        let record = result
            .with_context(|| format!("CSV parse error in `{}` at record {}", path.display(), line))?;

        let code = record.get(0).unwrap_or("").trim().to_uppercase();
        if code.is_empty() {
            warn!(record = line, "row without an iso3 code; skipped");
            continue;
        }

        let meta: Vec<(String, String)> = meta_headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                (
                    h.clone(),
                    record.get(1 + i).unwrap_or("").trim().to_string(),
                )
            })
            .collect();

        let name = if meta[name_pos].1.is_empty() {
            code.clone()
        } else {
            meta[name_pos].1.clone()
        };
        let population = match meta[META_COLS - 1].1.parse::<f64>() {
            Ok(v) if v >= 0.0 => v.round() as u64,
            _ => {
                warn!(code = %code, raw = %meta[META_COLS - 1].1, "unparsable population; using 0");
                0
            }
        };

        let mut values = Vec::with_capacity(dates.len());
        for &(idx, _) in &date_cols {
            let raw = record.get(idx).unwrap_or("").trim();
            let v = if raw.is_empty() {
                0.0
            } else {
                match raw.parse::<f64>() {
                    Ok(v) => v,
                    Err(_) => {
                        warn!(code = %code, cell = raw, "unparsable case count; using 0");
                        0.0
                    }
                }
            };
            values.push(v);
        }

        if rows
            .insert(
                code.clone(),
                CountryInfo {
                    name,
                    population,
                    meta,
                },
            )
            .is_some()
        {
            warn!(code = %code, "duplicate iso3 row; keeping the last");
        }
        columns.insert(code, values);
    }

    if rows.is_empty() {
        bail!("snapshot `{}` contains no country rows", path.display());
    }

    Ok(CovidData {
        countries: CountryTable::new(rows),
        cases: CaseTable::new(dates, columns)?,
    })
}

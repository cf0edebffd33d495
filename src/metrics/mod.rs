use crate::snapshot::CovidData;
use anyhow::{bail, Result};
use chrono::NaiveDate;
use tracing::warn;

pub const PER_MILLION_SCALE: f64 = 1_000_000.0;
pub const ROLLING_WINDOW: usize = 7;

/// Identity of a derived column. The metric kind is carried explicitly next
/// to the country code so population lookups never depend on parsing column
/// names back apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    NewCases,
    NewCasesPerMillion,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesColumn {
    pub code: String,
    pub kind: MetricKind,
    /// One entry per date row; `None` where the metric is undefined
    /// (first differenced row, incomplete rolling window, unknown population).
    pub values: Vec<Option<f64>>,
}

/// A per-call derived table: dates as rows, `(code, kind)` columns.
/// Recomputed from the snapshot on every request, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTable {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<SeriesColumn>,
}

impl DerivedTable {
    /// Keep only the trailing `history` rows; `history == 0` means no trimming.
    pub fn tail(&self, history: usize) -> DerivedTable {
        if history == 0 || history >= self.dates.len() {
            return self.clone();
        }
        let skip = self.dates.len() - history;
        DerivedTable {
            dates: self.dates[skip..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| SeriesColumn {
                    code: c.code.clone(),
                    kind: c.kind,
                    values: c.values[skip..].to_vec(),
                })
                .collect(),
        }
    }

    pub fn column(&self, code: &str, kind: MetricKind) -> Option<&SeriesColumn> {
        self.columns
            .iter()
            .find(|c| c.code == code && c.kind == kind)
    }
}

/// First difference of a cumulative series. The first row has no prior day
/// to diff against and is undefined.
pub fn diff(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if i == 0 {
                None
            } else {
                Some(v - values[i - 1])
            }
        })
        .collect()
}

/// Trailing-window mean. Row `i` is defined once the window `[i-window+1, i]`
/// fits and every input inside it is defined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let mut sum = 0.0;
            for v in slice {
                match v {
                    Some(x) => sum += x,
                    None => return None,
                }
            }
            Some(sum / window as f64)
        })
        .collect()
}

/// Scale a series to per-1,000,000-population. Undefined everywhere when the
/// population is unknown (zero).
pub fn per_million(values: &[Option<f64>], population: u64) -> Vec<Option<f64>> {
    if population == 0 {
        return vec![None; values.len()];
    }
    let pop = population as f64;
    values
        .iter()
        .map(|v| v.map(|x| x / pop * PER_MILLION_SCALE))
        .collect()
}

/// Daily new cases for each requested country, absolute columns first, then
/// the per-million columns in the same country order. Codes must already be
/// validated against the metadata key set.
pub fn new_cases_with_per_million(data: &CovidData, codes: &[String]) -> Result<DerivedTable> {
    let mut absolute = Vec::with_capacity(codes.len());
    let mut scaled = Vec::with_capacity(codes.len());

    for code in codes {
        let cumulative = match data.cases.column(code) {
            Some(c) => c,
            None => bail!("no case series for `{}`", code),
        };
        let new = diff(cumulative);

        let population = data.countries.population_of(code);
        if population == 0 {
            warn!(code = %code, "unknown population; per-million series undefined");
        }
        scaled.push(SeriesColumn {
            code: code.clone(),
            kind: MetricKind::NewCasesPerMillion,
            values: per_million(&new, population),
        });
        absolute.push(SeriesColumn {
            code: code.clone(),
            kind: MetricKind::NewCases,
            values: new,
        });
    }

    absolute.extend(scaled);
    Ok(DerivedTable {
        dates: data.cases.dates().to_vec(),
        columns: absolute,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn diff_leaves_first_row_undefined() {
        let d = diff(&[10.0, 12.0, 15.0, 15.0]);
        assert_eq!(d, vec![None, Some(2.0), Some(3.0), Some(0.0)]);
    }

    #[test]
    fn rolling_mean_defined_from_window_minus_one() {
        let values: Vec<Option<f64>> = (1..=10).map(|i| Some(i as f64)).collect();
        let r = rolling_mean(&values, 7);
        for i in 0..6 {
            assert_eq!(r[i], None, "row {} should be undefined", i);
        }
        // mean of 1..=7 is 4, and each later window shifts by one
        assert_eq!(r[6], Some(4.0));
        assert_eq!(r[7], Some(5.0));
        assert_eq!(r[9], Some(7.0));
    }

    #[test]
    fn rolling_mean_propagates_gaps() {
        let mut values: Vec<Option<f64>> = (1..=10).map(|i| Some(i as f64)).collect();
        values[0] = None; // as produced by diff()
        let r = rolling_mean(&values, 7);
        assert_eq!(r[6], None, "window still covers the undefined first row");
        assert_eq!(r[7], Some(5.0));
    }

    #[test]
    fn per_million_matches_hand_scaling() {
        let values = vec![None, Some(38.0), Some(76.0)];
        let r = per_million(&values, 38_000_000);
        assert_eq!(r, vec![None, Some(1.0), Some(2.0)]);
        assert_eq!(per_million(&values, 0), vec![None, None, None]);
    }

    #[test]
    fn derived_table_column_order_and_values() -> Result<()> {
        let data = fixtures::sample_data();
        let codes = vec!["CAN".to_string(), "USA".to_string()];
        let table = new_cases_with_per_million(&data, &codes)?;

        assert_eq!(table.columns.len(), 4);
        assert_eq!(table.columns[0].code, "CAN");
        assert_eq!(table.columns[0].kind, MetricKind::NewCases);
        assert_eq!(table.columns[1].code, "USA");
        assert_eq!(table.columns[2].kind, MetricKind::NewCasesPerMillion);

        let can_new = table.column("CAN", MetricKind::NewCases).unwrap();
        assert_eq!(can_new.values[0], None);
        assert_eq!(can_new.values[1], Some(100.0));

        let can_scaled = table.column("CAN", MetricKind::NewCasesPerMillion).unwrap();
        let expected = 100.0 / 38_000_000.0 * PER_MILLION_SCALE;
        assert_eq!(can_scaled.values[1], Some(expected));
        Ok(())
    }

    #[test]
    fn derivation_is_idempotent() -> Result<()> {
        let data = fixtures::sample_data();
        let codes = vec!["CAN".to_string(), "MEX".to_string()];
        let a = new_cases_with_per_million(&data, &codes)?;
        let b = new_cases_with_per_million(&data, &codes)?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn tail_keeps_trailing_rows_only() -> Result<()> {
        let data = fixtures::sample_data();
        let codes = vec!["CAN".to_string()];
        let table = new_cases_with_per_million(&data, &codes)?;

        let tail = table.tail(3);
        assert_eq!(tail.dates.len(), 3);
        assert_eq!(tail.dates[0], table.dates[7]);
        assert_eq!(tail.columns[0].values, table.columns[0].values[7..].to_vec());

        // 0 means full history, oversize asks are clamped
        assert_eq!(table.tail(0).dates.len(), 10);
        assert_eq!(table.tail(99).dates.len(), 10);
        Ok(())
    }
}

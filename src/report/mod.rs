//! The four presentation entry points. Each validates its inputs, derives a
//! fresh data slice from the snapshot, and writes one or two SVG charts.

mod chart;

pub use chart::fig_width_units;

use crate::metrics::{self, MetricKind, ROLLING_WINDOW};
use crate::snapshot::CovidData;
use crate::validate;
use anyhow::{bail, Result};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rows to skip so only the trailing `history` rows remain; 0 = keep all.
fn tail_skip(len: usize, history: usize) -> usize {
    if history == 0 || history >= len {
        0
    } else {
        len - history
    }
}

/// Cumulative and daily-new charts for one country over the trailing
/// `history` days (`-1` = full history). Returns the written chart path.
pub fn country_detail<P: AsRef<Path>>(
    data: &CovidData,
    cnty: &str,
    history: i64,
    out_dir: P,
) -> Result<PathBuf> {
    let code = validate::countries(&data.countries, &[cnty]).value.remove(0);
    let history = validate::history(history).value;

    // derive on the full series first, trim after, so the rolling window can
    // reach back past the displayed range
    let cumulative = match data.cases.column(&code) {
        Some(c) => c,
        // reachable when the fallback country itself is missing from the snapshot
        None => bail!("no case series for `{}`", code),
    };
    let new_cases = metrics::diff(cumulative);
    let rolling = metrics::rolling_mean(&new_cases, ROLLING_WINDOW);

    let skip = tail_skip(data.cases.len(), history);
    let dates = &data.cases.dates()[skip..];
    let name = data.countries.name_of(&code);

    let title_total = format!("Total COVID-19 Cases in {}", name);
    let title_new = format!("Daily New COVID-19 Cases in {}", name);

    let path = out_dir
        .as_ref()
        .join(format!("country_detail_{}.svg", code));
    chart::render_country_detail(
        &path,
        (&title_total, &title_new),
        dates,
        &cumulative[skip..],
        &new_cases[skip..],
        &rolling[skip..],
    )?;
    info!(chart = %path.display(), country = %code, "rendered country detail");
    Ok(path)
}

/// Absolute and per-million daily new cases for a list of countries as two
/// stacked line panels. `titles` overrides the default panel captions.
pub fn country_comparison<P: AsRef<Path>, S: AsRef<str>>(
    data: &CovidData,
    cnty: &[S],
    history: i64,
    titles: Option<(String, String)>,
    out_dir: P,
) -> Result<PathBuf> {
    let mut codes = validate::countries(&data.countries, cnty).value;
    codes.sort();
    let history = validate::history(history).value;

    let derived = metrics::new_cases_with_per_million(data, &codes)?;
    let trimmed = derived.tail(history);

    let (title_abs, title_per_1m) = titles.unwrap_or_else(|| {
        (
            "Number of Daily New COVID-19 Cases".to_string(),
            "Number of Daily New COVID-19 Cases per 1 Million People".to_string(),
        )
    });

    let path = out_dir
        .as_ref()
        .join(format!("comparison_{}.svg", codes.join("_")));
    chart::render_comparison(
        &path,
        &trimmed.dates,
        [
            chart::LinePanel {
                title: &title_abs,
                series: panel_series(data, &codes, &trimmed, MetricKind::NewCases),
            },
            chart::LinePanel {
                title: &title_per_1m,
                series: panel_series(data, &codes, &trimmed, MetricKind::NewCasesPerMillion),
            },
        ],
    )?;
    info!(chart = %path.display(), countries = %codes.join(","), "rendered comparison");
    Ok(path)
}

/// Rank countries by the latest rolling-average of daily new cases (absolute
/// or per-million) and chart the top N via the comparison view.
pub fn top_by_recent_average<P: AsRef<Path>>(
    data: &CovidData,
    per_million: bool,
    no_of_cnty: i64,
    window: usize,
    history: i64,
    out_dir: P,
) -> Result<PathBuf> {
    let n = validate::top_n(no_of_cnty, data.countries.len()).value;
    let ranked = rank_by_recent_average(data, per_million, window)?;

    let mut top: Vec<String> = ranked.into_iter().take(n).map(|(code, _)| code).collect();
    top.sort();

    let basis = if per_million {
        "the Highest Average Number of New Cases per 1 Million People"
    } else {
        "the Highest Average Number of New Cases"
    };
    let title_abs = format!(
        "Number of Daily New COVID-19 Cases of Top {} Countries/Regions with {} in Past {} Days",
        n, basis, window
    );
    let title_per_1m = format!(
        "Number of Daily New COVID-19 Cases per 1 Million People of Top {} Countries/Regions with {} in Past {} Days",
        n, basis, window
    );

    country_comparison(data, &top, history, Some((title_abs, title_per_1m)), out_dir)
}

/// Rank countries by all-time cumulative total: horizontal-bar totals chart
/// for the top N, then the same countries through the comparison view.
/// Returns both chart paths.
pub fn top_by_total<P: AsRef<Path>>(
    data: &CovidData,
    no_of_cnty: i64,
    history: i64,
    out_dir: P,
) -> Result<(PathBuf, PathBuf)> {
    let n = validate::top_n(no_of_cnty, data.countries.len()).value;
    let top: Vec<String> = rank_by_latest_total(data)
        .into_iter()
        .take(n)
        .map(|(code, _)| code)
        .collect();

    let rows = totals_rows(data, &top);
    let title_abs = format!("Total Number of Cases of Top {} Countries/Regions", n);
    let title_per_1m = format!(
        "Total Number of Cases Per 1 Million People of Top {} Countries/Regions",
        n
    );

    let totals_path = out_dir.as_ref().join(format!("top_{}_total.svg", n));
    chart::render_totals_barh(&totals_path, (&title_abs, &title_per_1m), &rows)?;
    info!(chart = %totals_path.display(), "rendered totals ranking");

    let basis = "the Highest Total Number of Cases";
    let cmp_title_abs = format!(
        "Number of Daily New COVID-19 Cases of Top {} Countries/Regions with {}",
        n, basis
    );
    let cmp_title_per_1m = format!(
        "Number of Daily New COVID-19 Cases per 1 Million People of Top {} Countries/Regions with {}",
        n, basis
    );
    let comparison_path = country_comparison(
        data,
        &top,
        history,
        Some((cmp_title_abs, cmp_title_per_1m)),
        out_dir,
    )?;

    Ok((totals_path, comparison_path))
}

/// One (legend label, values) entry per requested code, in code order.
fn panel_series<'a>(
    data: &'a CovidData,
    codes: &'a [String],
    table: &'a metrics::DerivedTable,
    kind: MetricKind,
) -> Vec<(&'a str, &'a [Option<f64>])> {
    codes
        .iter()
        .filter_map(|code| {
            table
                .column(code, kind)
                .map(|col| (data.countries.name_of(code), col.values.as_slice()))
        })
        .collect()
}

/// Countries ordered by the most recent rolling-average value, descending.
/// Countries whose window is undefined rank last.
fn rank_by_recent_average(
    data: &CovidData,
    per_million: bool,
    window: usize,
) -> Result<Vec<(String, Option<f64>)>> {
    let codes: Vec<String> = data.countries.codes().map(str::to_string).collect();
    let derived = metrics::new_cases_with_per_million(data, &codes)?;
    let kind = if per_million {
        MetricKind::NewCasesPerMillion
    } else {
        MetricKind::NewCases
    };

    let mut ranked: Vec<(String, Option<f64>)> = codes
        .iter()
        .map(|code| {
            let latest = derived
                .column(code, kind)
                .map(|col| metrics::rolling_mean(&col.values, window))
                .and_then(|r| r.last().copied().flatten());
            (code.clone(), latest)
        })
        .collect();

    ranked.sort_by(|a, b| {
        let av = a.1.unwrap_or(f64::NEG_INFINITY);
        let bv = b.1.unwrap_or(f64::NEG_INFINITY);
        bv.partial_cmp(&av).unwrap_or(Ordering::Equal)
    });
    Ok(ranked)
}

/// Countries ordered by latest cumulative total, descending.
fn rank_by_latest_total(data: &CovidData) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = data
        .countries
        .codes()
        .map(|code| (code.to_string(), data.cases.latest(code).unwrap_or(0.0)))
        .collect();
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    totals
}

/// Bar rows for the totals chart: (display name, total, total per 1M),
/// ascending by total so the largest bar lands on top.
fn totals_rows(data: &CovidData, codes: &[String]) -> Vec<(String, f64, f64)> {
    let mut rows: Vec<(String, f64, f64)> = codes
        .iter()
        .map(|code| {
            let total = data.cases.latest(code).unwrap_or(0.0);
            let population = data.countries.population_of(code);
            let per_1m = if population == 0 {
                0.0
            } else {
                total / population as f64 * metrics::PER_MILLION_SCALE
            };
            (data.countries.name_of(code).to_string(), total, per_1m)
        })
        .collect();
    rows.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tempfile::tempdir;

    fn assert_nonempty_svg(path: &Path) {
        let meta = std::fs::metadata(path).expect("chart file missing");
        assert!(meta.len() > 0, "chart file is empty");
    }

    #[test]
    fn ranks_by_latest_total() {
        let data = fixtures::sample_data();
        let ranked = rank_by_latest_total(&data);
        // USA 59_000, MEX 2_450, CAN 1_900
        assert_eq!(ranked[0].0, "USA");
        assert_eq!(ranked[0].1, 59_000.0);
        assert_eq!(ranked[1].0, "MEX");
        assert_eq!(ranked[2].0, "CAN");
    }

    #[test]
    fn totals_rows_scale_per_million() {
        let data = fixtures::sample_data();
        let rows = totals_rows(&data, &["USA".to_string(), "CAN".to_string()]);
        // ascending by total: CAN first
        assert_eq!(rows[0].0, "Canada");
        assert_eq!(rows[1].0, "US");
        assert_eq!(rows[1].1, 59_000.0);
        assert_eq!(rows[1].2, 59_000.0 / 331_000_000.0 * 1_000_000.0);
    }

    #[test]
    fn recent_average_ranking_prefers_fastest_growth() -> Result<()> {
        let data = fixtures::sample_data();
        // absolute growth/day: USA 1000, CAN 100, MEX 50
        let ranked = rank_by_recent_average(&data, false, 7)?;
        assert_eq!(ranked[0].0, "USA");
        assert_eq!(ranked[0].1, Some(1000.0));

        // per-million growth/day: CAN 100/38M ≈ 2.63, USA 1000/331M ≈ 3.02,
        // MEX 50/126M ≈ 0.40 per 1M
        let ranked = rank_by_recent_average(&data, true, 7)?;
        assert_eq!(ranked[0].0, "USA");
        assert_eq!(ranked[1].0, "CAN");
        assert_eq!(ranked[2].0, "MEX");
        Ok(())
    }

    #[test]
    fn window_longer_than_history_ranks_undefined_last() -> Result<()> {
        let data = fixtures::sample_data();
        let ranked = rank_by_recent_average(&data, false, 99)?;
        assert!(ranked.iter().all(|(_, v)| v.is_none()));
        Ok(())
    }

    #[test]
    fn country_detail_writes_chart() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        let path = country_detail(&data, "can", 5, dir.path())?;
        assert!(path.ends_with("country_detail_CAN.svg"));
        assert_nonempty_svg(&path);
        Ok(())
    }

    #[test]
    fn country_detail_falls_back_to_default_country() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        let path = country_detail(&data, "zzz", -1, dir.path())?;
        assert!(path.ends_with("country_detail_CAN.svg"));
        Ok(())
    }

    #[test]
    fn missing_fallback_country_is_an_error_not_a_panic() -> Result<()> {
        // snapshot without the validator's fallback country: an unknown code
        // resolves to CAN, which has no series here
        let data = fixtures::sample_data_for(&["USA", "MEX"]);
        let dir = tempdir()?;
        let result = country_detail(&data, "zzz", 30, dir.path());
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn comparison_sorts_codes_into_filename() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        let path = country_comparison(&data, &["usa", "can"], 30, None, dir.path())?;
        assert!(path.ends_with("comparison_CAN_USA.svg"));
        assert_nonempty_svg(&path);
        Ok(())
    }

    #[test]
    fn top_by_total_selects_largest_final_cumulative() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        let (totals, comparison) = top_by_total(&data, 1, 30, dir.path())?;
        assert!(totals.ends_with("top_1_total.svg"));
        assert!(comparison.ends_with("comparison_USA.svg"));
        assert_nonempty_svg(&totals);
        assert_nonempty_svg(&comparison);
        Ok(())
    }

    #[test]
    fn top_by_recent_average_writes_comparison() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        let path = top_by_recent_average(&data, true, 2, 7, 30, dir.path())?;
        // top two per-million growers, sorted: CAN, USA
        assert!(path.ends_with("comparison_CAN_USA.svg"));
        assert_nonempty_svg(&path);
        Ok(())
    }

    #[test]
    fn invalid_top_n_falls_back_to_five() -> Result<()> {
        let data = fixtures::sample_data();
        let dir = tempdir()?;
        // fixture has 3 countries, so 7 is out of range and 5 is substituted;
        // 5 is then clamped to the available countries by take()
        let (totals, _) = top_by_total(&data, 7, 30, dir.path())?;
        assert!(totals.ends_with("top_5_total.svg"));
        Ok(())
    }
}

use anyhow::{Context, Result};
use covid_charts::{report, snapshot::CovidData};
use std::{fs, path::PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) configure dirs ───────────────────────────────────────────
    let data_output_dir = PathBuf::from("data").join("output");
    let charts_dir = PathBuf::from("charts");
    fs::create_dir_all(&charts_dir)
        .with_context(|| format!("could not create `{}`", charts_dir.display()))?;

    // ─── 3) load the latest snapshot ─────────────────────────────────
    let data = CovidData::load_latest(&data_output_dir)
        .context("no usable snapshot; run the aggregation step first")?;

    // ─── 4) render the standard report set ───────────────────────────
    let detail = report::country_detail(&data, "CAN", 30, &charts_dir)?;
    info!(chart = %detail.display(), "country detail done");

    let comparison = report::country_comparison(&data, &["CAN"], 30, None, &charts_dir)?;
    info!(chart = %comparison.display(), "comparison done");

    let top_avg = report::top_by_recent_average(&data, true, 5, 7, 30, &charts_dir)?;
    info!(chart = %top_avg.display(), "top-by-average done");

    let (totals, totals_cmp) = report::top_by_total(&data, 5, 30, &charts_dir)?;
    info!(totals = %totals.display(), comparison = %totals_cmp.display(), "top-by-total done");

    info!("all done");
    Ok(())
}

//! SVG panel rendering. Layout only; all series math happens in `metrics`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use plotters::prelude::*;
use std::path::Path;

/// Figure width in layout units grows with the number of plotted rows,
/// clamped to 15..=50 so dense ranges stay legible without unbounded output.
pub fn fig_width_units(nrows: usize) -> f64 {
    ((nrows as f64 / 30.0) * 10.0).clamp(15.0, 50.0)
}

const PX_PER_UNIT: u32 = 60;
/// Two stacked panels at 15 units tall.
const STACK_HEIGHT_PX: u32 = 15 * PX_PER_UNIT;
/// The totals chart is a fixed 20x5 unit landscape pair.
const TOTALS_SIZE_PX: (u32, u32) = (20 * PX_PER_UNIT, 5 * PX_PER_UNIT);

pub fn width_px(nrows: usize) -> u32 {
    (fig_width_units(nrows) * PX_PER_UNIT as f64).round() as u32
}

const ROLLING_LINE: RGBColor = RGBColor(255, 165, 0);

/// One named line per country within a panel.
pub struct LinePanel<'a> {
    pub title: &'a str,
    pub series: Vec<(&'a str, &'a [Option<f64>])>,
}

fn axis_max(values: impl Iterator<Item = f64>) -> f64 {
    let max = values.fold(f64::MIN, f64::max);
    if max <= 0.0 || !max.is_finite() {
        1.0
    } else {
        max * 1.05
    }
}

fn axis_max_opt<'a>(values: impl Iterator<Item = &'a Option<f64>>) -> f64 {
    axis_max(values.flatten().copied())
}

fn date_label(dates: &[NaiveDate], x: &f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 || i as usize >= dates.len() {
        return String::new();
    }
    dates[i as usize].format("%Y-%m-%d").to_string()
}

/// Split a sparse series into contiguous defined runs so gaps render as
/// absent points rather than zeros.
fn defined_runs(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (i, v) in values.iter().enumerate() {
        match v {
            Some(y) => current.push((i as f64, *y)),
            None => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Single-country detail: cumulative bars on top, new-case bars with the
/// rolling-average line below.
pub fn render_country_detail(
    path: &Path,
    titles: (&str, &str),
    dates: &[NaiveDate],
    cumulative: &[f64],
    new_cases: &[Option<f64>],
    rolling: &[Option<f64>],
) -> Result<()> {
    let size = (width_px(dates.len()), STACK_HEIGHT_PX);
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("failed to start chart `{}`", path.display()))?;
    let panels = root.split_evenly((2, 1));
    let n = dates.len() as f64;

    // panel 0: cumulative bars
    {
        let y_max = axis_max(cumulative.iter().copied());
        let mut chart = ChartBuilder::on(&panels[0])
            .caption(titles.0, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.6..(n - 0.4), 0.0..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Date")
            .x_label_formatter(&|x| date_label(dates, x))
            .draw()?;
        chart
            .draw_series(cumulative.iter().enumerate().map(|(i, v)| {
                Rectangle::new([(i as f64 - 0.4, 0.0), (i as f64 + 0.4, *v)], BLUE.filled())
            }))?
            .label("Total Cases")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE.filled()));
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    // panel 1: new-case bars + rolling-average line
    {
        let y_max = axis_max_opt(new_cases.iter().chain(rolling.iter()));
        let mut chart = ChartBuilder::on(&panels[1])
            .caption(titles.1, ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(-0.6..(n - 0.4), 0.0..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Date")
            .x_label_formatter(&|x| date_label(dates, x))
            .draw()?;
        chart
            .draw_series(new_cases.iter().enumerate().filter_map(|(i, v)| {
                v.map(|y| {
                    Rectangle::new([(i as f64 - 0.4, 0.0), (i as f64 + 0.4, y)], BLUE.filled())
                })
            }))?
            .label("New Cases")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], BLUE.filled()));
        for (run_no, run) in defined_runs(rolling).into_iter().enumerate() {
            let series = chart.draw_series(LineSeries::new(run, ROLLING_LINE.stroke_width(2)))?;
            if run_no == 0 {
                series
                    .label("Average Number of New Cases in Past 7 Days")
                    .legend(|(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], ROLLING_LINE.stroke_width(2))
                    });
            }
        }
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()
        .with_context(|| format!("failed to write chart `{}`", path.display()))?;
    Ok(())
}

/// Two stacked line panels over the same date axis.
pub fn render_comparison(
    path: &Path,
    dates: &[NaiveDate],
    panels_data: [LinePanel<'_>; 2],
) -> Result<()> {
    let size = (width_px(dates.len()), STACK_HEIGHT_PX);
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("failed to start chart `{}`", path.display()))?;
    let areas = root.split_evenly((2, 1));
    let n = dates.len() as f64;

    for (area, panel) in areas.iter().zip(panels_data.iter()) {
        let y_max = axis_max_opt(panel.series.iter().flat_map(|(_, v)| v.iter()));
        let mut chart = ChartBuilder::on(area)
            .caption(panel.title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..(n - 1.0).max(1.0), 0.0..y_max)?;
        chart
            .configure_mesh()
            .x_desc("Date")
            .x_label_formatter(&|x| date_label(dates, x))
            .draw()?;

        for (idx, (label, values)) in panel.series.iter().enumerate() {
            for (run_no, run) in defined_runs(values).into_iter().enumerate() {
                let series = chart
                    .draw_series(LineSeries::new(run, Palette99::pick(idx).stroke_width(2)))?;
                if run_no == 0 {
                    series.label(*label).legend(move |(x, y)| {
                        PathElement::new(
                            vec![(x, y), (x + 20, y)],
                            Palette99::pick(idx).stroke_width(2),
                        )
                    });
                }
            }
        }
        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()
        .with_context(|| format!("failed to write chart `{}`", path.display()))?;
    Ok(())
}

/// Side-by-side horizontal bar panels: absolute totals and per-million
/// totals. `rows` are (label, absolute, per_million), bottom-up.
pub fn render_totals_barh(
    path: &Path,
    titles: (&str, &str),
    rows: &[(String, f64, f64)],
) -> Result<()> {
    let root = SVGBackend::new(path, TOTALS_SIZE_PX).into_drawing_area();
    root.fill(&WHITE)
        .with_context(|| format!("failed to start chart `{}`", path.display()))?;
    let areas = root.split_evenly((1, 2));
    let n = rows.len() as f64;

    let panels: [(&str, Box<dyn Fn(&(String, f64, f64)) -> f64>); 2] = [
        (titles.0, Box::new(|r| r.1)),
        (titles.1, Box::new(|r| r.2)),
    ];

    for (area, (title, value_of)) in areas.iter().zip(panels.iter()) {
        let x_max = axis_max(rows.iter().map(|r| value_of(r)));
        let mut chart = ChartBuilder::on(area)
            .caption(*title, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(120)
            .build_cartesian_2d(0.0..x_max, -0.6..(n - 0.4))?;
        chart
            .configure_mesh()
            .y_label_formatter(&|y: &f64| {
                let i = y.round();
                if (y - i).abs() > 1e-6 || i < 0.0 || i as usize >= rows.len() {
                    return String::new();
                }
                rows[i as usize].0.clone()
            })
            .y_labels(rows.len())
            .draw()?;
        chart.draw_series(rows.iter().enumerate().map(|(i, r)| {
            Rectangle::new(
                [(0.0, i as f64 - 0.4), (value_of(r), i as f64 + 0.4)],
                BLUE.filled(),
            )
        }))?;
    }

    root.present()
        .with_context(|| format!("failed to write chart `{}`", path.display()))?;
    Ok(())
}

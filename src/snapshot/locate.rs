use anyhow::{bail, Context, Result};
use glob::glob;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Snapshot files are named `cnty_total_confirmed_cases_YYYYMMDD-HHMMSS.csv`,
/// so the lexicographically greatest name is also the newest.
static SNAPSHOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cnty_total_confirmed_cases_\d{8}-\d{6}\.csv$").unwrap());

/// Scan `dir` for dated snapshot files and return the newest one.
pub fn latest_snapshot(dir: &Path) -> Result<PathBuf> {
    let pattern = format!("{}/*.csv", dir.display());
    let mut candidates: Vec<PathBuf> = Vec::new();

    for entry in glob(&pattern).context("invalid glob pattern for snapshot scan")? {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                debug!("skipping unreadable glob entry: {:?}", e);
                continue;
            }
        };
        if !path.is_file() {
            continue;
        }
        let file_name = match path.file_name().and_then(|f| f.to_str()) {
            Some(n) => n,
            None => continue,
        };
        if SNAPSHOT_RE.is_match(file_name) {
            candidates.push(path);
        }
    }

    candidates.sort();
    match candidates.pop() {
        Some(p) => Ok(p),
        None => bail!(
            "no snapshot matching `cnty_total_confirmed_cases_YYYYMMDD-HHMMSS.csv` in `{}`",
            dir.display()
        ),
    }
}

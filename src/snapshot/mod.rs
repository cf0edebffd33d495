mod locate;
mod parse;

pub use locate::latest_snapshot;

use crate::table::{CaseTable, CountryTable};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// The process-wide snapshot: country metadata plus the date-indexed
/// cumulative case table. Loaded once, never refreshed or mutated; report
/// operations borrow it.
#[derive(Debug, Clone)]
pub struct CovidData {
    pub countries: CountryTable,
    pub cases: CaseTable,
}

impl CovidData {
    /// Locate the most recent dated snapshot in `dir` and load it.
    /// Fails when no matching file exists; there is no fallback dataset.
    #[tracing::instrument(level = "info", skip(dir), fields(path = %dir.as_ref().display()))]
    pub fn load_latest<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = latest_snapshot(dir.as_ref())?;
        info!(path = %path.display(), "loading snapshot");
        Self::load_file(&path)
    }

    /// Load one specific snapshot file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let data = parse::load_snapshot(path)
            .with_context(|| format!("failed to load snapshot `{}`", path.display()))?;
        info!(
            countries = data.countries.len(),
            days = data.cases.len(),
            "snapshot loaded"
        );
        Ok(data)
    }
}

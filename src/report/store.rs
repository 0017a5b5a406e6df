// src/report/store.rs
// =============================================================================
// Reading and writing the report file.
//
// The previous report is optional: a missing file means a first run, and a
// file we cannot parse is logged and treated the same way. Writing the new
// report is the only step here that can fail the run.
// =============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use super::model::{PriorHistory, Report};

pub fn load_previous(path: &Path) -> PriorHistory {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("no previous report at {}, starting fresh", path.display());
            return PriorHistory::default();
        }
        Err(e) => {
            warn!("could not read previous report {}: {}", path.display(), e);
            return PriorHistory::default();
        }
    };

    match PriorHistory::from_json(&content) {
        Ok(history) => history,
        Err(e) => {
            warn!(
                "previous report {} is not valid JSON ({}), ignoring it",
                path.display(),
                e
            );
            PriorHistory::default()
        }
    }
}

pub fn save_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    // serde_json writes UTF-8 as-is, so non-ASCII names stay readable
    let json = serde_json::to_string_pretty(report).context("failed to serialise report")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;

    info!("report saved to {}", path.display());
    Ok(())
}

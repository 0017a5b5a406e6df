// src/pipeline/mod.rs
// =============================================================================
// The layered reachability pipeline.
//
// Submodules:
// - outcome:      shared types (CheckLayer, StageOutcome, ProbeOutcome)
// - orchestrator: the three-stage runner
//
// run_check() is what the binary calls: run the stages, reconcile against
// the previous report, write the new report.
// =============================================================================

pub mod outcome;
mod orchestrator;

use anyhow::Result;
use log::info;

pub use orchestrator::Pipeline;
pub use outcome::{CheckLayer, ProbeOutcome, StageOutcome};

use crate::config::Config;
use crate::report::{self, Report};
use crate::source::{unique_entries, LinkEntry};

// Checks `entries`, updates failure streaks from the previous report at
// config.result_file and saves the new report there
pub async fn run_check(config: Config, entries: Vec<LinkEntry>) -> Result<Report> {
    let result_file = config.result_file.clone();
    let author_url = config
        .author_url
        .clone()
        .filter(|author| !author.trim().is_empty());

    let pipeline = Pipeline::new(config)?;
    let results = pipeline.run(unique_entries(&entries)).await;

    let prior = report::load_previous(&result_file);
    info!("previous report knows {} link(s)", prior.len());

    let report = report::reconcile(&entries, results, &prior, author_url.as_deref());
    report::save_report(&result_file, &report)?;

    info!(
        "checked {} link(s): {} accessible, {} inaccessible",
        report.total_count, report.accessible_count, report.inaccessible_count
    );
    if let Some(count) = report.has_author_link_count {
        info!("{} link page(s) reference the author URL", count);
    }

    Ok(report)
}

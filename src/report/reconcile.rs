// src/report/reconcile.rs
// =============================================================================
// Turns per-stage results into the final report.
//
// Steps:
// 1. Stage results are collected in one map keyed by link (StageResults),
//    so applying a later stage's verdict is a single lookup
// 2. Walk the current input in order: every link gets its merged outcome
//    and a new fail_count derived from the previous run
// 3. Links not in the current input never make it into the report, which
//    prunes stale history for free
// 4. Count totals
// =============================================================================

use std::collections::{HashMap, HashSet};

use log::{error, warn};

use super::model::{LinkStatus, PriorHistory, Report};
use crate::pipeline::outcome::ProbeOutcome;
use crate::source::LinkEntry;

/// Outcomes of all stages, merged by link identity
#[derive(Debug, Default)]
pub struct StageResults {
    by_link: HashMap<String, ProbeOutcome>,
}

impl StageResults {
    pub fn new() -> Self {
        StageResults::default()
    }

    // Records a stage's verdict for `link`
    //
    // The first verdict is stored as-is. Later verdicts follow the merge rule
    // in ProbeOutcome::apply_later_stage: a success is final.
    pub fn record(&mut self, link: impl Into<String>, outcome: ProbeOutcome) {
        let link = link.into();
        match self.by_link.get_mut(&link) {
            Some(existing) => existing.apply_later_stage(outcome),
            None => {
                self.by_link.insert(link, outcome);
            }
        }
    }

    pub fn get(&self, link: &str) -> Option<&ProbeOutcome> {
        self.by_link.get(link)
    }

    pub fn len(&self) -> usize {
        self.by_link.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_link.is_empty()
    }

    fn take(&mut self, link: &str) -> Option<ProbeOutcome> {
        self.by_link.remove(link)
    }
}

/// Failure streak: one more on failure, back to zero on success
pub fn next_fail_count(previous: u32, accessible: bool) -> u32 {
    if accessible {
        0
    } else {
        previous.saturating_add(1)
    }
}

pub fn reconcile(
    entries: &[LinkEntry],
    mut results: StageResults,
    prior: &PriorHistory,
    author_url: Option<&str>,
) -> Report {
    let mut seen = HashSet::new();
    let mut link_status = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.link.trim().is_empty() {
            warn!("skipping entry without link: {:?}", entry.name);
            continue;
        }
        if !seen.insert(entry.link.as_str()) {
            warn!("duplicate link in input, keeping the first: {}", entry.link);
            continue;
        }

        // Missing only when the worker checking this link died
        let Some(outcome) = results.take(&entry.link) else {
            error!("no result recorded for {}, leaving it out of the report", entry.link);
            continue;
        };

        let is_accessible = outcome.is_accessible();
        link_status.push(LinkStatus {
            name: entry.name.clone(),
            link: entry.link.clone(),
            linkpage: entry.linkpage().map(str::to_string),
            latency: outcome.latency,
            fail_count: next_fail_count(prior.fail_count(&entry.link), is_accessible),
            check_layer: outcome.check_layer,
            raw_status_code: outcome.raw_status_code,
            ssl_ok: outcome.ssl_ok,
            ssl_message: outcome.ssl_message,
            is_whitelist: outcome.is_whitelisted,
            has_author_link: outcome.has_author_link,
            is_accessible,
        });
    }

    let total_count = link_status.len();
    let accessible_count = link_status.iter().filter(|s| s.is_accessible).count();
    let has_author_link_count = author_url
        .map(|_| link_status.iter().filter(|s| s.has_author_link).count());

    Report {
        timestamp: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        total_count,
        accessible_count,
        inaccessible_count: total_count - accessible_count,
        has_author_link_count,
        author_url: author_url.map(str::to_string),
        link_status,
    }
}

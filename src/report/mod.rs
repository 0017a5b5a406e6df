// src/report/mod.rs
// =============================================================================
// The persisted report and everything that touches it.
//
// Submodules:
// - model:     the JSON schema of result.json
// - reconcile: merging stage results, failure streaks, pruning, totals
// - store:     reading the previous report and writing the new one
// =============================================================================

mod model;
mod reconcile;
mod store;

pub use model::{LinkStatus, PriorHistory, Report};
pub use reconcile::{next_fail_count, reconcile, StageResults};
pub use store::{load_previous, save_report};

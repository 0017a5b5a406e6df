// src/lib.rs
// =============================================================================
// Library root for flink-check.
//
// The binary (src/main.rs) only parses arguments, sets up logging and calls
// into these modules. Keeping the pipeline in a library lets the integration
// tests under tests/ run it end to end against mock servers.
//
// Module map:
// - config:   immutable run configuration and network constants
// - source:   loading the input link list (file or URL, JSON or CSV)
// - checker:  the individual verification layers (whitelist, SSL, probe, APIs, backlink)
// - pipeline: the staged orchestrator that ties the layers together
// - report:   the persisted report, reconciliation and storage
// =============================================================================

pub mod checker;
pub mod config;
pub mod error;
pub mod logger;
pub mod pipeline;
pub mod report;
pub mod source;

pub use config::Config;
pub use pipeline::{run_check, Pipeline};
pub use report::Report;
pub use source::LinkEntry;

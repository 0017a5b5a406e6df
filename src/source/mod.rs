// src/source/mod.rs
// =============================================================================
// This module loads the list of links to check.
//
// Supported inputs:
// - a local file path or an http(s) URL
// - JSON: {"link_list": [...]} or a bare array [...]
// - CSV rows: name,link[,linkpage]
//
// The result is a Vec<LinkEntry>, which stays immutable for the whole run.
// =============================================================================

mod loader;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

pub use loader::{load_entries, parse_entries};

/// One link to check, as supplied by the input list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    /// Display name of the site
    #[serde(default = "default_name")]
    pub name: String,
    /// The URL to check; also the identity of the entry
    pub link: String,
    /// Page on the linked site that should reference the author URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkpage: Option<String>,
}

fn default_name() -> String {
    "unknown".to_string()
}

impl LinkEntry {
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        LinkEntry {
            name: name.into(),
            link: link.into(),
            linkpage: None,
        }
    }

    pub fn with_linkpage(mut self, linkpage: impl Into<String>) -> Self {
        self.linkpage = Some(linkpage.into());
        self
    }

    /// The link page, ignoring blank values
    pub fn linkpage(&self) -> Option<&str> {
        self.linkpage
            .as_deref()
            .map(str::trim)
            .filter(|page| !page.is_empty())
    }
}

// Entries worth checking: non-blank links, first occurrence of each link wins
pub fn unique_entries(entries: &[LinkEntry]) -> Vec<LinkEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| !entry.link.trim().is_empty())
        .filter(|entry| seen.insert(entry.link.as_str()))
        .cloned()
        .collect()
}

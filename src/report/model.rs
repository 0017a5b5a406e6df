// src/report/model.rs
// =============================================================================
// Schema of the report file.
//
// Report / LinkStatus are what we write. PriorHistory is what we need back
// from the previous run: only the fail_count per link. It is parsed
// leniently so older report layouts still carry their streaks forward.
// =============================================================================

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::outcome::CheckLayer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Local time of the run, "YYYY-MM-DD HH:MM:SS"
    pub timestamp: String,
    pub total_count: usize,
    pub accessible_count: usize,
    pub inaccessible_count: usize,
    /// Only present when an author URL was configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_author_link_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_url: Option<String>,
    pub link_status: Vec<LinkStatus>,
}

impl Report {
    pub fn find(&self, link: &str) -> Option<&LinkStatus> {
        self.link_status.iter().find(|status| status.link == link)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkpage: Option<String>,
    /// Seconds, or -1 when unreachable
    pub latency: f64,
    /// Consecutive runs this link has been unreachable
    pub fail_count: u32,
    pub check_layer: CheckLayer,
    pub raw_status_code: i64,
    pub ssl_ok: bool,
    pub ssl_message: String,
    pub is_whitelist: bool,
    pub has_author_link: bool,
    pub is_accessible: bool,
}

#[derive(Debug, Deserialize)]
struct PriorReport {
    #[serde(default)]
    link_status: Option<Vec<Value>>,
}

// Every field may be null; entries are read one at a time so a single odd
// entry costs only its own streak
#[derive(Debug, Deserialize)]
struct PriorEntry {
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    fail_count: Option<u32>,
}

/// Fail counts from the previous run, keyed by exact link string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorHistory {
    fail_counts: HashMap<String, u32>,
}

impl PriorHistory {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        let prior: PriorReport = serde_json::from_str(content)?;
        let fail_counts = prior
            .link_status
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| serde_json::from_value::<PriorEntry>(item).ok())
            .filter_map(|entry| {
                let link = entry.link.filter(|link| !link.is_empty())?;
                Some((link, entry.fail_count.unwrap_or(0)))
            })
            .collect();
        Ok(PriorHistory { fail_counts })
    }

    /// 0 for links the previous run did not know about
    pub fn fail_count(&self, link: &str) -> u32 {
        self.fail_counts.get(link).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.fail_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fail_counts.is_empty()
    }
}

impl FromIterator<(String, u32)> for PriorHistory {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        PriorHistory {
            fail_counts: iter.into_iter().collect(),
        }
    }
}

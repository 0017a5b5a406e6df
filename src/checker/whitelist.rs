// src/checker/whitelist.rs
// =============================================================================
// Access and backlink allow-lists.
//
// Each list entry is either a full URL, matched exactly against the link, or
// a bare hostname (no scheme), matched against the link's host.
//
//   entry "https://www.example.com/"  matches only that exact link string
//   entry "www.example.com"           matches any link on that host
// =============================================================================

use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitelistMatch {
    /// Skip every reachability check and count as accessible
    pub access: bool,
    /// Skip the backlink check and count as having one
    pub backlink: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WhitelistPolicy {
    access: Vec<String>,
    backlink: Vec<String>,
}

impl WhitelistPolicy {
    pub fn new(access: &[String], backlink: &[String]) -> Self {
        WhitelistPolicy {
            access: normalize(access),
            backlink: normalize(backlink),
        }
    }

    pub fn classify(&self, link: &str) -> WhitelistMatch {
        let link = link.trim();
        let host = Url::parse(link)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_ascii_lowercase()));

        WhitelistMatch {
            access: matches_any(&self.access, link, host.as_deref()),
            backlink: matches_any(&self.backlink, link, host.as_deref()),
        }
    }
}

fn normalize(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn matches_any(entries: &[String], link: &str, host: Option<&str>) -> bool {
    entries.iter().any(|entry| {
        if entry.contains("://") {
            entry == link
        } else {
            host.is_some_and(|h| entry.eq_ignore_ascii_case(h))
        }
    })
}

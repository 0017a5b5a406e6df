// src/checker/backlink.rs
// =============================================================================
// Checks whether a friend's link page references the author URL.
//
// The author URL may be configured as "www.example.com", "https://www.example.com/"
// or anything in between, and pages write it in just as many ways. We build
// the set of spellings once and look for them:
// - as an <a href> value (trailing slash ignored)   -> strong match
// - anywhere in the page text                       -> weak match
// Both count as "has a backlink"; the distinction only shows in the logs.
//
// A page we cannot fetch simply has no backlink.
// =============================================================================

use std::time::Duration;

use log::{info, warn};
use reqwest::Client;

use super::html::extract_hrefs;
use super::http::get_with_retry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacklinkMatch {
    /// An anchor points at the author URL
    Anchor,
    /// The author URL appears, but not as a link target
    Text,
    /// The page does not mention the author URL
    Missing,
    /// The page could not be fetched
    Unavailable,
}

impl BacklinkMatch {
    pub fn found(self) -> bool {
        matches!(self, BacklinkMatch::Anchor | BacklinkMatch::Text)
    }
}

#[derive(Clone)]
pub struct BacklinkVerifier {
    client: Client,
    variants: Vec<String>,
    retry_delay: Duration,
}

impl BacklinkVerifier {
    pub fn new(client: Client, author_url: &str, retry_delay: Duration) -> Self {
        BacklinkVerifier {
            client,
            variants: author_variants(author_url),
            retry_delay,
        }
    }

    pub async fn verify(&self, linkpage: &str) -> bool {
        let verdict = match self.fetch(linkpage).await {
            Some(content) => self.search(&content),
            None => BacklinkMatch::Unavailable,
        };

        match verdict {
            BacklinkMatch::Anchor => info!("[backlink] {} links to the author URL", linkpage),
            BacklinkMatch::Text => {
                info!("[backlink] {} mentions the author URL but not as a link", linkpage)
            }
            BacklinkMatch::Missing => info!("[backlink] {} has no author URL", linkpage),
            BacklinkMatch::Unavailable => {}
        }

        verdict.found()
    }

    async fn fetch(&self, linkpage: &str) -> Option<String> {
        let response = match get_with_retry(&self.client, linkpage, &[], self.retry_delay).await {
            Ok(response) => response,
            Err(e) => {
                warn!("[backlink] could not fetch {}: {}", linkpage, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(
                "[backlink] {} answered HTTP {}",
                linkpage,
                response.status().as_u16()
            );
            return None;
        }

        match response.text().await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("[backlink] could not read {}: {}", linkpage, e);
                None
            }
        }
    }

    pub fn search(&self, content: &str) -> BacklinkMatch {
        let wanted: Vec<&str> = self
            .variants
            .iter()
            .map(|variant| variant.trim_end_matches('/'))
            .collect();

        let in_anchor = extract_hrefs(content).iter().any(|href| {
            let href = href.trim_end_matches('/');
            wanted.iter().any(|variant| variant.eq_ignore_ascii_case(href))
        });
        if in_anchor {
            return BacklinkMatch::Anchor;
        }

        if self.variants.iter().any(|variant| content.contains(variant.as_str())) {
            return BacklinkMatch::Text;
        }

        BacklinkMatch::Missing
    }
}

// All spellings of the author URL we accept, without duplicates
//
// Example:
//   "https://www.example.com/" -> [
//       "https://www.example.com", "http://www.example.com",
//       "//www.example.com", "www.example.com", "https://www.example.com/"
//   ]
pub fn author_variants(author_url: &str) -> Vec<String> {
    let raw = author_url.trim();
    let bare = raw
        .strip_prefix("https://")
        .or_else(|| raw.strip_prefix("http://"))
        .or_else(|| raw.strip_prefix("//"))
        .unwrap_or(raw)
        .trim_end_matches('/');

    let candidates = [
        format!("https://{}", bare),
        format!("http://{}", bare),
        format!("//{}", bare),
        bare.to_string(),
        raw.to_string(),
    ];

    let mut variants: Vec<String> = Vec::new();
    for candidate in candidates {
        if !candidate.is_empty() && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

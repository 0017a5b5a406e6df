// src/source/loader.rs
// =============================================================================
// Reads the input list from disk or from a URL and parses it.
//
// Format detection: anything that parses as JSON is treated as JSON and
// never re-read as CSV. Within a JSON list each item is read on its own, so
// one malformed entry is skipped with a warning instead of losing the rest.
// =============================================================================

use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::LinkEntry;
use crate::config::USER_AGENT;
use crate::error::SourceError;

/// One JSON list item; every field may be missing or null
#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    linkpage: Option<String>,
}

// Loads and parses the input list
//
// Any failure here is fatal for the run: without a list there is nothing to
// reconcile, so no report gets written.
pub async fn load_entries(source: &str) -> Result<Vec<LinkEntry>, SourceError> {
    info!("reading link source: {}", source);

    let content = if is_remote(source) {
        fetch_remote(source).await?
    } else {
        std::fs::read_to_string(source).map_err(|e| SourceError::Read {
            path: source.to_string(),
            source: e,
        })?
    };

    let entries = parse_entries(&content);
    if entries.is_empty() {
        return Err(SourceError::Empty(source.to_string()));
    }

    info!("loaded {} link(s)", entries.len());
    Ok(entries)
}

// Parses list content in any of the supported formats
pub fn parse_entries(content: &str) -> Vec<LinkEntry> {
    match serde_json::from_str::<Value>(content) {
        Ok(document) => parse_json(document),
        Err(_) => {
            let entries = parse_csv(content);
            info!("parsed CSV with {} row(s)", entries.len());
            entries
        }
    }
}

fn parse_json(document: Value) -> Vec<LinkEntry> {
    let items = match document {
        Value::Object(mut object) => match object.remove("link_list") {
            Some(Value::Array(items)) => {
                info!("parsed JSON object with link_list");
                items
            }
            _ => {
                warn!("JSON object has no link_list array");
                return Vec::new();
            }
        },
        Value::Array(items) => {
            info!("parsed JSON array");
            items
        }
        other => {
            warn!("JSON document is neither an object nor an array: {}", other);
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| json_entry(index, item))
        .collect()
}

fn json_entry(index: usize, item: Value) -> Option<LinkEntry> {
    let raw: RawEntry = match serde_json::from_value(item) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("skipping unreadable JSON entry {}: {}", index + 1, e);
            return None;
        }
    };

    let link = raw.link.as_deref().map(str::trim).unwrap_or_default();
    if link.is_empty() {
        warn!("skipping JSON entry {} without a link", index + 1);
        return None;
    }

    let name = raw
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or("unknown");

    let mut entry = LinkEntry::new(name, link);
    if let Some(page) = raw.linkpage {
        entry = entry.with_linkpage(page);
    }
    Some(entry)
}

fn parse_csv(content: &str) -> Vec<LinkEntry> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut entries = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping unreadable CSV row {}: {}", index + 1, e);
                continue;
            }
        };

        if record.len() < 2 {
            continue;
        }

        let name = record.get(0).unwrap_or_default();
        let link = record.get(1).unwrap_or_default();

        // A "name,link,linkpage" header row is not an entry
        if index == 0 && link.eq_ignore_ascii_case("link") {
            continue;
        }

        let mut entry = LinkEntry::new(name, link);
        if let Some(page) = record.get(2).filter(|page| !page.is_empty()) {
            entry = entry.with_linkpage(page);
        }
        entries.push(entry);
    }

    entries
}

fn is_remote(source: &str) -> bool {
    matches!(
        url::Url::parse(source).map(|u| u.scheme().to_string()).as_deref(),
        Ok("http") | Ok("https")
    )
}

async fn fetch_remote(source: &str) -> Result<String, SourceError> {
    let fetch_error = |reason: String| SourceError::Fetch {
        url: source.to_string(),
        reason,
    };

    let client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(crate::config::PROBE_TIMEOUT)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(source)
        .send()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(fetch_error(format!("HTTP {}", response.status().as_u16())));
    }

    response.text().await.map_err(|e| fetch_error(e.to_string()))
}

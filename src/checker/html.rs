// src/checker/html.rs
// =============================================================================
// This module pulls anchor targets out of HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Copes with the broken markup friend-link pages tend to have
//
// The backlink check compares these raw href values against the author URL,
// so unlike a crawler we do NOT resolve them against the page URL.
// =============================================================================

use scraper::{Html, Selector};

// Extracts the href value of every <a> element
//
// Example:
//   html = "<a href='https://a.example/'>A</a><a>no href</a>"
//   result = ["https://a.example/"]
//
// Html is not Send, so callers must finish with it before their next .await;
// returning owned Strings keeps that easy.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

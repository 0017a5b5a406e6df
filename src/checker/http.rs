// src/checker/http.rs
// =============================================================================
// Shared HTTP plumbing for the checking layers.
//
// Key functionality:
// - Builds the three reqwest clients a run needs (direct, proxy, raw)
// - Sends a GET with exactly one re-attempt on 429 / 503
// - Defines the success predicate every layer uses
//
// Why three clients?
// - direct: verifies TLS and looks like a browser
// - proxy:  same headers, but proxies often serve certificates for their own
//           host, so verification is relaxed
// - raw:    fallback APIs and link pages; only a User-Agent, longer timeout
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Response, StatusCode};

use crate::config::{Config, USER_AGENT};
use crate::error::AttemptError;

/// Target status codes that count as "reachable" at every layer
pub const SUCCESS_STATUSES: [i64; 3] = [200, 301, 302];

pub fn is_success_status(code: i64) -> bool {
    SUCCESS_STATUSES.contains(&code)
}

// Checks if a URL is something we can send a GET to
//
// We skip mailto:, javascript:, relative paths and anything unparseable
pub fn is_http_url(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

#[derive(Debug, Clone)]
pub struct HttpClients {
    pub direct: Client,
    pub proxy: Client,
    pub raw: Client,
}

impl HttpClients {
    // Builds all clients once per run; reqwest clients are cheap to clone
    // (they share a connection pool internally)
    pub fn new(config: &Config) -> Result<Self> {
        let direct = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(config.timeouts.probe)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("failed to build direct HTTP client")?;

        let proxy = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .timeout(config.timeouts.probe)
            .redirect(reqwest::redirect::Policy::limited(10))
            .danger_accept_invalid_certs(true)
            .build()
            .context("failed to build proxy HTTP client")?;

        let raw = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeouts.api)
            .build()
            .context("failed to build raw HTTP client")?;

        Ok(HttpClients { direct, proxy, raw })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"));
    headers
}

// 429 Too Many Requests and 503 Service Unavailable usually clear up quickly
fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE
    )
}

// Sends a GET and returns the response, whatever its status
//
// Parameters:
//   client: which of the HttpClients to use
//   url: target URL
//   query: extra query parameters (used by the fallback APIs)
//   retry_delay: pause before the one re-attempt on 429/503
//
// Transport failures come back as AttemptError so callers can log them and
// move on to the next layer.
pub async fn get_with_retry(
    client: &Client,
    url: &str,
    query: &[(&str, &str)],
    retry_delay: Duration,
) -> Result<Response, AttemptError> {
    if !is_http_url(url) {
        return Err(AttemptError::InvalidUrl(url.to_string()));
    }

    let response = client.get(url).query(query).send().await?;
    if !is_retryable(response.status()) {
        return Ok(response);
    }

    debug!(
        "{} answered HTTP {}, retrying once in {:?}",
        url,
        response.status().as_u16(),
        retry_delay
    );
    tokio::time::sleep(retry_delay).await;
    Ok(client.get(url).query(query).send().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_predicate() {
        assert!(is_success_status(200));
        assert!(is_success_status(301));
        assert!(is_success_status(302));
        assert!(!is_success_status(204));
        assert!(!is_success_status(404));
        assert!(!is_success_status(-1));
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com"));
        assert!(is_http_url("http://example.com/path?q=1"));
        assert!(!is_http_url("mailto:test@example.com"));
        assert!(!is_http_url("/relative/path"));
        assert!(!is_http_url("ftp://example.com"));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
    }

    #[test]
    fn test_clients_build_from_default_config() {
        assert!(HttpClients::new(&Config::default()).is_ok());
    }

    #[tokio::test]
    async fn test_invalid_url_is_not_sent() {
        let clients = HttpClients::new(&Config::default()).unwrap();
        let result = get_with_retry(&clients.direct, "not a url", &[], Duration::ZERO).await;
        assert!(matches!(result, Err(AttemptError::InvalidUrl(_))));
    }
}

// src/config.rs
// =============================================================================
// Run configuration.
//
// Everything a run needs to know (whitelists, proxy template, author URL,
// fallback API endpoints, timeouts) lives in one immutable Config value.
// It is built once from the CLI in main.rs and then handed to every component
// by reference, so no component reads environment variables or globals.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

/// Default input location when neither --source nor SOURCE_URL is given
pub const DEFAULT_SOURCE: &str = "./link.csv";
/// Default report location
pub const DEFAULT_RESULT_FILE: &str = "./result.json";

/// Width of the stage 1 worker pool
pub const DEFAULT_WORKERS: usize = 10;
/// Pause before every fallback API call
pub const DEFAULT_API_DELAY: Duration = Duration::from_millis(200);
/// Pause before the single re-attempt after a 429/503 answer
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

pub const SSL_TIMEOUT: Duration = Duration::from_secs(10);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(15);
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_API1_URL: &str = "https://uapis.cn/api/v1/network/urlstatus";
pub const DEFAULT_API2_URL: &str = "https://v2.xxapi.cn/api/status";

/// Browser-like User-Agent used for probing; some hosts refuse obvious bots
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) ",
    "Chrome/123.0.0.0 Safari/537.36 ",
    "(flink-check/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// How a fallback API encodes the status of the URL it checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiShape {
    /// A single numeric field holding the target's HTTP status, e.g. {"status": 200}
    StatusField { field: String },
    /// A service code plus a data field, e.g. {"code": 200, "data": 301}.
    /// The code must be 200 and the data must satisfy the success predicate.
    CodeData { code_field: String, data_field: String },
}

/// One third-party "is this URL up" service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackApi {
    /// Endpoint without query string
    pub endpoint: String,
    /// Name of the query parameter that carries the target link
    pub query_param: String,
    pub shape: ApiShape,
}

impl FallbackApi {
    pub fn status_field(endpoint: impl Into<String>) -> Self {
        FallbackApi {
            endpoint: endpoint.into(),
            query_param: "url".to_string(),
            shape: ApiShape::StatusField {
                field: "status".to_string(),
            },
        }
    }

    pub fn code_data(endpoint: impl Into<String>) -> Self {
        FallbackApi {
            endpoint: endpoint.into(),
            query_param: "url".to_string(),
            shape: ApiShape::CodeData {
                code_field: "code".to_string(),
                data_field: "data".to_string(),
            },
        }
    }
}

/// Per-layer network timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub ssl: Duration,
    pub probe: Duration,
    pub api: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Timeouts {
            ssl: SSL_TIMEOUT,
            probe: PROBE_TIMEOUT,
            api: API_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Input list: local path or http(s) URL
    pub source: String,
    /// Where the previous report is read from and the new one written to
    pub result_file: PathBuf,
    /// Links that skip every reachability check
    pub access_whitelist: Vec<String>,
    /// Links that skip the backlink check and count as having one
    pub backlink_whitelist: Vec<String>,
    /// Proxy URL; `{}` is replaced by the link, otherwise the link is appended
    pub proxy_template: Option<String>,
    /// The URL that friend link pages are expected to reference
    pub author_url: Option<String>,
    pub api1: FallbackApi,
    pub api2: FallbackApi,
    pub workers: usize,
    pub api_delay: Duration,
    pub retry_delay: Duration,
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source: DEFAULT_SOURCE.to_string(),
            result_file: PathBuf::from(DEFAULT_RESULT_FILE),
            access_whitelist: Vec::new(),
            backlink_whitelist: Vec::new(),
            proxy_template: None,
            author_url: None,
            api1: FallbackApi::status_field(DEFAULT_API1_URL),
            api2: FallbackApi::code_data(DEFAULT_API2_URL),
            workers: DEFAULT_WORKERS,
            api_delay: DEFAULT_API_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    // Rewrites a link into its proxied form, if a proxy is configured
    //
    // Example:
    //   template = "https://proxy.example/?u={}"
    //   link = "https://blog.example/"
    //   result = Some("https://proxy.example/?u=https://blog.example/")
    //
    // A template without "{}" is treated as a prefix, which is how the
    // PROXY_URL variable has always been written in CI setups.
    pub fn proxied_url(&self, link: &str) -> Option<String> {
        let template = self.proxy_template.as_deref()?.trim();
        if template.is_empty() {
            return None;
        }
        if template.contains("{}") {
            Some(template.replacen("{}", link, 1))
        } else {
            Some(format!("{}{}", template, link))
        }
    }
}

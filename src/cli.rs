// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Every option can also come from an environment variable, which is how the
// checker usually runs in CI (SOURCE_URL, PROXY_URL, AUTHOR_URL, ...).
// Command line flags win over the environment.
//
// The parsed Cli is turned into a Config exactly once, in into_config().
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use flink_check::config::{
    ApiShape, Config, FallbackApi, Timeouts, DEFAULT_API1_URL, DEFAULT_API2_URL,
    DEFAULT_API_DELAY, DEFAULT_RESULT_FILE, DEFAULT_RETRY_DELAY, DEFAULT_SOURCE, DEFAULT_WORKERS,
};

#[derive(Parser, Debug)]
#[command(
    name = "flink-check",
    version,
    about = "Check a list of friend links for reachability",
    long_about = "flink-check probes every link directly, through an optional proxy and \
                  finally through two third-party status APIs, verifies that link pages \
                  reference the author URL, and keeps a failure streak per link in a JSON report."
)]
pub struct Cli {
    /// Link list: local path or http(s) URL (JSON or CSV)
    #[arg(long, env = "SOURCE_URL", default_value = DEFAULT_SOURCE)]
    pub source: String,

    /// Report file; the previous report is read from here too
    #[arg(long, env = "RESULT_FILE", default_value = DEFAULT_RESULT_FILE)]
    pub result_file: PathBuf,

    /// Proxy URL; "{}" is replaced by the link, otherwise the link is appended
    #[arg(long, env = "PROXY_URL")]
    pub proxy_url: Option<String>,

    /// URL that friend link pages should reference
    #[arg(long, env = "AUTHOR_URL")]
    pub author_url: Option<String>,

    /// Links (exact URL or bare host) that skip reachability checks
    #[arg(long, env = "ACCESS_WHITELIST", value_delimiter = ',')]
    pub access_whitelist: Vec<String>,

    /// Links (exact URL or bare host) that skip the backlink check
    #[arg(long, env = "LINK_WHITELIST", value_delimiter = ',')]
    pub backlink_whitelist: Vec<String>,

    /// First fallback API; answers with a single status field
    #[arg(long, env = "API1_URL", default_value = DEFAULT_API1_URL)]
    pub api1_url: String,

    /// Name of the status field in the first API's answer
    #[arg(long, default_value = "status")]
    pub api1_status_field: String,

    /// Second fallback API; answers with a code + data pair
    #[arg(long, env = "API2_URL", default_value = DEFAULT_API2_URL)]
    pub api2_url: String,

    #[arg(long, default_value = "code")]
    pub api2_code_field: String,

    #[arg(long, default_value = "data")]
    pub api2_data_field: String,

    /// Number of links probed in parallel
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Pause before every fallback API call, in milliseconds
    #[arg(long, default_value_t = DEFAULT_API_DELAY.as_millis() as u64)]
    pub api_delay_ms: u64,

    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,

    #[arg(long, env = "LOG_LEVEL", value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl Cli {
    pub fn into_config(self) -> Config {
        let api1 = FallbackApi {
            shape: ApiShape::StatusField {
                field: self.api1_status_field,
            },
            ..FallbackApi::status_field(self.api1_url)
        };
        let api2 = FallbackApi {
            shape: ApiShape::CodeData {
                code_field: self.api2_code_field,
                data_field: self.api2_data_field,
            },
            ..FallbackApi::code_data(self.api2_url)
        };

        Config {
            source: self.source,
            result_file: self.result_file,
            access_whitelist: self.access_whitelist,
            backlink_whitelist: self.backlink_whitelist,
            proxy_template: self.proxy_url.filter(|p| !p.trim().is_empty()),
            author_url: self.author_url.filter(|a| !a.trim().is_empty()),
            api1,
            api2,
            workers: self.workers.max(1),
            api_delay: Duration::from_millis(self.api_delay_ms),
            retry_delay: DEFAULT_RETRY_DELAY,
            timeouts: Timeouts::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["flink-check"]).unwrap();
        let config = cli.into_config();
        assert_eq!(config.workers, 10);
        assert_eq!(config.api_delay, Duration::from_millis(200));
        assert!(matches!(config.api2.shape, ApiShape::CodeData { .. }));
    }

    #[test]
    fn test_whitelists_split_on_commas() {
        let cli = Cli::try_parse_from([
            "flink-check",
            "--access-whitelist",
            "https://a.example/,b.example",
            "--backlink-whitelist",
            "c.example",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(config.access_whitelist, vec!["https://a.example/", "b.example"]);
        assert_eq!(config.backlink_whitelist, vec!["c.example"]);
    }

    #[test]
    fn test_api_field_overrides() {
        let cli = Cli::try_parse_from([
            "flink-check",
            "--api1-status-field",
            "http_code",
            "--workers",
            "0",
        ])
        .unwrap();
        let config = cli.into_config();
        assert_eq!(
            config.api1.shape,
            ApiShape::StatusField {
                field: "http_code".to_string()
            }
        );
        assert_eq!(config.workers, 1);
    }
}

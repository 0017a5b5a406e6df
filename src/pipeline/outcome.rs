// src/pipeline/outcome.rs
// =============================================================================
// The vocabulary shared by every stage of the pipeline.
//
// - CheckLayer: which layer produced the verdict for a link
// - StageOutcome: what a single stage says about a link. The set is closed:
//   resolved (reachable), rejected (terminally unreachable) or escalate
//   (try the next layer). Only the orchestrator acts on it.
// - ProbeOutcome: the per-link record that goes into reconciliation
// =============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status code recorded when no HTTP response was ever seen
pub const NO_RESPONSE: i64 = -1;
/// Latency recorded for unreachable links
pub const UNREACHABLE_LATENCY: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckLayer {
    /// Listed in the access whitelist, never probed
    Whitelist,
    /// https link whose certificate failed validation
    SslReject,
    /// Plain GET on the link
    Direct,
    /// GET through the configured proxy
    Proxy,
    /// First fallback status API
    Api1,
    /// Second fallback status API
    Api2,
    /// Every layer failed
    #[serde(rename = "none")]
    Exhausted,
}

impl CheckLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckLayer::Whitelist => "whitelist",
            CheckLayer::SslReject => "ssl_reject",
            CheckLayer::Direct => "direct",
            CheckLayer::Proxy => "proxy",
            CheckLayer::Api1 => "api1",
            CheckLayer::Api2 => "api2",
            CheckLayer::Exhausted => "none",
        }
    }

    /// Whether a verdict from this layer means "reachable"
    pub fn is_success(self) -> bool {
        !matches!(self, CheckLayer::SslReject | CheckLayer::Exhausted)
    }
}

impl fmt::Display for CheckLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub layer: CheckLayer,
    pub status: i64,
    pub latency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub layer: CheckLayer,
    pub status: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub reason: String,
    /// Seconds spent on the link so far
    pub latency: f64,
    /// Last status code any layer observed
    pub last_status: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Resolved(Resolution),
    Rejected(Rejection),
    Escalate(Escalation),
}

/// Everything the pipeline learned about one link
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub check_layer: CheckLayer,
    pub latency: f64,
    pub raw_status_code: i64,
    pub ssl_ok: bool,
    pub ssl_message: String,
    pub is_whitelisted: bool,
    pub has_author_link: bool,
}

impl ProbeOutcome {
    pub fn is_accessible(&self) -> bool {
        self.check_layer.is_success()
    }

    /// Folds a later stage's verdict into this one.
    ///
    /// Once a link is reachable the verdict is final; a later failure only
    /// replaces an earlier failure.
    pub fn apply_later_stage(&mut self, later: ProbeOutcome) {
        if self.is_accessible() {
            return;
        }
        *self = later;
    }
}

/// Seconds rounded to two decimals, the precision the report carries
pub fn round_latency(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(layer: CheckLayer, latency: f64) -> ProbeOutcome {
        ProbeOutcome {
            check_layer: layer,
            latency,
            raw_status_code: NO_RESPONSE,
            ssl_ok: true,
            ssl_message: String::new(),
            is_whitelisted: false,
            has_author_link: false,
        }
    }

    #[test]
    fn test_layer_names_match_report_values() {
        assert_eq!(CheckLayer::Exhausted.to_string(), "none");
        assert_eq!(CheckLayer::SslReject.to_string(), "ssl_reject");
        assert_eq!(
            serde_json::to_string(&CheckLayer::Exhausted).unwrap(),
            "\"none\""
        );
        assert_eq!(serde_json::to_string(&CheckLayer::Api2).unwrap(), "\"api2\"");
    }

    #[test]
    fn test_success_layers() {
        assert!(CheckLayer::Whitelist.is_success());
        assert!(CheckLayer::Api1.is_success());
        assert!(!CheckLayer::SslReject.is_success());
        assert!(!CheckLayer::Exhausted.is_success());
    }

    #[test]
    fn test_later_success_overrides_failure() {
        let mut current = outcome(CheckLayer::Exhausted, UNREACHABLE_LATENCY);
        current.apply_later_stage(outcome(CheckLayer::Api1, 1.5));
        assert_eq!(current.check_layer, CheckLayer::Api1);
        assert_eq!(current.latency, 1.5);
    }

    #[test]
    fn test_later_failure_never_overrides_success() {
        let mut current = outcome(CheckLayer::Direct, 0.3);
        current.apply_later_stage(outcome(CheckLayer::Exhausted, UNREACHABLE_LATENCY));
        assert_eq!(current.check_layer, CheckLayer::Direct);
    }

    #[test]
    fn test_round_latency() {
        assert_eq!(round_latency(0.12345), 0.12);
        assert_eq!(round_latency(1.999), 2.0);
    }
}

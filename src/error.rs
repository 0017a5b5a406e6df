// src/error.rs
// =============================================================================
// Typed errors.
//
// Most of the application returns anyhow::Result, like the rest of the tool.
// Two places want a concrete type instead:
// - AttemptError: why a single probe/API attempt did not succeed. These never
//   leave the stage that produced them; they are logged and the link falls
//   through to the next layer.
// - SourceError: why the input list could not be obtained. This is the one
//   fatal error of a run.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("not an http(s) URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for AttemptError {
    // Mirrors the categorisation a link checker needs for its log lines:
    // timeouts and connection problems are the common cases
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            AttemptError::Timeout
        } else if error.is_connect() {
            AttemptError::Connect(error.to_string())
        } else if error.is_decode() {
            AttemptError::Decode(error.to_string())
        } else {
            AttemptError::Transport(error.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read source file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch source URL {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("source {0} contains no usable links")]
    Empty(String),
}

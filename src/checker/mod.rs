// src/checker/mod.rs
// =============================================================================
// This module contains the individual verification layers.
//
// Submodules, in the order a link meets them:
// - whitelist: access / backlink allow-lists
// - ssl:       raw TLS handshake and certificate expiry check
// - probe:     direct GET, then proxied GET
// - fallback:  third-party "is this URL up" services
// - backlink:  does the site's link page reference the author URL?
//
// http and html hold the plumbing they share (clients, retry, href parsing).
// Each layer is constructed from the run Config and knows nothing about the
// others; the pipeline module decides what runs when.
// =============================================================================

mod backlink;
mod fallback;
mod html;
mod http;
mod probe;
mod ssl;
mod whitelist;

pub use backlink::{author_variants, BacklinkMatch, BacklinkVerifier};
pub use fallback::{decode_target_status, ApiChecker};
pub use html::extract_hrefs;
pub use http::{get_with_retry, is_http_url, is_success_status, HttpClients};
pub use probe::Prober;
pub use ssl::{SslCheck, SslValidator};
pub use whitelist::{WhitelistMatch, WhitelistPolicy};

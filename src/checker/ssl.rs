// src/checker/ssl.rs
// =============================================================================
// Certificate validation by raw TLS handshake.
//
// How it works:
// 1. Only https links are checked; http links pass trivially
// 2. Resolve the host and open a TCP connection (port 443 unless the link
//    names one)
// 3. Perform a rustls handshake against the webpki root store; this already
//    rejects untrusted chains, hostname mismatches and expired certificates
// 4. Parse the leaf certificate with x509-parser and compare not_after with
//    the current time
//
// The whole sequence shares one timeout. Every failure becomes ok=false with
// a message; nothing here returns an error to the caller.
// =============================================================================

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use rustls::pki_types::ServerName;
use rustls::{CertificateError, ClientConfig, RootCertStore};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::{Host, Url};

use crate::pipeline::outcome::{round_latency, CheckLayer, Rejection, StageOutcome, NO_RESPONSE};

const HTTPS_PORT: u16 = 443;

/// Result of validating one link's certificate
#[derive(Debug, Clone, PartialEq)]
pub struct SslCheck {
    pub ok: bool,
    pub message: String,
    /// Seconds spent on the check
    pub elapsed: f64,
}

impl SslCheck {
    pub fn not_required() -> Self {
        SslCheck {
            ok: true,
            message: "no SSL check required".to_string(),
            elapsed: 0.0,
        }
    }

    /// The terminal verdict for a failed check; `None` lets probing go ahead
    pub fn rejection(&self) -> Option<StageOutcome> {
        if self.ok {
            return None;
        }
        Some(StageOutcome::Rejected(Rejection {
            layer: CheckLayer::SslReject,
            status: NO_RESPONSE,
            reason: self.message.clone(),
        }))
    }
}

#[derive(Debug, Error)]
enum SslFailure {
    #[error("hostname resolution failed: {0}")]
    Resolve(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("TLS handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Handshake(String),

    #[error("server presented no certificate")]
    NoCertificate,

    #[error("certificate could not be parsed: {0}")]
    Parse(String),

    #[error("certificate expired at {0}")]
    Expired(String),

    #[error("certificate not valid before {0}")]
    NotYetValid(String),
}

#[derive(Clone)]
pub struct SslValidator {
    connector: TlsConnector,
    timeout: Duration,
}

impl SslValidator {
    pub fn new(timeout: Duration) -> Self {
        let mut root_store = RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        SslValidator {
            connector: TlsConnector::from(Arc::new(config)),
            timeout,
        }
    }

    pub async fn validate(&self, link: &str) -> SslCheck {
        let url = match Url::parse(link) {
            Ok(url) if url.scheme() == "https" => url,
            // http links and anything unparseable are the prober's problem
            _ => return SslCheck::not_required(),
        };

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.inspect(&url)).await {
            Ok(result) => result,
            Err(_) => Err(SslFailure::Timeout(self.timeout)),
        };
        let elapsed = round_latency(started.elapsed().as_secs_f64());

        match result {
            Ok(valid_until) => SslCheck {
                ok: true,
                message: format!("certificate valid until {}", valid_until),
                elapsed,
            },
            Err(failure) => {
                debug!("[ssl] {} failed validation: {}", link, failure);
                SslCheck {
                    ok: false,
                    message: failure.to_string(),
                    elapsed,
                }
            }
        }
    }

    // Handshakes with the host and returns the certificate's expiry, formatted
    async fn inspect(&self, url: &Url) -> Result<String, SslFailure> {
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(SslFailure::Resolve("link has no host".to_string())),
        };
        let port = url.port().unwrap_or(HTTPS_PORT);

        let server_name = ServerName::try_from(host.clone())
            .map_err(|e| SslFailure::Resolve(format!("invalid server name {}: {}", host, e)))?;

        let addresses = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| SslFailure::Resolve(format!("{}: {}", host, e)))?;
        let socket = connect_any(&host, addresses).await?;

        let tls_stream = self
            .connector
            .connect(server_name, socket)
            .await
            .map_err(|e| SslFailure::Handshake(describe_handshake_error(&e)))?;

        let leaf = tls_stream
            .get_ref()
            .1
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(SslFailure::NoCertificate)?;

        let (_, cert) = x509_parser::parse_x509_certificate(leaf.as_ref())
            .map_err(|e| SslFailure::Parse(e.to_string()))?;

        let validity = cert.validity();
        let now = chrono::Utc::now().timestamp();
        let not_before = validity.not_before.timestamp();
        let not_after = validity.not_after.timestamp();

        if not_after < now {
            return Err(SslFailure::Expired(format_timestamp(not_after)));
        }
        if not_before > now {
            return Err(SslFailure::NotYetValid(format_timestamp(not_before)));
        }

        Ok(format_timestamp(not_after))
    }
}

// Connects to the first address that accepts, in resolver order
//
// Hosts often resolve to an IPv6 address first; on a machine without an IPv6
// route that one fails and the IPv4 address behind it must still be tried.
async fn connect_any(
    host: &str,
    addresses: impl IntoIterator<Item = SocketAddr>,
) -> Result<TcpStream, SslFailure> {
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect(address).await {
            Ok(socket) => return Ok(socket),
            Err(e) => {
                debug!("[ssl] {} via {} failed: {}", host, address, e);
                last_error = Some(format!("{}: {}", address, e));
            }
        }
    }

    Err(match last_error {
        Some(reason) => SslFailure::Connect(reason),
        None => SslFailure::Resolve(format!("{}: no addresses", host)),
    })
}

// Turns a rustls handshake failure into a readable reason
fn describe_handshake_error(error: &io::Error) -> String {
    let rustls_error = error
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>());

    match rustls_error {
        Some(rustls::Error::InvalidCertificate(CertificateError::Expired)) => {
            "certificate expired".to_string()
        }
        Some(rustls::Error::InvalidCertificate(CertificateError::NotValidForName)) => {
            "certificate does not match hostname".to_string()
        }
        Some(rustls::Error::InvalidCertificate(other)) => {
            format!("invalid certificate: {:?}", other)
        }
        Some(other) => format!("TLS handshake failed: {}", other),
        None => format!("TLS handshake failed: {}", error),
    }
}

fn format_timestamp(unix_seconds: i64) -> String {
    match chrono::DateTime::from_timestamp(unix_seconds, 0) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => unix_seconds.to_string(),
    }
}

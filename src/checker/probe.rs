// src/checker/probe.rs
// =============================================================================
// Reachability probing: direct GET first, proxied GET second.
//
// The first attempt whose status satisfies the success predicate wins and
// names the layer (direct / proxy). Transport errors and other statuses are
// logged and the next method is tried. When both are exhausted the link is
// escalated to the fallback APIs, carrying the time spent and the last
// status code we saw.
// =============================================================================

use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use reqwest::Client;

use super::http::{get_with_retry, is_http_url, is_success_status, HttpClients};
use crate::config::Config;
use crate::pipeline::outcome::{
    round_latency, CheckLayer, Escalation, Resolution, StageOutcome, NO_RESPONSE,
};

#[derive(Clone)]
pub struct Prober {
    clients: HttpClients,
    config: Arc<Config>,
}

impl Prober {
    pub fn new(clients: HttpClients, config: Arc<Config>) -> Self {
        Prober { clients, config }
    }

    // Returns Resolved(direct|proxy) or Escalate; never Rejected
    pub async fn probe(&self, link: &str) -> StageOutcome {
        let attempts: [(CheckLayer, Option<String>, &Client); 2] = [
            (CheckLayer::Direct, Some(link.to_string()), &self.clients.direct),
            (CheckLayer::Proxy, self.config.proxied_url(link), &self.clients.proxy),
        ];

        let mut spent = 0.0;
        let mut last_status = NO_RESPONSE;

        for (layer, target, client) in attempts {
            // No proxy configured
            let Some(target) = target else { continue };

            if !is_http_url(&target) {
                warn!("[{}] not an http(s) URL, skipping: {}", layer, target);
                continue;
            }

            let started = Instant::now();
            let result = get_with_retry(client, &target, &[], self.config.retry_delay).await;
            let took = started.elapsed().as_secs_f64();
            spent += took;

            match result {
                Ok(response) => {
                    let status = i64::from(response.status().as_u16());
                    last_status = status;
                    if is_success_status(status) {
                        info!("[{}] reached {} in {:.2}s (HTTP {})", layer, link, took, status);
                        return StageOutcome::Resolved(Resolution {
                            layer,
                            status,
                            latency: round_latency(took),
                        });
                    }
                    warn!("[{}] {} answered HTTP {}", layer, link, status);
                }
                Err(e) => {
                    warn!("[{}] {} failed: {}", layer, link, e);
                }
            }
        }

        StageOutcome::Escalate(Escalation {
            reason: "direct and proxy attempts did not succeed".to_string(),
            latency: round_latency(spent),
            last_status,
        })
    }
}

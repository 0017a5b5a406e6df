// src/pipeline/orchestrator.rs
// =============================================================================
// Runs the verification layers over the whole input list.
//
// Stage 1 (parallel, bounded):   whitelist -> SSL -> direct/proxy probe
// Stage 2 (sequential):          fallback API 1, one link at a time
// Stage 3 (sequential):          fallback API 2, one link at a time
//
// Links that stage 1 cannot reach are pushed onto an escalation queue
// (a tokio mpsc channel: many stage-1 workers produce, stage 2 consumes).
// Stage 2 forwards what it cannot resolve to stage 3 in the same order.
// Each stage finishes completely before the next one starts.
//
// The fallback APIs are shared, rate-limited services: stages 2 and 3 never
// run calls in parallel and always wait api_delay before each call.
// =============================================================================

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::mpsc::{self, UnboundedSender};

use super::outcome::{
    CheckLayer, Escalation, ProbeOutcome, Rejection, Resolution, StageOutcome, NO_RESPONSE,
    UNREACHABLE_LATENCY,
};
use crate::checker::{
    ApiChecker, BacklinkVerifier, HttpClients, Prober, SslCheck, SslValidator, WhitelistMatch,
    WhitelistPolicy,
};
use crate::config::Config;
use crate::report::StageResults;
use crate::source::LinkEntry;

/// A link waiting for the next fallback API
#[derive(Debug, Clone)]
struct EscalatedLink {
    entry: LinkEntry,
    whitelist: WhitelistMatch,
    ssl: SslCheck,
    escalation: Escalation,
}

struct Stages {
    config: Arc<Config>,
    whitelist: WhitelistPolicy,
    ssl: SslValidator,
    prober: Prober,
    api1: ApiChecker,
    api2: ApiChecker,
    backlink: Option<BacklinkVerifier>,
}

/// The staged link checker; cheap to clone, every clone shares the same stages
#[derive(Clone)]
pub struct Pipeline {
    stages: Arc<Stages>,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let clients = HttpClients::new(&config)?;

        let backlink = config
            .author_url
            .as_deref()
            .map(str::trim)
            .filter(|author| !author.is_empty())
            .map(|author| BacklinkVerifier::new(clients.raw.clone(), author, config.retry_delay));

        let stages = Stages {
            whitelist: WhitelistPolicy::new(&config.access_whitelist, &config.backlink_whitelist),
            ssl: SslValidator::new(config.timeouts.ssl),
            prober: Prober::new(clients.clone(), Arc::clone(&config)),
            api1: ApiChecker::new(
                CheckLayer::Api1,
                config.api1.clone(),
                clients.raw.clone(),
                config.retry_delay,
            ),
            api2: ApiChecker::new(
                CheckLayer::Api2,
                config.api2.clone(),
                clients.raw.clone(),
                config.retry_delay,
            ),
            backlink,
            config,
        };

        Ok(Pipeline {
            stages: Arc::new(stages),
        })
    }

    // Checks every entry and returns the merged per-link outcomes
    //
    // Entries are expected to be unique by link; the reconciler drops
    // duplicates, so checking one twice would only waste requests.
    pub async fn run(&self, entries: Vec<LinkEntry>) -> StageResults {
        let mut results = StageResults::new();
        let (queue_tx, mut queue_rx) = mpsc::unbounded_channel::<EscalatedLink>();

        // ---- Stage 1: bounded parallel probing ----
        let workers = self.stages.config.workers.max(1);
        info!("stage 1: checking {} link(s) with {} workers", entries.len(), workers);

        let tasks = entries.into_iter().map(|entry| {
            let pipeline = self.clone();
            let queue_tx = queue_tx.clone();
            let link = entry.link.clone();
            async move {
                // Spawned so a panic while checking one link cannot take the
                // rest of the run down with it
                let handle = tokio::spawn(async move { pipeline.check_entry(entry, queue_tx).await });
                (link, handle.await)
            }
        });

        let finished: Vec<_> = stream::iter(tasks).buffer_unordered(workers).collect().await;
        for (link, joined) in finished {
            match joined {
                Ok(outcome) => results.record(link, outcome),
                Err(e) => error!("worker checking {} failed: {}", link, e),
            }
        }

        // Every stage-1 sender is gone once this one is dropped, so the
        // receiver below ends after draining what was queued
        drop(queue_tx);

        // ---- Stage 2: first fallback API ----
        let mut api2_queue = VecDeque::new();
        let mut processed = 0;
        while let Some(item) = queue_rx.recv().await {
            processed += 1;
            if let Some(next) = self.run_api_stage(&self.stages.api1, item, &mut results).await {
                api2_queue.push_back(next);
            }
        }
        info!(
            "stage 2: {} link(s) sent to {}, {} left unresolved",
            processed,
            self.stages.api1.layer(),
            api2_queue.len()
        );

        // ---- Stage 3: second fallback API ----
        let remaining = api2_queue.len();
        while let Some(item) = api2_queue.pop_front() {
            if let Some(unresolved) = self.run_api_stage(&self.stages.api2, item, &mut results).await
            {
                warn!(
                    "[{}] every layer failed for {}: {}",
                    CheckLayer::Exhausted,
                    unresolved.entry.link,
                    unresolved.escalation.reason
                );
                let rejection = Rejection {
                    layer: CheckLayer::Exhausted,
                    status: unresolved.escalation.last_status,
                    reason: unresolved.escalation.reason.clone(),
                };
                let outcome = failure_outcome(&unresolved.whitelist, &unresolved.ssl, rejection);
                results.record(unresolved.entry.link, outcome);
            }
        }
        info!("stage 3: {} link(s) sent to {}", remaining, self.stages.api2.layer());

        results
    }

    // Stage 1 for a single entry
    async fn check_entry(
        &self,
        entry: LinkEntry,
        queue: UnboundedSender<EscalatedLink>,
    ) -> ProbeOutcome {
        let link = entry.link.as_str();
        let whitelist = self.stages.whitelist.classify(link);

        if whitelist.access {
            info!("[{}] {} is on the access whitelist, not probing", CheckLayer::Whitelist, link);
            let resolution = Resolution {
                layer: CheckLayer::Whitelist,
                status: NO_RESPONSE,
                latency: 0.0,
            };
            let ssl = SslCheck {
                ok: true,
                message: "skipped: whitelisted".to_string(),
                elapsed: 0.0,
            };
            let has_author_link = self.author_link(&entry, &whitelist).await;
            return success_outcome(&whitelist, &ssl, resolution, has_author_link);
        }

        let ssl = self.stages.ssl.validate(link).await;
        let outcome = match ssl.rejection() {
            Some(rejected) => rejected,
            None => self.stages.prober.probe(link).await,
        };

        match outcome {
            StageOutcome::Resolved(resolution) => {
                let has_author_link = self.author_link(&entry, &whitelist).await;
                success_outcome(&whitelist, &ssl, resolution, has_author_link)
            }
            StageOutcome::Rejected(rejection) => {
                warn!("[{}] {}: {}", rejection.layer, link, rejection.reason);
                failure_outcome(&whitelist, &ssl, rejection)
            }
            StageOutcome::Escalate(escalation) => {
                debug!("escalating {}: {}", link, escalation.reason);
                // Provisional verdict until a fallback API says otherwise
                let provisional = Rejection {
                    layer: CheckLayer::Exhausted,
                    status: escalation.last_status,
                    reason: escalation.reason.clone(),
                };
                let outcome = failure_outcome(&whitelist, &ssl, provisional);

                let item = EscalatedLink {
                    entry: entry.clone(),
                    whitelist,
                    ssl,
                    escalation,
                };
                if queue.send(item).is_err() {
                    error!("escalation queue closed before {} could be queued", entry.link);
                }
                outcome
            }
        }
    }

    // One sequential fallback step; returns the link if it is still unresolved
    async fn run_api_stage(
        &self,
        api: &ApiChecker,
        item: EscalatedLink,
        results: &mut StageResults,
    ) -> Option<EscalatedLink> {
        tokio::time::sleep(self.stages.config.api_delay).await;

        match api.check(&item.entry.link, &item.escalation).await {
            StageOutcome::Resolved(resolution) => {
                let has_author_link = self.author_link(&item.entry, &item.whitelist).await;
                let outcome = success_outcome(&item.whitelist, &item.ssl, resolution, has_author_link);
                results.record(item.entry.link, outcome);
                None
            }
            StageOutcome::Rejected(rejection) => {
                let outcome = failure_outcome(&item.whitelist, &item.ssl, rejection);
                results.record(item.entry.link, outcome);
                None
            }
            StageOutcome::Escalate(escalation) => Some(EscalatedLink { escalation, ..item }),
        }
    }

    // Backlink verdict for a link that turned out reachable
    async fn author_link(&self, entry: &LinkEntry, whitelist: &WhitelistMatch) -> bool {
        if whitelist.backlink {
            info!("[backlink] {} is on the backlink whitelist", entry.link);
            return true;
        }
        match (&self.stages.backlink, entry.linkpage()) {
            (Some(verifier), Some(linkpage)) => verifier.verify(linkpage).await,
            _ => false,
        }
    }
}

fn success_outcome(
    whitelist: &WhitelistMatch,
    ssl: &SslCheck,
    resolution: Resolution,
    has_author_link: bool,
) -> ProbeOutcome {
    ProbeOutcome {
        check_layer: resolution.layer,
        latency: resolution.latency,
        raw_status_code: resolution.status,
        ssl_ok: ssl.ok,
        ssl_message: ssl.message.clone(),
        is_whitelisted: whitelist.access,
        has_author_link,
    }
}

// Unreachable links still count as having a backlink when whitelisted for it
fn failure_outcome(whitelist: &WhitelistMatch, ssl: &SslCheck, rejection: Rejection) -> ProbeOutcome {
    debug!("[{}] unreachable: {}", rejection.layer, rejection.reason);
    ProbeOutcome {
        check_layer: rejection.layer,
        latency: UNREACHABLE_LATENCY,
        raw_status_code: rejection.status,
        ssl_ok: ssl.ok,
        ssl_message: ssl.message.clone(),
        is_whitelisted: whitelist.access,
        has_author_link: whitelist.backlink,
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why buffer_unordered plus tokio::spawn?
//    - buffer_unordered(workers) caps how many links are in flight
//    - spawn turns a panic inside one check into a JoinError for that link
//      only; the reconciler then leaves that link out of the report
//
// 2. Why an unbounded channel for escalations?
//    - stage 1 workers must never block on stage 2, which has not started
//      yet; the queue holds at most one item per input link
//
// 3. Why is stage 3 a VecDeque and not another channel?
//    - it has a single producer (stage 2) that finishes before stage 3
//      starts, so a plain FIFO is enough
// -----------------------------------------------------------------------------

//! End-to-end tests for the link checking pipeline
//!
//! Every test points the pipeline at a wiremock server standing in for the
//! checked sites, the proxy and both fallback APIs, and writes its report
//! into a temporary directory.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flink_check::config::{FallbackApi, Timeouts};
use flink_check::pipeline::CheckLayer;
use flink_check::{run_check, Config, LinkEntry, Report};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Config that sends both fallback APIs to the mock server and keeps delays short
fn test_config(server: &MockServer, result_file: PathBuf) -> Config {
    Config {
        result_file,
        api1: FallbackApi::status_field(format!("{}/api1", server.uri())),
        api2: FallbackApi::code_data(format!("{}/api2", server.uri())),
        api_delay: Duration::from_millis(10),
        retry_delay: Duration::from_millis(10),
        timeouts: Timeouts {
            ssl: Duration::from_secs(2),
            probe: Duration::from_secs(5),
            api: Duration::from_secs(5),
        },
        ..Config::default()
    }
}

fn report_path(dir: &TempDir) -> PathBuf {
    dir.path().join("result.json")
}

fn write_previous_report(path: &Path, entries: &[(&str, u32)]) {
    let link_status: Vec<_> = entries
        .iter()
        .map(|(link, fail_count)| json!({"name": "old", "link": link, "fail_count": fail_count}))
        .collect();
    let report = json!({"timestamp": "2026-10-17 08:00:00", "link_status": link_status});
    std::fs::write(path, serde_json::to_string_pretty(&report).unwrap()).unwrap();
}

async fn mount_get(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Fails the test (on server drop) if the route is ever requested
async fn mount_never(server: &MockServer, route: &str) {
    Mock::given(path(route))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}

fn only_entry(report: &Report) -> &flink_check::report::LinkStatus {
    assert_eq!(report.link_status.len(), 1, "report: {:?}", report);
    &report.link_status[0]
}

#[tokio::test]
async fn test_direct_success() {
    let server = MockServer::start().await;
    mount_get(&server, "/good", 200).await;
    mount_never(&server, "/api1").await;

    let dir = TempDir::new().unwrap();
    let link = format!("{}/good", server.uri());
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Direct);
    assert!(status.is_accessible);
    assert_eq!(status.fail_count, 0);
    assert_eq!(status.raw_status_code, 200);
    assert!(status.latency >= 0.0);
    assert!(status.ssl_ok);
    assert_eq!(status.ssl_message, "no SSL check required");
    assert_eq!(report.accessible_count, 1);
    assert_eq!(report.has_author_link_count, None);
}

#[tokio::test]
async fn test_escalation_to_first_api() {
    let server = MockServer::start().await;
    let link = format!("{}/broken", server.uri());
    mount_get(&server, "/broken", 500).await;
    Mock::given(method("GET"))
        .and(path("/api1"))
        .and(query_param("url", link.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 301})))
        .expect(1)
        .mount(&server)
        .await;
    mount_never(&server, "/api2").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Api1);
    assert!(status.is_accessible);
    assert_eq!(status.raw_status_code, 301);
    assert_eq!(status.fail_count, 0);
}

#[tokio::test]
async fn test_total_failure_increments_streak() {
    let server = MockServer::start().await;
    let link = format!("{}/missing", server.uri());
    mount_get(&server, "/missing", 404).await;
    Mock::given(method("GET"))
        .and(path("/api1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 404})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": 404})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    write_previous_report(&report_path(&dir), &[(link.as_str(), 3)]);
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Exhausted);
    assert!(!status.is_accessible);
    assert_eq!(status.fail_count, 4);
    assert_eq!(status.latency, -1.0);
    assert_eq!(status.raw_status_code, 404);
    assert_eq!(report.inaccessible_count, 1);
}

#[tokio::test]
async fn test_reachable_link_resets_streak() {
    let server = MockServer::start().await;
    let link = format!("{}/back", server.uri());
    mount_get(&server, "/back", 200).await;

    let dir = TempDir::new().unwrap();
    write_previous_report(&report_path(&dir), &[(link.as_str(), 3)]);
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    assert_eq!(only_entry(&report).fail_count, 0);
}

#[tokio::test]
async fn test_failing_first_api_falls_through_to_second() {
    let server = MockServer::start().await;
    let link = format!("{}/down", server.uri());
    mount_get(&server, "/down", 502).await;
    Mock::given(method("GET"))
        .and(path("/api1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2"))
        .and(query_param("url", link.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": "200", "data": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Api2);
    assert!(status.is_accessible);
}

#[tokio::test]
async fn test_malformed_api_answer_escalates() {
    let server = MockServer::start().await;
    let link = format!("{}/down", server.uri());
    mount_get(&server, "/down", 500).await;
    Mock::given(method("GET"))
        .and(path("/api1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 429, "msg": "slow down"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Exhausted);
    // Neither API told us anything, so the probe's status is what remains
    assert_eq!(status.raw_status_code, 500);
    assert_eq!(status.fail_count, 1);
}

#[tokio::test]
async fn test_proxy_rescues_blocked_link() {
    let server = MockServer::start().await;
    let link = format!("{}/blocked", server.uri());
    mount_get(&server, "/blocked", 403).await;
    Mock::given(method("GET"))
        .and(path("/proxy"))
        .and(query_param("target", link.as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_never(&server, "/api1").await;

    let dir = TempDir::new().unwrap();
    let config = Config {
        proxy_template: Some(format!("{}/proxy?target={{}}", server.uri())),
        ..test_config(&server, report_path(&dir))
    };

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Proxy);
    assert!(status.is_accessible);
}

#[tokio::test]
async fn test_single_retry_on_service_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_get(&server, "/flaky", 200).await;

    let dir = TempDir::new().unwrap();
    let link = format!("{}/flaky", server.uri());
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    assert_eq!(only_entry(&report).check_layer, CheckLayer::Direct);
}

#[tokio::test]
async fn test_access_whitelist_skips_probing() {
    let server = MockServer::start().await;
    mount_never(&server, "/api1").await;

    let dir = TempDir::new().unwrap();
    // .invalid never resolves: any probe would fail
    let link = "https://friend.invalid/";
    write_previous_report(&report_path(&dir), &[(link, 5)]);
    let config = Config {
        access_whitelist: vec![link.to_string()],
        ..test_config(&server, report_path(&dir))
    };

    let report = run_check(config, vec![LinkEntry::new("Friend", link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::Whitelist);
    assert!(status.is_accessible);
    assert!(status.is_whitelist);
    assert_eq!(status.fail_count, 0);
    assert_eq!(status.latency, 0.0);
}

#[tokio::test]
async fn test_invalid_certificate_is_rejected_before_probing() {
    let server = MockServer::start().await;
    mount_never(&server, "/secure").await;
    mount_never(&server, "/api1").await;
    mount_never(&server, "/api2").await;

    let dir = TempDir::new().unwrap();
    // The mock server speaks plain HTTP, so the TLS handshake cannot succeed
    let link = format!("https://127.0.0.1:{}/secure", server.address().port());
    let config = test_config(&server, report_path(&dir));

    let report = run_check(config, vec![LinkEntry::new("A", &link)]).await.unwrap();
    let status = only_entry(&report);

    assert_eq!(status.check_layer, CheckLayer::SslReject);
    assert!(!status.is_accessible);
    assert!(!status.ssl_ok);
    assert_eq!(status.fail_count, 1);
}

#[tokio::test]
async fn test_backlink_found_on_link_page() {
    let server = MockServer::start().await;
    mount_get(&server, "/friend", 200).await;
    Mock::given(method("GET"))
        .and(path("/friend/links"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><ul><li><a href="https://author.example/">Author</a></li></ul></body></html>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/stranger", 200).await;
    Mock::given(method("GET"))
        .and(path("/stranger/links"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>nobody here</p>"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let friend = format!("{}/friend", server.uri());
    let stranger = format!("{}/stranger", server.uri());
    let config = Config {
        author_url: Some("author.example".to_string()),
        ..test_config(&server, report_path(&dir))
    };
    let entries = vec![
        LinkEntry::new("Friend", &friend).with_linkpage(format!("{}/links", friend)),
        LinkEntry::new("Stranger", &stranger).with_linkpage(format!("{}/links", stranger)),
    ];

    let report = run_check(config, entries).await.unwrap();

    assert!(report.find(&friend).unwrap().has_author_link);
    assert!(!report.find(&stranger).unwrap().has_author_link);
    assert_eq!(report.has_author_link_count, Some(1));
    assert_eq!(report.author_url.as_deref(), Some("author.example"));
}

#[tokio::test]
async fn test_backlink_whitelist_skips_link_page() {
    let server = MockServer::start().await;
    mount_get(&server, "/friend", 200).await;
    mount_never(&server, "/friend/links").await;

    let dir = TempDir::new().unwrap();
    let friend = format!("{}/friend", server.uri());
    let config = Config {
        author_url: Some("author.example".to_string()),
        backlink_whitelist: vec![friend.clone()],
        ..test_config(&server, report_path(&dir))
    };
    let entries = vec![LinkEntry::new("Friend", &friend).with_linkpage(format!("{}/links", friend))];

    let report = run_check(config, entries).await.unwrap();
    assert!(only_entry(&report).has_author_link);
}

#[tokio::test]
async fn test_report_follows_input_and_prunes_stale_links() {
    let server = MockServer::start().await;
    mount_get(&server, "/one", 200).await;
    mount_get(&server, "/two", 200).await;
    mount_get(&server, "/three", 200).await;

    let dir = TempDir::new().unwrap();
    write_previous_report(&report_path(&dir), &[("https://gone.example/", 9)]);
    let links: Vec<String> = ["/one", "/two", "/three"]
        .iter()
        .map(|route| format!("{}{}", server.uri(), route))
        .collect();
    let entries: Vec<LinkEntry> = links.iter().map(|link| LinkEntry::new("site", link)).collect();
    let config = Config {
        workers: 2,
        ..test_config(&server, report_path(&dir))
    };

    let report = run_check(config, entries).await.unwrap();

    let reported: Vec<&str> = report.link_status.iter().map(|s| s.link.as_str()).collect();
    assert_eq!(reported, links.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(report.find("https://gone.example/").is_none());

    // What was returned is what was written
    let written: Report =
        serde_json::from_str(&std::fs::read_to_string(report_path(&dir)).unwrap()).unwrap();
    assert_eq!(written, report);
}

#[tokio::test]
async fn test_repeated_runs_agree_on_verdicts() {
    let server = MockServer::start().await;
    mount_get(&server, "/up", 200).await;
    mount_get(&server, "/down", 404).await;
    Mock::given(method("GET"))
        .and(path("/api1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": 404})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": 404})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let up = format!("{}/up", server.uri());
    let down = format!("{}/down", server.uri());
    let entries = vec![LinkEntry::new("Up", &up), LinkEntry::new("Down", &down)];

    let first = run_check(test_config(&server, report_path(&dir)), entries.clone())
        .await
        .unwrap();
    let second = run_check(test_config(&server, report_path(&dir)), entries)
        .await
        .unwrap();

    for link in [&up, &down] {
        let a = first.find(link).unwrap();
        let b = second.find(link).unwrap();
        assert_eq!(a.check_layer, b.check_layer);
        assert_eq!(a.raw_status_code, b.raw_status_code);
        assert_eq!(a.is_accessible, b.is_accessible);
    }
    assert_eq!(first.find(&down).unwrap().fail_count, 1);
    assert_eq!(second.find(&down).unwrap().fail_count, 2);
}

/// A status API that records which link it was asked about, and when
struct RecordingApi {
    calls: Arc<Mutex<Vec<(String, Instant)>>>,
    answer: fn(&str) -> Value,
}

impl Respond for RecordingApi {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let target = request
            .url
            .query_pairs()
            .find(|(key, _)| key == "url")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        self.calls.lock().unwrap().push((target.clone(), Instant::now()));
        ResponseTemplate::new(200).set_body_json((self.answer)(&target))
    }
}

fn recorded_links(calls: &[(String, Instant)]) -> Vec<String> {
    calls.iter().map(|(link, _)| link.clone()).collect()
}

#[tokio::test]
async fn test_fallback_apis_are_sequential_ordered_and_polite() {
    let server = MockServer::start().await;
    for route in ["/down/a", "/down/b", "/down/c"] {
        mount_get(&server, route, 500).await;
    }

    let api1_calls = Arc::new(Mutex::new(Vec::new()));
    let api2_calls = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("GET"))
        .and(path("/api1"))
        .respond_with(RecordingApi {
            calls: Arc::clone(&api1_calls),
            // Only b is rescued by the first API
            answer: |link| {
                let status = if link.ends_with("/down/b") { 200 } else { 404 };
                json!({"status": status})
            },
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api2"))
        .respond_with(RecordingApi {
            calls: Arc::clone(&api2_calls),
            answer: |_| json!({"code": 200, "data": 404}),
        })
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let links: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|id| format!("{}/down/{}", server.uri(), id))
        .collect();
    let entries: Vec<LinkEntry> = links.iter().map(|link| LinkEntry::new("site", link)).collect();
    let api_delay = Duration::from_millis(50);
    let config = Config {
        // One stage-1 worker queues escalations in input order
        workers: 1,
        api_delay,
        ..test_config(&server, report_path(&dir))
    };

    let report = run_check(config, entries).await.unwrap();

    let api1_calls = api1_calls.lock().unwrap().clone();
    let api2_calls = api2_calls.lock().unwrap().clone();
    assert_eq!(recorded_links(&api1_calls), links);
    assert_eq!(
        recorded_links(&api2_calls),
        vec![links[0].clone(), links[2].clone()]
    );

    // Every call, across both APIs, waited out the delay after the previous one
    let all_calls: Vec<Instant> = api1_calls
        .iter()
        .chain(api2_calls.iter())
        .map(|(_, at)| *at)
        .collect();
    for pair in all_calls.windows(2) {
        assert!(
            pair[1].duration_since(pair[0]) >= api_delay,
            "calls only {:?} apart",
            pair[1].duration_since(pair[0])
        );
    }

    assert_eq!(report.find(&links[0]).unwrap().check_layer, CheckLayer::Exhausted);
    assert_eq!(report.find(&links[1]).unwrap().check_layer, CheckLayer::Api1);
    assert_eq!(report.find(&links[2]).unwrap().check_layer, CheckLayer::Exhausted);
}

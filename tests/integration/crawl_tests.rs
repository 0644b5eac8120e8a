//! Integration tests for the harvester
//!
//! These tests use wiremock to serve listing and vacancy pages and run the
//! full coordinator end-to-end against an in-memory sink.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use vacancy_harvest::config::{parse_config, Config, PolitenessConfig};
use vacancy_harvest::crawler::Coordinator;
use vacancy_harvest::output::{
    FanoutSink, HarvestedRecord, MemorySink, OutputError, OutputResult, RecordSink,
};
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration that seeds from the mock server with no pacing
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.search.start_urls = vec![format!("{}/search/vacancy?text=rust", server.uri())];
    config.crawler.base_url = server.uri();
    config.crawler.max_concurrency = 3;
    config.crawler.request_timeout_secs = 5;
    config.politeness = PolitenessConfig {
        listing_requests_per_minute: 10_000,
        detail_requests_per_minute: 10_000,
        listing_delay_ms: [0, 0],
        detail_delay_ms: [0, 0],
        backoff_base_ms: 1,
        backoff_max_ms: 10,
    };
    config
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

/// Listing page made of vacancy cards
fn card_listing(ids: impl IntoIterator<Item = u32>, pager: &str) -> String {
    let cards: String = ids
        .into_iter()
        .map(|id| {
            format!(
                r#"<div data-qa="vacancy-serp__vacancy">
                    <a data-qa="serp-item__title" href="/vacancy/{id}?query=rust">Vacancy {id}</a>
                    <a data-qa="vacancy-serp__vacancy-employer">Company {id}</a>
                    <span data-qa="vacancy-serp__vacancy-compensation">{id}00 000 RUB</span>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{}{}</body></html>", cards, pager)
}

/// Listing page made of plain vacancy links
fn link_listing(ids: impl IntoIterator<Item = u32>, pager: &str) -> String {
    let links: String = ids
        .into_iter()
        .map(|id| format!(r#"<a data-qa="serp-item__title" href="/vacancy/{id}">Vacancy {id}</a>"#))
        .collect();
    format!("<html><body>{}{}</body></html>", links, pager)
}

fn vacancy_page(title: &str, company: &str) -> String {
    format!(
        r#"<html><body>
            <h1 data-qa="vacancy-title">{title}</h1>
            <a data-qa="vacancy-company-name">{company}</a>
            <div data-qa="vacancy-description"><p>Build things.</p></div>
        </body></html>"#
    )
}

fn urls_of(records: &[HarvestedRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.url().expect("record without url").to_string())
        .collect()
}

/// Sink that rejects every record
struct RejectingSink;

impl RecordSink for RejectingSink {
    fn emit(&self, _record: &HarvestedRecord) -> OutputResult<()> {
        Err(OutputError::Write("disk full".to_string()))
    }
}

/// Sink that rejects every `every`-th record and stores the rest
struct FlakySink {
    every: usize,
    calls: AtomicUsize,
    stored: Mutex<Vec<HarvestedRecord>>,
}

impl FlakySink {
    fn new(every: usize) -> Self {
        Self {
            every,
            calls: AtomicUsize::new(0),
            stored: Mutex::new(Vec::new()),
        }
    }

    fn stored(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

impl RecordSink for FlakySink {
    fn emit(&self, record: &HarvestedRecord) -> OutputResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call % self.every == 0 {
            return Err(OutputError::Write(format!("write {} rejected", call)));
        }
        self.stored.lock().unwrap().push(record.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_card_mode_stops_at_target() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing(1..=20, "")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.collect_details = false;
    config.crawler.target = 10;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 10);

    let urls = urls_of(&records);
    let unique: HashSet<_> = urls.iter().collect();
    assert_eq!(unique.len(), 10);
    assert!(urls.iter().all(|url| !url.contains('?')));

    assert!(records
        .iter()
        .all(|record| matches!(record, HarvestedRecord::Card(_))));
    assert_eq!(report.summary.total_saved, 10);
    assert!(report.summary.target_reached());
    assert_eq!(sink.summary(), Some(report.summary));
}

#[tokio::test]
async fn test_page_budget_blocks_pagination() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("page", "1"))
        .respond_with(html_response(link_listing(100..105, "")))
        .expect(0)
        .mount(&server)
        .await;

    let pager = r#"<a data-qa="pager-next" href="/search/vacancy?text=rust&page=1">next</a>"#;
    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing(1..=5, pager)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/vacancy/\d+$"))
        .respond_with(html_response(vacancy_page("Rust Engineer", "Acme")))
        .expect(5)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.target = 100;
    config.crawler.page_budget = 1;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stats.detail_enqueued, 5);
    assert_eq!(report.stats.pagination_enqueued, 0);
    assert_eq!(report.stats.listing_pages, 1);
    assert_eq!(sink.records().len(), 5);
    assert!(!report.summary.target_reached());
    assert!(report.summary.success);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing([42], "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/42"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/42"))
        .respond_with(html_response(vacancy_page("SRE", "Globex")))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.max_attempts = 4;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title(), Some("SRE"));
    assert_eq!(records[0].company(), Some("Globex"));
    assert!(records[0].url().unwrap().ends_with("/vacancy/42"));
    assert_eq!(report.stats.retries, 3);
    assert_eq!(report.stats.failed_terminal, 0);
}

#[tokio::test]
async fn test_retries_exhausted_drops_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing([7, 8], "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/7"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/8"))
        .respond_with(html_response(vacancy_page("Analyst", "Initech")))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.max_attempts = 2;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(urls_of(&sink.records()).len(), 1);
    assert_eq!(report.stats.retries, 1);
    assert_eq!(report.stats.failed_terminal, 1);
    assert!(report.summary.success);
}

#[tokio::test]
async fn test_permanent_failure_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing([404], "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/404"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(create_test_config(&server), sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(sink.records().is_empty());
    assert_eq!(report.stats.retries, 0);
    assert_eq!(report.stats.failed_terminal, 1);
    assert_eq!(report.summary.total_saved, 0);
}

#[tokio::test]
async fn test_blocked_responses_rotate_sessions() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing([9], "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/9"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/9"))
        .respond_with(html_response(vacancy_page("Support", "Umbrella")))
        .mount(&server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(create_test_config(&server), sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(sink.records().len(), 1);
    assert_eq!(report.stats.blocked, 2);
    assert_eq!(report.stats.retries, 2);
    assert!(report.stats.sessions_retired >= 1);
}

#[tokio::test]
async fn test_zero_target_is_clamped_to_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing(1..=3, "")))
        .mount(&server)
        .await;

    let toml = format!(
        r#"
        [search]
        start-urls = ["{uri}/search/vacancy?text=rust"]

        [crawler]
        target = 0
        collect-details = false
        base-url = "{uri}"

        [politeness]
        listing-delay-ms = [0, 0]
        detail-delay-ms = [0, 0]
        "#,
        uri = server.uri()
    );
    let config = parse_config(&toml).unwrap();
    assert_eq!(config.crawler.target, 1);

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(sink.records().len(), 1);
    assert_eq!(report.summary.target, 1);
    assert!(report.summary.target_reached());
}

#[tokio::test]
async fn test_zero_target_in_code_is_clamped_to_one() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing(1..=3, "")))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.collect_details = false;
    config.crawler.target = 0;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.summary.target, 1);
    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn test_each_vacancy_fetched_once() {
    let server = MockServer::start().await;

    let body = r#"<html><body>
        <a data-qa="serp-item__title" href="/vacancy/11">A</a>
        <a data-qa="serp-item__title" href="/vacancy/11?query=rust#top">A again</a>
        <a class="bloko-link" href="/vacancy/12/">B</a>
        <a data-qa="serp-item__title" href="/vacancy/12">B again</a>
        <a data-qa="serp-item__title" href="https://elsewhere.example/vacancy/13">Offsite</a>
        <a data-qa="serp-item__title" href="javascript:void(0)">Broken</a>
    </body></html>"#;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(body.to_string()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/11"))
        .respond_with(html_response(vacancy_page("A", "Alpha")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/vacancy/12"))
        .respond_with(html_response(vacancy_page("B", "Beta")))
        .expect(1)
        .mount(&server)
        .await;

    // The same search twice, once with a volatile tracking parameter
    let mut config = create_test_config(&server);
    config.search.start_urls = vec![
        format!("{}/search/vacancy?text=rust", server.uri()),
        format!("{}/search/vacancy?hhtmFrom=main&text=rust", server.uri()),
    ];

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let urls = urls_of(&sink.records());
    let unique: HashSet<_> = urls.iter().collect();
    assert_eq!(urls.len(), 2);
    assert_eq!(unique.len(), 2);
    assert_eq!(report.stats.detail_enqueued, 2);
}

#[tokio::test]
async fn test_pagination_follows_pager_labels_within_budget() {
    let server = MockServer::start().await;

    let pager: String = (1..=5)
        .map(|n| format!(r#"<a data-qa="pager-page">{n}</a>"#))
        .collect();

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("page", "1"))
        .respond_with(html_response(card_listing([3, 4], &pager)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("page", "2"))
        .respond_with(html_response(card_listing([5, 6], &pager)))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("page", "3"))
        .respond_with(html_response(card_listing([7, 8], &pager)))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing([1, 2], &pager)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.collect_details = false;
    config.crawler.page_budget = 3;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(sink.records().len(), 6);
    assert_eq!(report.stats.listing_pages, 3);
    assert_eq!(report.stats.pagination_enqueued, 2);
}

#[tokio::test]
async fn test_detail_mode_respects_target_across_pages() {
    let server = MockServer::start().await;

    let pager = r#"<a data-qa="pager-next" href="/search/vacancy?text=rust&page=1">next</a>"#;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .and(query_param("page", "1"))
        .respond_with(html_response(link_listing(11..=20, "")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(link_listing(1..=10, pager)))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex(r"^/vacancy/\d+$"))
        .respond_with(html_response(vacancy_page("Developer", "Hooli")))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.target = 4;
    config.crawler.max_concurrency = 6;

    let sink = Arc::new(MemorySink::new());
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    let urls = urls_of(&sink.records());
    let unique: HashSet<_> = urls.iter().collect();
    assert_eq!(urls.len(), 4);
    assert_eq!(unique.len(), 4);
    assert_eq!(report.summary.total_saved, 4);
    assert_eq!(report.summary.message, "Target of 4 reached");
}

#[tokio::test]
async fn test_failing_mirror_sink_keeps_target_bound() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing(1..=20, "")))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.collect_details = false;
    config.crawler.target = 10;

    let primary = Arc::new(MemorySink::new());
    let sinks: Vec<Arc<dyn RecordSink>> = vec![primary.clone(), Arc::new(RejectingSink)];
    let report = Coordinator::new(config, Arc::new(FanoutSink::new(sinks)))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(primary.records().len(), 10);
    assert_eq!(report.summary.total_saved, 10);
    assert!(report.summary.target_reached());
}

#[tokio::test]
async fn test_failed_emits_do_not_count_as_saved() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search/vacancy"))
        .respond_with(html_response(card_listing(1..=20, "")))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawler.collect_details = false;
    config.crawler.target = 10;

    let sink = Arc::new(FlakySink::new(3));
    let report = Coordinator::new(config, sink.clone())
        .unwrap()
        .run()
        .await
        .unwrap();

    // Rejected writes give their slot back, so the run still reaches the
    // target from the remaining cards
    assert!(sink.stored() <= 10);
    assert_eq!(sink.stored(), report.summary.total_saved);
    assert_eq!(report.summary.total_saved, 10);
    assert!(report.summary.success);
}

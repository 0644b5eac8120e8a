//! Crawler coordinator - main harvest orchestration logic
//!
//! This module contains the worker pool that drives a run:
//! - Seeding the frontier from the configured listing URLs
//! - Gating every fetch through the rate windows and pacing delays
//! - Fetching with a leased session and classifying failures
//! - Extracting links, pagination and records from fetched pages
//! - Retrying with backoff and stopping once the target is reached
//!
//! Shared state is limited to the frontier, the seen set, the termination
//! controller and the session pool; each is synchronized on its own.

use crate::config::{resolve_seed_urls, Config};
use crate::crawler::fetcher::{build_http_client, fetch_page, FailureClass, FetchFailure, FetchedPage};
use crate::crawler::frontier::{Frontier, Priority};
use crate::crawler::scheduler::{Politeness, RetryPolicy};
use crate::crawler::session::{SessionOutcome, SessionPool};
use crate::extract::{extract_cards, extract_links, extract_next_page, extract_record, VacancyCard};
use crate::output::{CrawlStats, HarvestedRecord, RecordSink, RunSummary};
use crate::state::{PageKind, Request, RequestState, SeenSet, TerminationController};
use crate::url::canonicalize;
use crate::HarvestError;
use chrono::Utc;
use reqwest::Client;
use scraper::Html;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Outcome of a finished run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub summary: RunSummary,
    pub stats: CrawlStats,
}

/// Main harvest coordinator
pub struct Coordinator {
    config: Arc<Config>,
    sink: Arc<dyn RecordSink>,
    client: Client,
    retry: RetryPolicy,
}

impl Coordinator {
    /// Creates a coordinator that emits every saved record to `sink`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - The HTTP client could not be built
    pub fn new(config: Config, sink: Arc<dyn RecordSink>) -> Result<Self, HarvestError> {
        let client = build_http_client(&config.crawler, config.proxy.as_ref())?;
        let retry = RetryPolicy::from_config(&config.crawler, &config.politeness);

        Ok(Self {
            config: Arc::new(config),
            sink,
            client,
            retry,
        })
    }

    /// Replaces the retry policy derived from the configuration
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs the harvest until the frontier drains or the target is reached
    ///
    /// 1. Resolve and canonicalize the seed URLs
    /// 2. Spawn `max-concurrency` workers over the shared frontier
    /// 3. Wait for every worker to go idle
    /// 4. Build the summary and hand it to the sink
    pub async fn run(&self) -> Result<CrawlReport, HarvestError> {
        let started = Instant::now();
        let seeds = resolve_seed_urls(&self.config).map_err(|e| HarvestError::Seed(e.to_string()))?;

        let termination = TerminationController::new(
            self.config.crawler.target,
            self.config.crawler.page_budget,
            seeds.len(),
        );
        let frontier = Frontier::new(termination.cancellation());

        let shared = Arc::new(Shared {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
            sink: Arc::clone(&self.sink),
            retry: self.retry.clone(),
            seen: SeenSet::new(),
            sessions: SessionPool::new(self.config.sessions.clone()),
            politeness: Politeness::new(&self.config.politeness),
            stats: StatCounters::default(),
            termination,
            frontier,
        });

        let seeded = shared.seed(&seeds);
        if seeded == 0 {
            return Err(HarvestError::Seed(
                "none of the configured seed URLs could be used".to_string(),
            ));
        }

        let concurrency = self.config.crawler.max_concurrency.max(1);
        tracing::info!(
            "Starting harvest: target {}, page budget {}, {} seed(s), {} worker(s), {} mode",
            shared.termination.target(),
            shared.termination.page_budget(),
            seeded,
            concurrency,
            if self.config.crawler.collect_details {
                "detail"
            } else {
                "listing-card"
            }
        );

        let mut workers = JoinSet::new();
        for worker_id in 0..concurrency {
            let shared = Arc::clone(&shared);
            workers.spawn(async move { shared.work(worker_id).await });
        }

        let mut worker_failures = 0;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                worker_failures += 1;
                tracing::error!("{}", HarvestError::Worker(e.to_string()));
            }
        }

        let report = shared.report(started.elapsed(), worker_failures);

        tracing::info!(
            "Harvest finished: {} of {} saved in {:.1}s ({:.2} records/sec)",
            report.summary.total_saved,
            report.summary.target,
            report.summary.duration_seconds,
            report.summary.average_rate
        );

        self.sink.finalize(&report.summary, &report.stats)?;

        Ok(report)
    }
}

/// Crawl counters updated by every worker
#[derive(Debug, Default)]
struct StatCounters {
    pages_fetched: AtomicU64,
    listing_pages: AtomicU64,
    detail_pages: AtomicU64,
    detail_enqueued: AtomicU64,
    pagination_enqueued: AtomicU64,
    retries: AtomicU64,
    blocked: AtomicU64,
    failed_terminal: AtomicU64,
}

impl StatCounters {
    fn snapshot(&self, sessions_retired: usize) -> CrawlStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        CrawlStats {
            pages_fetched: load(&self.pages_fetched),
            listing_pages: load(&self.listing_pages),
            detail_pages: load(&self.detail_pages),
            detail_enqueued: load(&self.detail_enqueued),
            pagination_enqueued: load(&self.pagination_enqueued),
            retries: load(&self.retries),
            blocked: load(&self.blocked),
            failed_terminal: load(&self.failed_terminal),
            sessions_retired: sessions_retired as u64,
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Marks a claimed request complete when dropped, even if the worker panics
struct Claim<'a>(&'a Frontier);

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Pagination continuation jumps ahead of the detail backlog
fn priority_for(request: &Request) -> Priority {
    match request.kind {
        PageKind::Listing if request.page_number > 0 => Priority::High,
        _ => Priority::Normal,
    }
}

/// State shared by all workers of one run
struct Shared {
    config: Arc<Config>,
    client: Client,
    sink: Arc<dyn RecordSink>,
    retry: RetryPolicy,
    seen: SeenSet,
    sessions: SessionPool,
    politeness: Politeness,
    stats: StatCounters,
    termination: TerminationController,
    frontier: Frontier,
}

impl Shared {
    /// Pushes every usable seed as page 0 of its own budget; returns how many
    fn seed(&self, seeds: &[Url]) -> usize {
        let mut seeded = 0;

        for (index, seed) in seeds.iter().enumerate() {
            let url = match canonicalize(seed, PageKind::Listing) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping seed {}: {}", seed, e);
                    continue;
                }
            };

            if !self.seen.try_claim(&url) {
                tracing::debug!("Duplicate seed {}", url);
                continue;
            }

            tracing::debug!("Seed {}: {}", index, url);
            self.frontier.push(Request::listing(url, 0, index), Priority::Normal);
            seeded += 1;
        }

        seeded
    }

    /// Worker loop: claim, process, complete, until the frontier is done
    async fn work(&self, worker_id: usize) {
        let mut last_fetch: Option<Instant> = None;

        while let Some(request) = self.frontier.pop().await {
            let claim = Claim(&self.frontier);
            let url = request.url.clone();

            if let Err(e) = self.process(request, &mut last_fetch).await {
                tracing::error!("Worker {} failed on {}: {}", worker_id, url, e);
            }

            drop(claim);
        }

        tracing::debug!("Worker {} idle, exiting", worker_id);
    }

    async fn process(
        &self,
        mut request: Request,
        last_fetch: &mut Option<Instant>,
    ) -> Result<(), HarvestError> {
        let cancel = self.termination.cancellation();
        if cancel.is_cancelled() || self.termination.remaining() == 0 {
            return Ok(());
        }

        if request.kind == PageKind::Listing
            && request.attempt == 0
            && !self.termination.try_visit_listing(request.seed)
        {
            tracing::debug!(
                "Page budget spent for seed {}, skipping {}",
                request.seed,
                request.url
            );
            return Ok(());
        }

        request.transition(RequestState::InFlight)?;

        let gate = self.politeness.gate(request.kind, *last_fetch);

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Run stopped before fetching {}", request.url);
                return Ok(());
            }
            _ = gate => {}
        }

        let lease = self.sessions.acquire();
        tracing::debug!(
            "Fetching {} {} (attempt {}, session {})",
            request.kind,
            request.url,
            request.attempt + 1,
            lease.session_id()
        );

        let result = fetch_page(&self.client, &request.url, &lease.identity).await;
        *last_fetch = Some(Instant::now());

        match result {
            Ok(page) => {
                self.sessions.release(lease, SessionOutcome::Success);
                request.transition(RequestState::Succeeded)?;
                bump(&self.stats.pages_fetched);
                self.handle_page(&request, page)
            }
            Err(failure) => {
                let outcome = match failure.class() {
                    FailureClass::Blocked => SessionOutcome::Blocked,
                    _ => SessionOutcome::Failure,
                };
                self.sessions.release(lease, outcome);
                self.handle_failure(request, failure).await
            }
        }
    }

    /// Retries transient and blocked failures with backoff, drops the rest
    async fn handle_failure(
        &self,
        mut request: Request,
        failure: FetchFailure,
    ) -> Result<(), HarvestError> {
        let class = failure.class();
        if class == FailureClass::Blocked {
            bump(&self.stats.blocked);
        }

        if class == FailureClass::Permanent || !self.retry.should_retry(request.attempt) {
            request.transition(RequestState::FailedTerminal)?;
            bump(&self.stats.failed_terminal);
            tracing::error!(
                "Giving up on {} after {} attempt(s): {}",
                request.url,
                request.attempt + 1,
                failure
            );
            return Ok(());
        }

        request.transition(RequestState::FailedRetryable)?;
        let delay = self.retry.backoff(request.attempt);
        tracing::warn!(
            "Fetch of {} failed ({}), retrying in {:?}",
            request.url,
            failure,
            delay
        );

        let cancel = self.termination.cancellation();
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {}
        }

        request.transition(RequestState::Pending)?;
        bump(&self.stats.retries);
        let priority = priority_for(&request);
        self.frontier.push_front(request, priority);

        Ok(())
    }

    fn handle_page(&self, request: &Request, page: FetchedPage) -> Result<(), HarvestError> {
        let document = Html::parse_document(&page.body);

        match request.kind {
            PageKind::Listing => {
                bump(&self.stats.listing_pages);
                self.handle_listing(request, &document, &page.final_url)
            }
            PageKind::Detail => {
                bump(&self.stats.detail_pages);
                let record = extract_record(&document, &request.url);
                self.save(HarvestedRecord::Detail(record));
                Ok(())
            }
        }
    }

    fn handle_listing(
        &self,
        request: &Request,
        document: &Html,
        final_url: &Url,
    ) -> Result<(), HarvestError> {
        if self.config.crawler.collect_details {
            self.enqueue_details(request, document, final_url);
        } else {
            self.save_cards(extract_cards(document, final_url));
        }

        self.enqueue_next_page(request, document);
        Ok(())
    }

    /// Enqueues unseen vacancy links, no more than records still wanted
    fn enqueue_details(&self, request: &Request, document: &Html, base: &Url) {
        let links = extract_links(document, base);
        let remaining = self.termination.remaining();
        let mut enqueued = 0;

        for link in links {
            if enqueued >= remaining || self.termination.is_aborted() {
                break;
            }
            if self.seen.try_claim(&link) {
                self.frontier
                    .push(Request::detail(link, request.seed), Priority::Normal);
                bump(&self.stats.detail_enqueued);
                enqueued += 1;
            }
        }

        tracing::debug!("{} vacancy link(s) enqueued from {}", enqueued, request.url);
    }

    fn save_cards(&self, cards: Vec<VacancyCard>) {
        for card in cards {
            let Some(url) = card.url.as_deref().and_then(|raw| Url::parse(raw).ok()) else {
                tracing::debug!("Skipping card without a vacancy URL");
                continue;
            };

            if !self.seen.try_claim(&url) {
                continue;
            }

            if !self.save(HarvestedRecord::Card(card)) {
                break;
            }
        }
    }

    fn enqueue_next_page(&self, request: &Request, document: &Html) {
        if self.termination.is_aborted() || self.termination.remaining() == 0 {
            return;
        }

        let next_page = request.page_number + 1;
        if !self.termination.allows_page(next_page) {
            tracing::debug!(
                "Page budget of {} reached for seed {}",
                self.termination.page_budget(),
                request.seed
            );
            return;
        }

        let Some(next) = extract_next_page(document, &request.url, request.page_number) else {
            tracing::debug!("No next page after {}", request.url);
            return;
        };

        match canonicalize(&next, PageKind::Listing) {
            Ok(url) => {
                if self.seen.try_claim(&url) {
                    self.frontier.push(
                        Request::listing(url, next_page, request.seed),
                        Priority::High,
                    );
                    bump(&self.stats.pagination_enqueued);
                }
            }
            Err(e) => tracing::debug!("Ignoring next page {}: {}", next, e),
        }
    }

    /// Reserves a save slot and emits the record; false once the target is met
    fn save(&self, record: HarvestedRecord) -> bool {
        if !self.termination.try_reserve_save() {
            tracing::debug!(
                "Target reached, dropping {}",
                record.url().unwrap_or("record without URL")
            );
            return false;
        }

        if let Err(e) = self.sink.emit(&record) {
            self.termination.release_save();
            tracing::error!(
                "Failed to emit {}: {}",
                record.url().unwrap_or("record without URL"),
                e
            );
            return true;
        }

        tracing::info!(
            "Saved {}/{}: {} - {}",
            self.termination.saved(),
            self.termination.target(),
            record.title().unwrap_or("(untitled)"),
            record.company().unwrap_or("(unknown company)")
        );

        if self.termination.confirm_save() {
            let dropped = self.frontier.clear();
            if dropped > 0 {
                tracing::debug!("Dropped {} pending request(s)", dropped);
            }
        }

        true
    }

    fn report(&self, elapsed: Duration, worker_failures: usize) -> CrawlReport {
        let total_saved = self.termination.saved();
        let target = self.termination.target();
        let duration_seconds = elapsed.as_secs_f64();
        let average_rate = if duration_seconds > 0.0 {
            total_saved as f64 / duration_seconds
        } else {
            0.0
        };

        let message = if worker_failures > 0 {
            format!(
                "{} worker(s) failed; saved {} of {}",
                worker_failures, total_saved, target
            )
        } else if total_saved >= target {
            format!("Target of {} reached", target)
        } else {
            format!(
                "Frontier exhausted after saving {} of {}",
                total_saved, target
            )
        };

        CrawlReport {
            summary: RunSummary {
                success: worker_failures == 0,
                total_saved,
                target,
                duration_seconds,
                average_rate,
                collect_details: self.config.crawler.collect_details,
                timestamp: Utc::now(),
                message,
            },
            stats: self.stats.snapshot(self.sessions.retired_count()),
        }
    }
}

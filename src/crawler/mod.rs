//! Crawler module for fetching and processing pages
//!
//! This module contains the core harvesting logic, including:
//! - HTTP fetching and failure classification
//! - The two-class frontier of pending requests
//! - Session rotation, rate windows, pacing and retry backoff
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod frontier;
mod scheduler;
mod session;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, fetch_page, FailureClass, FetchFailure, FetchedPage};
pub use frontier::{Frontier, Priority};
pub use scheduler::{Politeness, RetryPolicy};
pub use session::{
    Identity, Session, SessionLease, SessionOutcome, SessionPool, BROWSER_USER_AGENTS,
};

use crate::config::Config;
use crate::output::RecordSink;
use crate::HarvestError;
use std::sync::Arc;

/// Runs a complete harvest
///
/// This is the main entry point for starting a run. It will:
/// 1. Build the HTTP client from the crawler and proxy settings
/// 2. Seed the frontier from the configured listing URLs
/// 3. Fetch listing and vacancy pages with a bounded worker pool
/// 4. Emit every saved record to `sink`
/// 5. Finalize the sink with the run summary
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `sink` - Receives records as they are saved
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use vacancy_harvest::config::load_config;
/// use vacancy_harvest::crawler::harvest;
/// use vacancy_harvest::output::MemorySink;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let sink = Arc::new(MemorySink::new());
/// let report = harvest(config, sink.clone()).await?;
/// println!("{}", report.summary.message);
/// # Ok(())
/// # }
/// ```
pub async fn harvest(
    config: Config,
    sink: Arc<dyn RecordSink>,
) -> Result<CrawlReport, HarvestError> {
    Coordinator::new(config, sink)?.run().await
}

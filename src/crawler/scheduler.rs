//! Politeness scheduling and retry policy
//!
//! This module handles:
//! - Per-kind request ceilings, replenished evenly over each minute
//! - Human-like pacing delays, longer for detail pages than listing pages
//! - The exponential backoff policy applied to retryable failures

use crate::config::{CrawlerConfig, PolitenessConfig};
use crate::state::PageKind;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

const RATE_WINDOW: Duration = Duration::from_secs(60);

type KindLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Allows `requests_per_window` requests per `window`, replenished evenly
fn kind_limiter(requests_per_window: u32, window: Duration) -> KindLimiter {
    let burst = NonZeroU32::new(requests_per_window).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::with_period(window / burst.get())
        .map(|quota| quota.allow_burst(burst))
        .unwrap_or_else(|| Quota::per_minute(burst));
    RateLimiter::direct(quota)
}

/// Rate gate and pacing delays applied before every fetch
pub struct Politeness {
    listing_limiter: KindLimiter,
    detail_limiter: KindLimiter,
    listing_delay: (Duration, Duration),
    detail_delay: (Duration, Duration),
}

impl Politeness {
    pub fn new(config: &PolitenessConfig) -> Self {
        Self::with_window(config, RATE_WINDOW)
    }

    fn with_window(config: &PolitenessConfig, window: Duration) -> Self {
        Self {
            listing_limiter: kind_limiter(config.listing_requests_per_minute, window),
            detail_limiter: kind_limiter(config.detail_requests_per_minute, window),
            listing_delay: delay_range(config.listing_delay_ms),
            detail_delay: delay_range(config.detail_delay_ms),
        }
    }

    /// Blocks until a request of `kind` fits under its per-minute ceiling
    pub async fn wait_turn(&self, kind: PageKind) {
        let limiter = match kind {
            PageKind::Listing => &self.listing_limiter,
            PageKind::Detail => &self.detail_limiter,
        };
        if limiter.check().is_err() {
            tracing::debug!("Rate ceiling reached for {} pages, waiting", kind);
            limiter.until_ready().await;
        }
    }

    /// Waits for the rate gate, then paces net of the time since `last_fetch`
    ///
    /// Time spent at the rate gate counts toward the pacing delay. Returns the
    /// pacing time actually slept.
    pub async fn gate(&self, kind: PageKind, last_fetch: Option<Instant>) -> Duration {
        self.wait_turn(kind).await;
        let since_last = last_fetch.map(|at| at.elapsed()).unwrap_or(Duration::ZERO);
        self.pace(kind, since_last).await
    }

    /// Draws a pacing delay for `kind` from its jitter range
    pub fn jitter_delay(&self, kind: PageKind) -> Duration {
        let (min, max) = match kind {
            PageKind::Listing => self.listing_delay,
            PageKind::Detail => self.detail_delay,
        };
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        Duration::from_millis(fastrand::u64(min_ms..=max_ms))
    }

    /// Sleeps the pacing delay for `kind`, net of `since_last` already spent
    ///
    /// Returns the time actually slept.
    pub async fn pace(&self, kind: PageKind, since_last: Duration) -> Duration {
        let remaining = self.jitter_delay(kind).saturating_sub(since_last);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
        remaining
    }
}

fn delay_range(range_ms: [u64; 2]) -> (Duration, Duration) {
    let [low, high] = range_ms;
    (
        Duration::from_millis(low.min(high)),
        Duration::from_millis(low.max(high)),
    )
}

/// Exponential backoff for retryable failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total fetches allowed for one request, first attempt included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(crawler: &CrawlerConfig, politeness: &PolitenessConfig) -> Self {
        Self {
            max_attempts: crawler.max_attempts.max(1),
            base_delay: Duration::from_millis(politeness.backoff_base_ms),
            multiplier: 2.0,
            max_delay: Duration::from_millis(politeness.backoff_max_ms),
        }
    }

    /// Whether a request that just failed on zero-based `attempt` gets another try
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt.saturating_add(1) < self.max_attempts
    }

    /// Delay before retrying after zero-based `attempt` failed
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(31) as i32);
        let delay_ms = (self.base_delay.as_millis() as f64 * factor).round();
        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            self.max_delay
        } else {
            Duration::from_millis(delay_ms as u64)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&CrawlerConfig::default(), &PolitenessConfig::default())
    }
}

use serde::{Deserialize, Deserializer};

/// Main configuration structure for Vacancy-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Search parameters used to build the seed URL, or explicit seeds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchConfig {
    /// Free-text query
    #[serde(default)]
    pub text: String,

    /// Region code ("1" is Moscow)
    #[serde(default = "default_area")]
    pub area: String,

    /// Experience filter (e.g. "between1And3")
    #[serde(default)]
    pub experience: String,

    /// Schedule filter (e.g. "remote")
    #[serde(default)]
    pub schedule: String,

    /// Employment filter (e.g. "full")
    #[serde(default)]
    pub employment: String,

    /// Explicit listing URLs; when present the search parameters are ignored
    #[serde(default)]
    pub start_urls: Vec<String>,

    /// A single explicit listing URL, appended after `start-urls`; also read as `url`
    #[serde(default, alias = "url")]
    pub start_url: Option<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            area: default_area(),
            experience: String::new(),
            schedule: String::new(),
            employment: String::new(),
            start_urls: Vec::new(),
            start_url: None,
        }
    }
}

/// Crawl bounds and worker pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Number of records to save before stopping (clamped to at least 1)
    #[serde(default = "default_target", deserialize_with = "at_least_one")]
    pub target: usize,

    /// Listing pages visited per seed (clamped to at least 1)
    #[serde(default = "default_page_budget", deserialize_with = "at_least_one")]
    pub page_budget: usize,

    /// Visit vacancy pages (true) or harvest listing cards directly (false)
    #[serde(default = "default_true")]
    pub collect_details: bool,

    /// Number of concurrent workers
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Fetch attempts per request, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Site root used to build the search URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            page_budget: default_page_budget(),
            collect_details: true,
            max_concurrency: default_max_concurrency(),
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout(),
            base_url: default_base_url(),
        }
    }
}

/// Rate ceilings, human-like pacing and retry backoff
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolitenessConfig {
    /// Listing requests allowed per minute
    #[serde(default = "default_listing_rpm")]
    pub listing_requests_per_minute: u32,

    /// Vacancy page requests allowed per minute
    #[serde(default = "default_detail_rpm")]
    pub detail_requests_per_minute: u32,

    /// Jitter range between listing fetches (milliseconds, [min, max])
    #[serde(default = "default_listing_delay")]
    pub listing_delay_ms: [u64; 2],

    /// Jitter range between vacancy fetches (milliseconds, [min, max])
    #[serde(default = "default_detail_delay")]
    pub detail_delay_ms: [u64; 2],

    /// First retry backoff (milliseconds)
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Backoff ceiling (milliseconds)
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            listing_requests_per_minute: default_listing_rpm(),
            detail_requests_per_minute: default_detail_rpm(),
            listing_delay_ms: default_listing_delay(),
            detail_delay_ms: default_detail_delay(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
        }
    }
}

/// Session pool sizing and retirement thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SessionConfig {
    /// Number of sessions kept in rotation
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Requests served before a session is retired
    #[serde(default = "default_max_usage")]
    pub max_usage: u32,

    /// Session time-to-live (seconds)
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Consecutive failures before a session is marked unhealthy
    #[serde(default = "default_max_errors")]
    pub max_errors: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            max_usage: default_max_usage(),
            ttl_secs: default_session_ttl(),
            max_errors: default_max_errors(),
        }
    }
}

/// Outbound proxy, passed through to the HTTP client
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Optional JSON Lines file receiving every record as it is saved
    #[serde(default)]
    pub jsonl_path: Option<String>,

    /// Optional markdown run summary
    #[serde(default)]
    pub summary_path: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            jsonl_path: None,
            summary_path: None,
        }
    }
}

/// Deserializes a count, clamping zero and negative values to 1
fn at_least_one<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.max(1) as usize)
}

fn default_area() -> String {
    "1".to_string()
}

fn default_target() -> usize {
    100
}

fn default_page_budget() -> usize {
    999
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    4
}

fn default_request_timeout() -> u64 {
    90
}

fn default_base_url() -> String {
    "https://hh.ru".to_string()
}

fn default_listing_rpm() -> u32 {
    60
}

fn default_detail_rpm() -> u32 {
    30
}

fn default_listing_delay() -> [u64; 2] {
    [1000, 3000]
}

fn default_detail_delay() -> [u64; 2] {
    [2000, 5000]
}

fn default_backoff_base() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    30_000
}

fn default_pool_size() -> usize {
    5
}

fn default_max_usage() -> u32 {
    50
}

fn default_session_ttl() -> u64 {
    600
}

fn default_max_errors() -> u32 {
    3
}

fn default_database_path() -> String {
    "./vacancies.db".to_string()
}

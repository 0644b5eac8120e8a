//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester, including:
//! - Building the shared HTTP client (timeouts, compression, outbound proxy)
//! - GET requests carrying the borrowed session's identity headers
//! - Classifying failures, including bot-interdiction responses
//!
//! There is no retry logic here; retries belong to the coordinator.

use super::session::Identity;
use crate::config::{CrawlerConfig, ProxyConfig};
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Markers in the final URL or body of a captcha interstitial
const CAPTCHA_MARKERS: &[&str] = &[
    "/account/captcha",
    "data-qa=\"account-captcha",
    "g-recaptcha",
    "smartcaptcha",
];

/// A successfully fetched HTML document
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Why a fetch did not produce a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("blocked: {0}")]
    Blocked(String),
}

/// How the coordinator should treat a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network trouble, timeouts and 5xx; retried with backoff
    Transient,
    /// Bot interdiction; retried with a fresh session
    Blocked,
    /// Any other 4xx; dropped
    Permanent,
}

impl FetchFailure {
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Network(_) | Self::Timeout => FailureClass::Transient,
            Self::Blocked(_) => FailureClass::Blocked,
            Self::HttpStatus(code) if *code >= 500 || *code == 408 => FailureClass::Transient,
            Self::HttpStatus(_) => FailureClass::Permanent,
        }
    }
}

/// Builds the shared HTTP client
///
/// Identity headers are set per request from the borrowed session, so the
/// client itself carries none.
///
/// # Example
///
/// ```
/// use vacancy_harvest::config::CrawlerConfig;
/// use vacancy_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default(), None);
/// assert!(client.is_ok());
/// ```
pub fn build_http_client(
    crawler: &CrawlerConfig,
    proxy: Option<&ProxyConfig>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(crawler.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        let mut outbound = Proxy::all(proxy.url.as_str())?;
        if let Some(username) = &proxy.username {
            outbound = outbound.basic_auth(username, proxy.password.as_deref().unwrap_or(""));
        }
        builder = builder.proxy(outbound);
    }

    builder.build()
}

/// Fetches `url` with the given identity
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx, no captcha marker | `Ok(FetchedPage)` |
/// | 403, 429 | `Blocked` |
/// | 2xx with captcha marker | `Blocked` |
/// | other non-2xx | `HttpStatus(code)` |
/// | timeout | `Timeout` |
/// | connect / body error | `Network` |
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    identity: &Identity,
) -> Result<FetchedPage, FetchFailure> {
    let response = client
        .get(url.clone())
        .header(USER_AGENT, identity.user_agent.as_str())
        .header(ACCEPT_LANGUAGE, identity.accept_language.as_str())
        .header(
            ACCEPT,
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .send()
        .await
        .map_err(classify_error)?;

    let status = response.status();
    let final_url = response.url().clone();

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchFailure::Blocked(format!("HTTP {}", status.as_u16())));
    }

    if !status.is_success() {
        return Err(FetchFailure::HttpStatus(status.as_u16()));
    }

    if is_captcha(final_url.as_str()) {
        return Err(FetchFailure::Blocked(format!(
            "redirected to captcha at {}",
            final_url
        )));
    }

    let body = response.text().await.map_err(classify_error)?;

    if is_captcha(&body) {
        return Err(FetchFailure::Blocked("captcha page served".to_string()));
    }

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body,
    })
}

fn classify_error(e: reqwest::Error) -> FetchFailure {
    if e.is_timeout() {
        FetchFailure::Timeout
    } else if e.is_connect() {
        FetchFailure::Network(format!("connection failed: {}", e))
    } else {
        FetchFailure::Network(e.to_string())
    }
}

fn is_captcha(haystack: &str) -> bool {
    CAPTCHA_MARKERS.iter().any(|marker| haystack.contains(marker))
}

//! Output sink traits and types
//!
//! This module defines the trait interface for record sinks and the data
//! structures describing a finished run.

use crate::extract::{JobRecord, VacancyCard};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// A finished record handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HarvestedRecord {
    Detail(JobRecord),
    Card(VacancyCard),
}

impl HarvestedRecord {
    /// "detail" or "card"
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Detail(_) => "detail",
            Self::Card(_) => "card",
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Detail(record) => Some(record.source_url.as_str()),
            Self::Card(card) => card.url.as_deref(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Detail(record) => record.title.as_deref(),
            Self::Card(card) => card.title.as_deref(),
        }
    }

    pub fn company(&self) -> Option<&str> {
        match self {
            Self::Detail(record) => record.company.as_deref(),
            Self::Card(card) => card.company.as_deref(),
        }
    }
}

/// Final summary produced by every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// The run completed; says nothing about whether the target was met
    pub success: bool,
    pub total_saved: usize,
    pub target: usize,
    pub duration_seconds: f64,
    /// Records saved per second
    pub average_rate: f64,
    pub collect_details: bool,
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl RunSummary {
    pub fn target_reached(&self) -> bool {
        self.total_saved >= self.target
    }
}

/// Counters collected while crawling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    pub pages_fetched: u64,
    pub listing_pages: u64,
    pub detail_pages: u64,
    pub detail_enqueued: u64,
    pub pagination_enqueued: u64,
    pub retries: u64,
    pub blocked: u64,
    pub failed_terminal: u64,
    pub sessions_retired: u64,
}

/// Trait for record sinks
///
/// Records are emitted one at a time as soon as they are produced, so a
/// crash after N records still leaves N records behind. Sinks have no
/// deduplication responsibility. Implementations must be thread-safe.
pub trait RecordSink: Send + Sync {
    /// Persists one record
    fn emit(&self, record: &HarvestedRecord) -> OutputResult<()>;

    /// Called once after the run with its summary
    fn finalize(&self, _summary: &RunSummary, _stats: &CrawlStats) -> OutputResult<()> {
        Ok(())
    }
}

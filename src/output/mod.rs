//! Output module for record sinks and run summaries
//!
//! This module handles:
//! - Writing harvested records as they are saved (SQLite, JSON Lines, memory)
//! - Generating markdown summaries of finished runs
//! - Displaying statistics over stored runs

mod jsonl;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use jsonl::JsonLinesSink;
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, HarvestStatistics};
pub use traits::{
    CrawlStats, HarvestedRecord, OutputError, OutputResult, RecordSink, RunSummary,
};

use std::sync::{Arc, Mutex};

/// Keeps every record in memory
///
/// Used by tests and by library callers that persist records themselves.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<HarvestedRecord>>,
    summary: Mutex<Option<RunSummary>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records emitted so far, in emission order
    pub fn records(&self) -> Vec<HarvestedRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The summary passed to `finalize`, if the run has ended
    pub fn summary(&self) -> Option<RunSummary> {
        self.summary
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl RecordSink for MemorySink {
    fn emit(&self, record: &HarvestedRecord) -> OutputResult<()> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn finalize(&self, summary: &RunSummary, _stats: &CrawlStats) -> OutputResult<()> {
        *self.summary.lock().unwrap_or_else(|e| e.into_inner()) = Some(summary.clone());
        Ok(())
    }
}

/// Forwards every call to each inner sink in order
///
/// The first sink is the record of truth: its failure fails the emit and no
/// later sink sees the record. Once it has accepted a record, failures of
/// the later sinks are logged and the emit still succeeds, so a record is
/// never counted as unsaved while it sits in storage.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn RecordSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn RecordSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RecordSink for FanoutSink {
    fn emit(&self, record: &HarvestedRecord) -> OutputResult<()> {
        let Some((primary, mirrors)) = self.sinks.split_first() else {
            return Ok(());
        };

        primary.emit(record)?;

        for (index, sink) in mirrors.iter().enumerate() {
            if let Err(e) = sink.emit(record) {
                tracing::warn!(
                    "Sink {} failed to write {}: {}",
                    index + 1,
                    record.url().unwrap_or("<no url>"),
                    e
                );
            }
        }
        Ok(())
    }

    fn finalize(&self, summary: &RunSummary, stats: &CrawlStats) -> OutputResult<()> {
        for sink in &self.sinks {
            sink.finalize(summary, stats)?;
        }
        Ok(())
    }
}

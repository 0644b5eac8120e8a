//! SQLite-based record sink
//!
//! This module provides a sink that writes every harvested record straight
//! to the storage backend and stores the run summary when the run ends.

use crate::output::traits::{
    CrawlStats, HarvestedRecord, OutputError, OutputResult, RecordSink, RunSummary,
};
use crate::storage::Storage;
use std::sync::{Arc, Mutex};

/// SQLite-based record sink
pub struct SqliteSink {
    storage: Arc<Mutex<dyn Storage + Send>>,
    run_id: i64,
}

impl SqliteSink {
    /// Creates a sink appending to run `run_id`
    pub fn new(storage: Arc<Mutex<dyn Storage + Send>>, run_id: i64) -> Self {
        Self { storage, run_id }
    }

    pub fn run_id(&self) -> i64 {
        self.run_id
    }
}

impl RecordSink for SqliteSink {
    fn emit(&self, record: &HarvestedRecord) -> OutputResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))?;

        storage
            .insert_record(self.run_id, record)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        Ok(())
    }

    fn finalize(&self, summary: &RunSummary, stats: &CrawlStats) -> OutputResult<()> {
        let mut storage = self
            .storage
            .lock()
            .map_err(|e| OutputError::Storage(format!("Failed to lock storage: {}", e)))?;

        storage
            .complete_run(self.run_id, summary, stats)
            .map_err(|e| OutputError::Storage(e.to_string()))?;

        Ok(())
    }
}

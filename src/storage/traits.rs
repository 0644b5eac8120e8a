//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::{CrawlStats, HarvestedRecord, RunSummary};
use crate::storage::{RunRecord, RunStatus, VacancyRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the harvester and
/// the statistics view.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run and returns its ID
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `target` - Effective target after clamping
    /// * `collect_details` - Whether detail pages are visited
    fn create_run(
        &mut self,
        config_hash: &str,
        target: usize,
        collect_details: bool,
    ) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Counts all runs
    fn count_runs(&self) -> StorageResult<u64>;

    /// Marks a run as completed and stores its summary and counters
    fn complete_run(
        &mut self,
        run_id: i64,
        summary: &RunSummary,
        stats: &CrawlStats,
    ) -> StorageResult<()>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Records =====

    /// Appends a harvested record to a run and returns its row ID
    fn insert_record(&mut self, run_id: i64, record: &HarvestedRecord) -> StorageResult<i64>;

    /// Gets every record of a run in insertion order
    fn get_records(&self, run_id: i64) -> StorageResult<Vec<VacancyRow>>;

    /// Counts records, for one run or across all runs
    fn count_records(&self, run_id: Option<i64>) -> StorageResult<u64>;

    /// Counts distinct record URLs across all runs
    fn count_unique_urls(&self) -> StorageResult<u64>;

    /// Most frequent companies across all runs, highest count first
    fn top_companies(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}

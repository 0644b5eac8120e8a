//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// Number of companies listed in the statistics view
const TOP_COMPANIES: usize = 10;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Total number of recorded runs
    pub total_runs: u64,

    /// Total number of stored records across all runs
    pub total_records: u64,

    /// Number of distinct vacancy URLs across all runs
    pub unique_urls: u64,

    /// The most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Most frequent companies with their record counts
    pub top_companies: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    Ok(HarvestStatistics {
        total_runs: storage.count_runs()?,
        total_records: storage.count_records(None)?,
        unique_urls: storage.count_unique_urls()?,
        latest_run: storage.get_latest_run()?,
        top_companies: storage.top_companies(TOP_COMPANIES)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Overview:");
    println!("  Runs recorded: {}", stats.total_runs);
    println!("  Records stored: {}", stats.total_records);
    println!("  Unique vacancy URLs: {}", stats.unique_urls);
    println!();

    if let Some(run) = &stats.latest_run {
        println!("Latest Run (#{}):", run.id);
        println!("  Started: {}", run.started_at);
        if let Some(finished) = &run.finished_at {
            println!("  Finished: {}", finished);
        }
        println!("  Status: {}", run.status.to_db_string());
        println!(
            "  Mode: {}",
            if run.collect_details {
                "detail pages"
            } else {
                "listing cards"
            }
        );
        println!(
            "  Saved: {} / {}",
            run.total_saved.unwrap_or(0),
            run.target
        );
        if let Some(rate) = run.average_rate {
            println!("  Average rate: {:.2} records/sec", rate);
        }
        if let Some(message) = &run.message {
            println!("  Message: {}", message);
        }
        println!();
    }

    if !stats.top_companies.is_empty() {
        println!("Top Companies:");
        for (company, count) in &stats.top_companies {
            println!("  {}: {}", company, count);
        }
        println!();
    }
}

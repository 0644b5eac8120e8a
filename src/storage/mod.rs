//! Storage module for persisting harvest data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Run tracking with the final summary and crawl counters
//! - Harvested vacancy records

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// Represents a harvest run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub target: usize,
    pub collect_details: bool,
    pub total_saved: Option<u64>,
    pub duration_seconds: Option<f64>,
    pub average_rate: Option<f64>,
    pub message: Option<String>,
}

/// Represents a stored vacancy row
#[derive(Debug, Clone, PartialEq)]
pub struct VacancyRow {
    pub id: i64,
    pub run_id: i64,
    pub kind: String,
    pub url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub salary: Option<String>,
    pub skills: Option<Vec<String>>,
    pub snippet: Option<String>,
    pub scraped_at: String,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

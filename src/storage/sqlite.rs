//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::output::{CrawlStats, HarvestedRecord, RunSummary};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, VacancyRow};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, target, \
     collect_details, total_saved, duration_seconds, average_rate, message";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` and initializes the schema
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
            target: row.get::<_, i64>(5)?.max(0) as usize,
            collect_details: row.get(6)?,
            total_saved: row.get::<_, Option<i64>>(7)?.map(|n| n.max(0) as u64),
            duration_seconds: row.get(8)?,
            average_rate: row.get(9)?,
            message: row.get(10)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(
        &mut self,
        config_hash: &str,
        target: usize,
        collect_details: bool,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, target, collect_details)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                target as i64,
                collect_details
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let sql = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&sql, params![run_id], Self::run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let sql = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self
            .conn
            .query_row(&sql, [], Self::run_from_row)
            .optional()?;
        Ok(run)
    }

    fn count_runs(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM runs", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn complete_run(
        &mut self,
        run_id: i64,
        summary: &RunSummary,
        stats: &CrawlStats,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let status = if summary.success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };

        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, total_saved = ?3,
                duration_seconds = ?4, average_rate = ?5, success = ?6, message = ?7,
                pages_fetched = ?8, detail_enqueued = ?9, pagination_enqueued = ?10,
                retries = ?11, blocked = ?12, failed_terminal = ?13
             WHERE id = ?14",
            params![
                status.to_db_string(),
                now,
                summary.total_saved as i64,
                summary.duration_seconds,
                summary.average_rate,
                summary.success,
                summary.message,
                stats.pages_fetched as i64,
                stats.detail_enqueued as i64,
                stats.pagination_enqueued as i64,
                stats.retries as i64,
                stats.blocked as i64,
                stats.failed_terminal as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    // ===== Records =====

    fn insert_record(&mut self, run_id: i64, record: &HarvestedRecord) -> StorageResult<i64> {
        match record {
            HarvestedRecord::Detail(job) => {
                let skills = job
                    .skills
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;

                self.conn.execute(
                    "INSERT INTO vacancies (run_id, kind, url, title, company, location, salary,
                        salary_currency, experience, employment_type, skills, date_posted,
                        description_html, description_text, source, scraped_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                    params![
                        run_id,
                        record.kind(),
                        job.source_url,
                        job.title,
                        job.company,
                        job.location,
                        job.salary,
                        job.salary_currency,
                        job.experience,
                        job.employment_type,
                        skills,
                        job.date_posted,
                        job.description_html,
                        job.description_text,
                        job.source,
                        job.scraped_at.to_rfc3339()
                    ],
                )?;
            }
            HarvestedRecord::Card(card) => {
                self.conn.execute(
                    "INSERT INTO vacancies (run_id, kind, url, title, company, location, salary,
                        snippet, source, scraped_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        run_id,
                        record.kind(),
                        card.url,
                        card.title,
                        card.company,
                        card.location,
                        card.salary,
                        card.snippet,
                        card.source,
                        card.scraped_at.to_rfc3339()
                    ],
                )?;
            }
        }

        Ok(self.conn.last_insert_rowid())
    }

    fn get_records(&self, run_id: i64) -> StorageResult<Vec<VacancyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, kind, url, title, company, salary, skills, snippet, scraped_at
             FROM vacancies WHERE run_id = ?1 ORDER BY id",
        )?;

        let rows = stmt.query_map(params![run_id], |row| {
            Ok((
                VacancyRow {
                    id: row.get(0)?,
                    run_id: row.get(1)?,
                    kind: row.get(2)?,
                    url: row.get(3)?,
                    title: row.get(4)?,
                    company: row.get(5)?,
                    salary: row.get(6)?,
                    skills: None,
                    snippet: row.get(8)?,
                    scraped_at: row.get(9)?,
                },
                row.get::<_, Option<String>>(7)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (mut record, skills) = row?;
            record.skills = skills
                .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
                .transpose()
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            records.push(record);
        }

        Ok(records)
    }

    fn count_records(&self, run_id: Option<i64>) -> StorageResult<u64> {
        let count: i64 = match run_id {
            Some(run_id) => self.conn.query_row(
                "SELECT COUNT(*) FROM vacancies WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM vacancies", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }

    fn count_unique_urls(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT url) FROM vacancies WHERE url IS NOT NULL",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn top_companies(&self, limit: usize) -> StorageResult<Vec<(String, u64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT company, COUNT(*) AS n FROM vacancies
             WHERE company IS NOT NULL
             GROUP BY company ORDER BY n DESC, company ASC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut companies = Vec::new();
        for row in rows {
            companies.push(row?);
        }
        Ok(companies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{JobRecord, VacancyCard};

    fn job(url: &str, company: &str) -> HarvestedRecord {
        HarvestedRecord::Detail(JobRecord {
            title: Some("Rust Developer".to_string()),
            company: Some(company.to_string()),
            location: Some("Moscow".to_string()),
            salary: Some("250000".to_string()),
            salary_currency: Some("RUR".to_string()),
            experience: None,
            employment_type: None,
            skills: Some(vec!["Rust".to_string(), "SQL".to_string()]),
            date_posted: None,
            description_html: None,
            description_text: None,
            source_url: url.to_string(),
            source: "hh.ru".to_string(),
            scraped_at: Utc::now(),
        })
    }

    fn card(url: Option<&str>) -> HarvestedRecord {
        HarvestedRecord::Card(VacancyCard {
            title: Some("QA".to_string()),
            url: url.map(str::to_string),
            company: None,
            location: None,
            salary: None,
            snippet: Some("Test things".to_string()),
            source: "hh.ru".to_string(),
            scraped_at: Utc::now(),
        })
    }

    fn summary(saved: usize) -> RunSummary {
        RunSummary {
            success: true,
            total_saved: saved,
            target: 10,
            duration_seconds: 4.0,
            average_rate: saved as f64 / 4.0,
            collect_details: true,
            timestamp: Utc::now(),
            message: "done".to_string(),
        }
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", 10, true).unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.target, 10);
        assert!(run.collect_details);
        assert_eq!(run.total_saved, None);
    }

    #[test]
    fn test_get_missing_run() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.get_run(99),
            Err(StorageError::RunNotFound(99))
        ));
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_complete_run_stores_summary() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash", 10, true).unwrap();

        let stats = CrawlStats {
            pages_fetched: 7,
            retries: 3,
            ..CrawlStats::default()
        };
        storage.complete_run(run_id, &summary(6), &stats).unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.total_saved, Some(6));
        assert_eq!(run.message.as_deref(), Some("done"));
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_insert_and_read_records() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash", 10, true).unwrap();

        storage
            .insert_record(run_id, &job("https://hh.ru/vacancy/1", "Acme"))
            .unwrap();
        storage
            .insert_record(run_id, &card(Some("https://hh.ru/vacancy/2")))
            .unwrap();

        let records = storage.get_records(run_id).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].kind, "detail");
        assert_eq!(records[0].url.as_deref(), Some("https://hh.ru/vacancy/1"));
        assert_eq!(
            records[0].skills,
            Some(vec!["Rust".to_string(), "SQL".to_string()])
        );

        assert_eq!(records[1].kind, "card");
        assert_eq!(records[1].snippet.as_deref(), Some("Test things"));
        assert_eq!(records[1].skills, None);

        assert_eq!(storage.count_records(Some(run_id)).unwrap(), 2);
        assert_eq!(storage.count_records(None).unwrap(), 2);
    }

    #[test]
    fn test_statistics_queries() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let first = storage.create_run("hash", 10, true).unwrap();
        let second = storage.create_run("hash", 10, true).unwrap();

        storage
            .insert_record(first, &job("https://hh.ru/vacancy/1", "Acme"))
            .unwrap();
        storage
            .insert_record(second, &job("https://hh.ru/vacancy/1", "Acme"))
            .unwrap();
        storage
            .insert_record(second, &job("https://hh.ru/vacancy/3", "Globex"))
            .unwrap();
        storage.insert_record(second, &card(None)).unwrap();

        assert_eq!(storage.count_runs().unwrap(), 2);
        assert_eq!(storage.count_unique_urls().unwrap(), 2);
        assert_eq!(
            storage.top_companies(5).unwrap(),
            vec![("Acme".to_string(), 2), ("Globex".to_string(), 1)]
        );
    }

    #[test]
    fn test_records_persist_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.db");

        {
            let mut storage = SqliteStorage::new(&path).unwrap();
            let run_id = storage.create_run("hash", 1, false).unwrap();
            storage.insert_record(run_id, &card(Some("https://hh.ru/vacancy/9"))).unwrap();
        }

        let storage = SqliteStorage::new(&path).unwrap();
        assert_eq!(storage.count_records(None).unwrap(), 1);
    }
}

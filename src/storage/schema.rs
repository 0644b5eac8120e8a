//! Database schema definitions and migrations
//!
//! This module contains all SQL schema definitions for the Vacancy-Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track harvest runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    target INTEGER NOT NULL,
    collect_details INTEGER NOT NULL,
    total_saved INTEGER,
    duration_seconds REAL,
    average_rate REAL,
    success INTEGER,
    message TEXT,
    pages_fetched INTEGER,
    detail_enqueued INTEGER,
    pagination_enqueued INTEGER,
    retries INTEGER,
    blocked INTEGER,
    failed_terminal INTEGER
);

-- Harvested vacancy records, from detail pages or listing cards
CREATE TABLE IF NOT EXISTS vacancies (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    kind TEXT NOT NULL,
    url TEXT,
    title TEXT,
    company TEXT,
    location TEXT,
    salary TEXT,
    salary_currency TEXT,
    experience TEXT,
    employment_type TEXT,
    skills TEXT,
    date_posted TEXT,
    description_html TEXT,
    description_text TEXT,
    snippet TEXT,
    source TEXT NOT NULL,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vacancies_run ON vacancies(run_id);
CREATE INDEX IF NOT EXISTS idx_vacancies_url ON vacancies(url);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

//! Extraction engine
//!
//! Turns a parsed document into either candidate links (listing pages) or a
//! structured record (detail pages, or listing cards when details are not
//! collected). Every function here is synchronous: `scraper::Html` is not
//! `Send`, so callers parse and extract between await points.

mod card;
mod links;
mod metadata;
mod record;
mod text;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use card::{extract_card, extract_cards};
pub use links::{extract_links, extract_next_page};
pub use metadata::{find_job_posting, PostingMetadata};
pub use record::{extract_record, extract_skills, FieldChain, FieldSource, MetadataField};
pub use text::{collapse_whitespace, derive_text};

/// Source tag stamped on every harvested record
pub const SOURCE_TAG: &str = "hh.ru";

/// A job record extracted from a vacancy page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub salary_currency: Option<String>,
    pub experience: Option<String>,
    pub employment_type: Option<String>,
    /// `None` when the page lists no skills, never an empty list
    pub skills: Option<Vec<String>>,
    pub date_posted: Option<String>,
    pub description_html: Option<String>,
    pub description_text: Option<String>,
    #[serde(rename = "url")]
    pub source_url: String,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

/// A partial record read straight from a listing-page card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VacancyCard {
    pub title: Option<String>,
    pub url: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub snippet: Option<String>,
    pub source: String,
    pub scraped_at: DateTime<Utc>,
}

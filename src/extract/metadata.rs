//! Embedded JSON-LD job posting metadata
//!
//! Vacancy pages usually carry a `schema.org/JobPosting` descriptor in a
//! `<script type="application/ld+json">` block. Blocks that fail to parse are
//! skipped; they never abort extraction.

use scraper::{Html, Selector};
use serde_json::Value;

/// Fields taken from an embedded `JobPosting` descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingMetadata {
    pub title: Option<String>,
    pub company: Option<String>,
    pub date_posted: Option<String>,
    pub description_html: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub salary_currency: Option<String>,
    pub employment_type: Option<String>,
}

/// Finds the first well-formed `JobPosting` descriptor in the document
pub fn find_job_posting(document: &Html) -> Option<PostingMetadata> {
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#).ok()?;

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        let parsed: Value = match serde_json::from_str(raw.trim()) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        if let Some(posting) = candidates(&parsed).into_iter().find(|v| is_job_posting(v)) {
            return Some(PostingMetadata::from_value(posting));
        }
    }

    None
}

/// Flattens top-level arrays and `@graph` containers into candidate entities
fn candidates(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(candidates).collect(),
        Value::Object(map) => {
            let mut found = vec![value];
            if let Some(graph) = map.get("@graph") {
                found.extend(candidates(graph));
            }
            found
        }
        _ => Vec::new(),
    }
}

fn is_job_posting(value: &Value) -> bool {
    let type_field = value.get("@type").or_else(|| value.get("type"));
    match type_field {
        Some(Value::String(t)) => t == "JobPosting",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("JobPosting")),
        _ => false,
    }
}

impl PostingMetadata {
    fn from_value(posting: &Value) -> Self {
        let salary = scalar_at(posting, &["baseSalary", "value", "value"])
            .or_else(|| scalar_at(posting, &["baseSalary", "minValue"]))
            .or_else(|| scalar_at(posting, &["baseSalary", "value", "minValue"]));

        let location = scalar_at(posting, &["jobLocation", "address", "addressLocality"])
            .or_else(|| scalar_at(posting, &["jobLocation", "address", "addressRegion"]));

        Self {
            title: scalar_at(posting, &["title"]).or_else(|| scalar_at(posting, &["name"])),
            company: scalar_at(posting, &["hiringOrganization", "name"]),
            date_posted: scalar_at(posting, &["datePosted"]),
            description_html: scalar_at(posting, &["description"]),
            location,
            salary,
            salary_currency: scalar_at(posting, &["baseSalary", "currency"]),
            employment_type: joined_at(posting, &["employmentType"]),
        }
    }
}

/// Follows `path` and renders a non-empty string or number
///
/// `jobLocation` may be a list of places; the first one is used.
fn scalar_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        if let Value::Array(items) = current {
            current = items.first()?;
        }
        current = current.get(*key)?;
    }
    render_scalar(current)
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Like [`scalar_at`] but joins string arrays with ", "
fn joined_at(value: &Value, path: &[&str]) -> Option<String> {
    let mut current = value;
    for key in path {
        current = current.get(*key)?;
    }
    match current {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_scalar).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => render_scalar(other),
    }
}

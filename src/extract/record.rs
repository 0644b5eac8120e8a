//! Detail page extraction through per-field fallback chains
//!
//! Each field is described by a [`FieldChain`]: an ordered list of
//! [`FieldSource`] strategies evaluated in order, first non-empty value wins.
//! Embedded metadata always comes first so a well-formed `JobPosting`
//! descriptor beats whatever the page markup says.

use super::metadata::{find_job_posting, PostingMetadata};
use super::text::{all_texts, derive_text, first_inner_html, first_text};
use super::{JobRecord, SOURCE_TAG};
use chrono::Utc;
use scraper::Html;
use url::Url;

/// A field of the embedded `JobPosting` descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Company,
    Location,
    Salary,
    SalaryCurrency,
    EmploymentType,
    DatePosted,
    DescriptionHtml,
}

impl MetadataField {
    fn get(self, metadata: &PostingMetadata) -> Option<&str> {
        let value = match self {
            Self::Title => &metadata.title,
            Self::Company => &metadata.company,
            Self::Location => &metadata.location,
            Self::Salary => &metadata.salary,
            Self::SalaryCurrency => &metadata.salary_currency,
            Self::EmploymentType => &metadata.employment_type,
            Self::DatePosted => &metadata.date_posted,
            Self::DescriptionHtml => &metadata.description_html,
        };
        value.as_deref()
    }
}

/// One strategy for producing a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// Value from the embedded metadata descriptor
    Metadata(MetadataField),
    /// Trimmed text of the first non-blank element matching a CSS selector
    Text(&'static str),
    /// Inner HTML of the first element matching a CSS selector
    Html(&'static str),
}

/// Ordered strategies for a single record field
#[derive(Debug, Clone, Copy)]
pub struct FieldChain {
    pub field: &'static str,
    pub sources: &'static [FieldSource],
}

impl FieldChain {
    /// Evaluates the sources in order and returns the first non-empty value
    pub fn resolve(&self, document: &Html, metadata: Option<&PostingMetadata>) -> Option<String> {
        self.sources
            .iter()
            .find_map(|source| Self::evaluate(*source, document, metadata))
    }

    /// Like [`FieldChain::resolve`] but also reports which source matched
    pub fn resolve_with_source(
        &self,
        document: &Html,
        metadata: Option<&PostingMetadata>,
    ) -> Option<(FieldSource, String)> {
        self.sources.iter().find_map(|source| {
            Self::evaluate(*source, document, metadata).map(|value| (*source, value))
        })
    }

    fn evaluate(
        source: FieldSource,
        document: &Html,
        metadata: Option<&PostingMetadata>,
    ) -> Option<String> {
        match source {
            FieldSource::Metadata(field) => metadata
                .and_then(|m| field.get(m))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            FieldSource::Text(selector) => first_text(document.root_element(), selector),
            FieldSource::Html(selector) => first_inner_html(document.root_element(), selector),
        }
    }
}

pub const TITLE: FieldChain = FieldChain {
    field: "title",
    sources: &[
        FieldSource::Metadata(MetadataField::Title),
        FieldSource::Text(r#"h1[data-qa="vacancy-title"]"#),
        FieldSource::Text("h1.bloko-header-section-1"),
    ],
};

pub const COMPANY: FieldChain = FieldChain {
    field: "company",
    sources: &[
        FieldSource::Metadata(MetadataField::Company),
        FieldSource::Text(r#"a[data-qa="vacancy-company-name"]"#),
        FieldSource::Text(r#"[data-qa="vacancy-company-name"]"#),
    ],
};

pub const LOCATION: FieldChain = FieldChain {
    field: "location",
    sources: &[
        FieldSource::Metadata(MetadataField::Location),
        FieldSource::Text(r#"[data-qa="vacancy-view-location"]"#),
        FieldSource::Text(r#"[data-qa="vacancy-view-raw-address"]"#),
    ],
};

pub const SALARY: FieldChain = FieldChain {
    field: "salary",
    sources: &[
        FieldSource::Metadata(MetadataField::Salary),
        FieldSource::Text(r#"[data-qa="vacancy-salary"]"#),
    ],
};

pub const SALARY_CURRENCY: FieldChain = FieldChain {
    field: "salary_currency",
    sources: &[FieldSource::Metadata(MetadataField::SalaryCurrency)],
};

pub const EXPERIENCE: FieldChain = FieldChain {
    field: "experience",
    sources: &[FieldSource::Text(r#"[data-qa="vacancy-experience"]"#)],
};

pub const EMPLOYMENT_TYPE: FieldChain = FieldChain {
    field: "employment_type",
    sources: &[
        FieldSource::Metadata(MetadataField::EmploymentType),
        FieldSource::Text(r#"[data-qa="vacancy-view-employment-mode"]"#),
    ],
};

pub const DATE_POSTED: FieldChain = FieldChain {
    field: "date_posted",
    sources: &[FieldSource::Metadata(MetadataField::DatePosted)],
};

pub const DESCRIPTION_HTML: FieldChain = FieldChain {
    field: "description_html",
    sources: &[
        FieldSource::Metadata(MetadataField::DescriptionHtml),
        FieldSource::Html(r#"[data-qa="vacancy-description"]"#),
    ],
};

/// Dedicated skills list first, generic tag list second
pub const SKILL_SELECTORS: &[&str] = &[
    r#"[data-qa="skills-element"]"#,
    r#"[data-qa="bloko-tag__text"]"#,
];

/// Extracts a job record from a vacancy page
///
/// Never fails: missing or malformed sources fall through to the next
/// strategy and a field with no match is `None`.
pub fn extract_record(document: &Html, url: &Url) -> JobRecord {
    let metadata = find_job_posting(document);
    let metadata = metadata.as_ref();
    let field = |chain: &FieldChain| chain.resolve(document, metadata);

    let description_html = field(&DESCRIPTION_HTML);
    let description_text = description_html
        .as_deref()
        .map(derive_text)
        .filter(|text| !text.is_empty());

    JobRecord {
        title: field(&TITLE),
        company: field(&COMPANY),
        location: field(&LOCATION),
        salary: field(&SALARY),
        salary_currency: field(&SALARY_CURRENCY),
        experience: field(&EXPERIENCE),
        employment_type: field(&EMPLOYMENT_TYPE),
        skills: extract_skills(document),
        date_posted: field(&DATE_POSTED),
        description_html,
        description_text,
        source_url: url.to_string(),
        source: SOURCE_TAG.to_string(),
        scraped_at: Utc::now(),
    }
}

/// Skills from the first selector that yields any; `None` when none do
pub fn extract_skills(document: &Html) -> Option<Vec<String>> {
    SKILL_SELECTORS
        .iter()
        .map(|selector| all_texts(document.root_element(), selector))
        .find(|skills| !skills.is_empty())
}

//! Listing-card extraction, used when detail pages are not visited

use super::links::resolve_href;
use super::text::{all_texts, first_text, non_blank};
use super::{VacancyCard, SOURCE_TAG};
use crate::state::PageKind;
use crate::url::{canonicalize, is_vacancy_url};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const CARD_SELECTOR: &str = r#"[data-qa="vacancy-serp__vacancy"]"#;
const TITLE_SELECTOR: &str = r#"a[data-qa="serp-item__title"]"#;
const EMPLOYER_SELECTOR: &str = r#"[data-qa="vacancy-serp__vacancy-employer"]"#;
const ADDRESS_SELECTOR: &str = r#"[data-qa="vacancy-serp__vacancy-address"]"#;
const COMPENSATION_SELECTOR: &str = r#"[data-qa="vacancy-serp__vacancy-compensation"]"#;
const SNIPPET_SELECTOR: &str = r#"[data-qa="vacancy-serp__vacancy_snippet_requirement"], [data-qa="vacancy-serp__vacancy_snippet_responsibility"]"#;

/// Extracts every vacancy card on a listing page, in document order
pub fn extract_cards(document: &Html, base_url: &Url) -> Vec<VacancyCard> {
    let Ok(selector) = Selector::parse(CARD_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|card| extract_card(card, base_url))
        .collect()
}

/// Extracts one card; any missing field is `None`
///
/// The URL is the canonical vacancy URL of the title anchor, or `None` when
/// the anchor does not point at a vacancy.
pub fn extract_card(card: ElementRef<'_>, base_url: &Url) -> VacancyCard {
    let title_anchor = Selector::parse(TITLE_SELECTOR)
        .ok()
        .and_then(|selector| card.select(&selector).next());

    let title = title_anchor.and_then(|a| non_blank(&a.text().collect::<String>()));
    let url = title_anchor
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_href(href, base_url))
        .filter(is_vacancy_url)
        .and_then(|url| canonicalize(&url, PageKind::Detail).ok())
        .map(|url| url.to_string());

    let snippet_parts = all_texts(card, SNIPPET_SELECTOR);
    let snippet = (!snippet_parts.is_empty()).then(|| snippet_parts.join(" "));

    VacancyCard {
        title,
        url,
        company: first_text(card, EMPLOYER_SELECTOR),
        location: first_text(card, ADDRESS_SELECTOR),
        salary: first_text(card, COMPENSATION_SELECTOR),
        snippet,
        source: SOURCE_TAG.to_string(),
        scraped_at: Utc::now(),
    }
}

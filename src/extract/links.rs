//! Vacancy link and pagination discovery on listing pages

use crate::state::PageKind;
use crate::url::{canonicalize, is_vacancy_url, same_site, with_page};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Anchors that point at vacancy pages on a search results page
const VACANCY_LINK_SELECTOR: &str = r#"a[data-qa="serp-item__title"], a.bloko-link[href*="/vacancy/"]"#;

const PAGER_NEXT_SELECTOR: &str = r#"a[data-qa="pager-next"]"#;
const PAGER_PAGE_SELECTOR: &str = r#"a[data-qa="pager-page"]"#;

/// Extracts canonical vacancy URLs from a listing page
///
/// Hrefs are resolved against `base_url`. Only `/vacancy/<digits>` paths on
/// the same site are kept, with query and fragment removed. The result is
/// deduplicated and keeps document order. Malformed or non-HTTP hrefs are
/// dropped.
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(VACANCY_LINK_SELECTOR) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_href(href, base_url) else {
            continue;
        };
        if !is_vacancy_url(&url) || !same_site(&url, base_url) {
            continue;
        }
        let Ok(canonical) = canonicalize(&url, PageKind::Detail) else {
            continue;
        };
        if seen.insert(canonical.as_str().to_string()) {
            links.push(canonical);
        }
    }

    links
}

/// Finds the URL of the listing page after `current_page`
///
/// An explicit "next" pager control wins. Otherwise the highest numbered
/// pager label decides: labels are one-based while `current_page` is
/// zero-based, so a next page exists while `current_page + 1` is below the
/// highest label. The synthesized URL is `base_url` with `page` set.
pub fn extract_next_page(document: &Html, base_url: &Url, current_page: u32) -> Option<Url> {
    if let Ok(next_selector) = Selector::parse(PAGER_NEXT_SELECTOR) {
        let explicit = document
            .select(&next_selector)
            .filter_map(|element| element.value().attr("href"))
            .find_map(|href| resolve_href(href, base_url));
        if explicit.is_some() {
            return explicit;
        }
    }

    let page_selector = Selector::parse(PAGER_PAGE_SELECTOR).ok()?;
    let max_advertised = document
        .select(&page_selector)
        .filter_map(|element| {
            element
                .text()
                .collect::<String>()
                .trim()
                .parse::<u32>()
                .ok()
        })
        .max()?;

    let next_page = current_page.checked_add(1)?;
    (next_page < max_advertised).then(|| with_page(base_url, next_page))
}

/// Resolves an href to an absolute HTTP(S) URL
///
/// Returns None for empty hrefs, fragment-only anchors, `javascript:`,
/// `mailto:`, `tel:` and `data:` links, and anything that fails to parse.
pub(crate) fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    matches!(absolute.scheme(), "http" | "https").then_some(absolute)
}

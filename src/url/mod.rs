//! URL handling module for Vacancy-Harvest
//!
//! This module provides canonicalization into the deduplication key space,
//! vacancy-link recognition, search URL construction and pagination URL
//! synthesis.

mod domain;
mod normalize;

use crate::config::SearchConfig;
use crate::UrlError;
use url::Url;

// Re-export main functions
pub use domain::{same_site, site_key};
pub use normalize::{canonicalize, canonicalize_str};

/// Path of the search results page relative to the site root
const SEARCH_PATH: &str = "/search/vacancy";

/// Query parameter carrying the zero-based results page index
pub const PAGE_PARAM: &str = "page";

/// Builds the search listing URL from the configured search parameters
///
/// Empty filters are omitted. The `hhtmFrom` marker mirrors what the site
/// itself sends from its search form.
///
/// # Examples
///
/// ```
/// use vacancy_harvest::config::SearchConfig;
/// use vacancy_harvest::url::build_search_url;
///
/// let search = SearchConfig { text: "rust".to_string(), ..SearchConfig::default() };
/// let url = build_search_url("https://hh.ru", &search).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://hh.ru/search/vacancy?text=rust&area=1&hhtmFrom=vacancy_search_list"
/// );
/// ```
pub fn build_search_url(base_url: &str, search: &SearchConfig) -> Result<Url, UrlError> {
    let base = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;
    let mut url = base
        .join(SEARCH_PATH)
        .map_err(|e| UrlError::Parse(e.to_string()))?;

    {
        let mut query = url.query_pairs_mut();
        for (key, value) in [
            ("text", search.text.trim()),
            ("area", search.area.trim()),
            ("experience", search.experience.trim()),
            ("schedule", search.schedule.trim()),
            ("employment", search.employment.trim()),
        ] {
            if !value.is_empty() {
                query.append_pair(key, value);
            }
        }
        query.append_pair("hhtmFrom", "vacancy_search_list");
    }

    Ok(url)
}

/// Checks whether a URL points at a single vacancy (`/vacancy/<digits>`)
pub fn is_vacancy_url(url: &Url) -> bool {
    let mut segments = match url.path_segments() {
        Some(segments) => segments.filter(|s| !s.is_empty()),
        None => return false,
    };

    match (segments.next(), segments.next(), segments.next()) {
        (Some("vacancy"), Some(id), None) => {
            !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// Returns `url` with the page parameter set to `page`, keeping every other
/// query parameter in place
pub fn with_page(url: &Url, page: u32) -> Url {
    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = url.clone();
    next.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair(PAGE_PARAM, &page.to_string());
    next
}

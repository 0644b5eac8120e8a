use crate::state::PageKind;
use crate::UrlError;
use url::Url;

/// Query parameters that vary between visits without changing the page
const VOLATILE_PARAMS: &[&str] = &[
    "hhtmFrom",
    "hhtmFromLabel",
    "hhtmSource",
    "from",
    "query",
    "requestId",
    "fbclid",
    "gclid",
    "yclid",
    "ref",
];

/// Canonicalizes a URL into the deduplication key space
///
/// # Canonicalization Steps
///
/// 1. Reject non-HTTP(S) schemes and host-less URLs
/// 2. Lowercase the host and drop a `www.` prefix
/// 3. Remove dot segments, duplicate and trailing slashes
/// 4. Remove the fragment
/// 5. Vacancy pages: drop the whole query string
/// 6. Listing pages: drop volatile parameters (`utm_*`, `hhtm*`, click ids)
///    and sort the rest so equivalent searches share one key
///
/// # Examples
///
/// ```
/// use url::Url;
/// use vacancy_harvest::state::PageKind;
/// use vacancy_harvest::url::canonicalize;
///
/// let raw = Url::parse("https://HH.ru/vacancy/123/?query=rust#top").unwrap();
/// let url = canonicalize(&raw, PageKind::Detail).unwrap();
/// assert_eq!(url.as_str(), "https://hh.ru/vacancy/123");
/// ```
pub fn canonicalize(url: &Url, kind: PageKind) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    let mut canonical = url.clone();

    if let Some(stripped) = host.strip_prefix("www.") {
        canonical
            .set_host(Some(stripped))
            .map_err(|e| UrlError::Parse(format!("Failed to set host: {}", e)))?;
    }

    let path = normalize_path(canonical.path());
    canonical.set_path(&path);
    canonical.set_fragment(None);

    match kind {
        PageKind::Detail => canonical.set_query(None),
        PageKind::Listing => {
            let params = filter_and_sort_query_params(&canonical);
            if params.is_empty() {
                canonical.set_query(None);
            } else {
                canonical.query_pairs_mut().clear().extend_pairs(params);
            }
        }
    }

    Ok(canonical)
}

/// Parses and canonicalizes a URL string
pub fn canonicalize_str(url_str: &str, kind: PageKind) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    canonicalize(&url, kind)
}

/// Normalizes a URL path by removing dot segments and trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Filters out volatile parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_volatile_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    params.sort();
    params
}

fn is_volatile_param(key: &str) -> bool {
    VOLATILE_PARAMS.contains(&key) || key.starts_with("utm_")
}

//! Text helpers shared by the extractors

use scraper::{ElementRef, Html, Selector};

/// Elements whose content never counts as readable text
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe"];

/// Derives plain text from an HTML fragment
///
/// Drops script/style/noscript/iframe subtrees, concatenates the remaining
/// text nodes, collapses runs of whitespace to single spaces and trims. The
/// result depends on `html` alone.
///
/// # Example
///
/// ```
/// use vacancy_harvest::extract::derive_text;
///
/// let text = derive_text("<p>Rust <b>developer</b></p><script>track()</script>");
/// assert_eq!(text, "Rust developer");
/// ```
pub fn derive_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut raw = String::new();
    collect_text(fragment.root_element(), &mut raw);
    collapse_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            if !SKIPPED_ELEMENTS.contains(&child_element.value().name()) {
                collect_text(child_element, out);
            }
        }
    }
}

/// Collapses whitespace runs (including non-breaking spaces) and trims
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first element matching `selector` under `scope` that has
/// non-blank content, trimmed
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty())
}

/// Inner HTML of the first element matching `selector` under `scope`, trimmed
pub(crate) fn first_inner_html(scope: ElementRef<'_>, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    scope
        .select(&selector)
        .next()
        .map(|element| element.inner_html().trim().to_string())
        .filter(|html| !html.is_empty())
}

/// Trimmed, non-blank text of every element matching `selector`, in document order
pub(crate) fn all_texts(scope: ElementRef<'_>, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    scope
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Trims and maps blank strings to `None`
pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_skipped_subtrees() {
        let html = r#"
            <div>Intro<style>.x{color:red}</style>
            <noscript>enable js</noscript><iframe src="/ad">frame</iframe>
            <script>var a = 1;</script>text</div>
        "#;
        assert_eq!(derive_text(html), "Intro text");
    }

    #[test]
    fn test_collapses_whitespace() {
        let html = "<p>  Senior\n\n  engineer\u{a0}\u{a0}wanted  </p>";
        assert_eq!(derive_text(html), "Senior engineer wanted");
    }

    #[test]
    fn test_adjacent_elements_concatenate() {
        assert_eq!(derive_text("<p>a</p><p>b</p>"), "ab");
        assert_eq!(derive_text("<li>Rust</li> <li>Go</li>"), "Rust Go");
    }

    #[test]
    fn test_idempotent() {
        let html = "<ul><li>Build <em>fast</em> services</li><li>Review code</li></ul>";
        assert_eq!(derive_text(html), derive_text(html));
    }

    #[test]
    fn test_plain_text_rewrapped_yields_same_text() {
        let html = "<div><h2>Duties</h2>\n<p>Write   Rust</p><script>x()</script></div>";
        let text = derive_text(html);
        let rewrapped = format!("<div>{}</div>", text);
        assert_eq!(derive_text(&rewrapped), text);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(derive_text(""), "");
        assert_eq!(derive_text("<script>only()</script>"), "");
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(derive_text("<p>R&amp;D &lt;team&gt;</p>"), "R&D <team>");
    }

    #[test]
    fn test_first_text_skips_blank_matches() {
        let doc = Html::parse_document(r#"<div class="t"> </div><div class="t">Found</div>"#);
        assert_eq!(first_text(doc.root_element(), ".t"), Some("Found".to_string()));
        assert_eq!(first_text(doc.root_element(), ".missing"), None);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  x "), Some("x".to_string()));
        assert_eq!(non_blank("   "), None);
    }
}

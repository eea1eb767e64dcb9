use scraper::{Html, Selector};
use tracing::warn;

/// First paragraph anywhere under the main article container.
const ARTICLE_PARAGRAPH: &str = "article p";

/// Extract the preview text of an MDN page: the first `<p>` inside `<article>`,
/// with all descendant text concatenated and surrounding whitespace trimmed.
///
/// Returns an empty string when the page has no such paragraph. Malformed
/// markup is never an error; html5ever recovers whatever tree it can.
pub fn extract_snippet(html: &str) -> String {
    let selector = match Selector::parse(ARTICLE_PARAGRAPH) {
        Ok(s) => s,
        Err(e) => {
            warn!(%e, "invalid snippet selector");
            return String::new();
        }
    };

    let document = Html::parse_document(html);
    document
        .select(&selector)
        .next()
        .map(|p| p.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

//! Page observation: failure-indicator keywords in the rendered text.
//!
//! The result is advisory context for the oracle ("the page says
//! *invalid*"), never a pass/fail signal. Only the matched vocabulary words
//! are reported, not the surrounding page text.

use regex::Regex;
use std::sync::LazyLock;

use crate::sanitizer::PageSnapshot;

#[allow(clippy::expect_used)]
static HIDDEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<(script|style|template|noscript)\b[^>]*>.*?</(script|style|template|noscript)\s*>|<!--.*?-->",
    )
    .expect("hidden-content pattern is valid")
});

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("tag pattern is valid"));

/// Visible text of a snapshot, lowercased with whitespace collapsed
#[must_use]
pub fn rendered_text(snapshot: &PageSnapshot) -> String {
    let visible = HIDDEN_RE.replace_all(snapshot.as_str(), " ");
    let text = TAG_RE.replace_all(&visible, " ");
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keywords from `vocabulary` that appear in the rendered page
///
/// Matching is a case-insensitive substring search, so "errors" reports
/// `error`; results follow vocabulary order without duplicates.
#[must_use]
pub fn observe_page_errors(snapshot: &PageSnapshot, vocabulary: &[String]) -> Vec<String> {
    if snapshot.is_empty() || vocabulary.is_empty() {
        return Vec::new();
    }
    let text = rendered_text(snapshot);
    let mut found: Vec<String> = Vec::new();
    for keyword in vocabulary {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() || found.contains(&keyword) {
            continue;
        }
        if text.contains(keyword.as_str()) {
            found.push(keyword);
        }
    }
    found
}

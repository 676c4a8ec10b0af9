//! Snapshot sanitizer: raw page markup in, bounded privacy-safe summary out.
//!
//! The sanitized context is the only view of the page the oracle ever gets,
//! so it keeps just enough structure to name a replacement locator:
//!
//! - non-semantic subtrees (`script`, `style`, `svg`, ...) are dropped whole
//! - only interactive tags are emitted, each with whitelisted attributes
//! - text survives only inside labeling elements; all other text collapses
//!   into the mask token
//! - the result is cut to a hard character cap
//!
//! Sanitizing is a pure function of the snapshot and the configuration.

use crate::config::SanitizerConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<!--.*?-->|<![^>]*>|<(/?)([A-Za-z][A-Za-z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#,
    )
    .expect("tag pattern is valid")
});

#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_:@][-A-Za-z0-9_:.@]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("attribute pattern is valid")
});

#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").expect("email pattern is valid")
});

// Seven or more digits, optionally separated (phone, card and account numbers)
#[allow(clippy::expect_used)]
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d(?:[\s.\-]?\d){6,}").expect("digit pattern is valid"));

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

// Contents are raw text: only the matching end tag closes them
const RAW_TEXT_TAGS: &[&str] = &["script", "style", "textarea", "title"];

/// Raw markup captured when a locator failed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    html: String,
}

impl PageSnapshot {
    /// Wrap captured markup
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    /// Empty snapshot (used when capture fails)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The raw markup
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.html
    }

    /// Whether nothing was captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.html.is_empty()
    }
}

impl From<String> for PageSnapshot {
    fn from(html: String) -> Self {
        Self { html }
    }
}

impl From<&str> for PageSnapshot {
    fn from(html: &str) -> Self {
        Self::new(html)
    }
}

/// Bounded, scrubbed summary of a snapshot
///
/// Created per resolution attempt and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SanitizedContext {
    text: String,
}

impl SanitizedContext {
    /// The summary text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters (the unit of the cap)
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the summary is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl fmt::Display for SanitizedContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Snapshot sanitizer bound to one configuration
#[derive(Debug, Clone)]
pub struct Sanitizer {
    config: SanitizerConfig,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(SanitizerConfig::default())
    }
}

impl Sanitizer {
    /// Create a sanitizer; tag and attribute names are matched case-insensitively
    #[must_use]
    pub fn new(mut config: SanitizerConfig) -> Self {
        for list in [
            &mut config.stripped_tags,
            &mut config.interactive_tags,
            &mut config.text_tags,
            &mut config.kept_attributes,
        ] {
            for name in list.iter_mut() {
                *name = name.to_ascii_lowercase();
            }
        }
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &SanitizerConfig {
        &self.config
    }

    /// Derive the sanitized context from a snapshot
    #[must_use]
    pub fn sanitize(&self, snapshot: &PageSnapshot) -> SanitizedContext {
        let html = snapshot.as_str();
        let mut out = Emitter::new(&self.config.mask_token, self.config.max_chars);
        let mut open: Vec<String> = Vec::new();
        let mut cursor = 0;

        while !out.is_full() {
            let Some(caps) = TAG_RE.captures_at(html, cursor) else {
                break;
            };
            let Some(whole) = caps.get(0) else { break };
            self.text(&html[cursor..whole.start()], &open, &mut out);
            cursor = whole.end();

            // comments and doctype carry no name
            let Some(name) = caps.get(2) else { continue };
            let name = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| m.as_str() == "/");
            let attrs = caps.get(3).map_or("", |m| m.as_str());
            let self_closing = attrs.trim_end().ends_with('/');

            if self.is_stripped(&name) {
                if !closing && !self_closing && !is_void(&name) {
                    cursor = skip_element(html, &name, cursor);
                }
                continue;
            }

            let interactive = self.is_interactive(&name);
            if closing {
                if let Some(pos) = open.iter().rposition(|n| *n == name) {
                    open.truncate(pos);
                }
                if interactive {
                    out.push(format!("</{name}>"));
                }
                continue;
            }

            if interactive {
                out.push(self.open_tag(&name, attrs));
            }
            if self_closing || is_void(&name) {
                continue;
            }
            if RAW_TEXT_TAGS.contains(&name.as_str()) {
                let (inner, end) = raw_text(html, &name, cursor);
                open.push(name.clone());
                self.text(inner, &open, &mut out);
                open.pop();
                if interactive {
                    out.push(format!("</{name}>"));
                }
                cursor = end;
                continue;
            }
            open.push(name);
        }

        if !out.is_full() && cursor < html.len() {
            self.text(&html[cursor..], &open, &mut out);
        }

        SanitizedContext {
            text: out.finish(),
        }
    }

    fn is_stripped(&self, name: &str) -> bool {
        self.config.stripped_tags.iter().any(|t| t == name)
    }

    fn is_interactive(&self, name: &str) -> bool {
        self.config.interactive_tags.iter().any(|t| t == name)
    }

    fn keeps_text(&self, open: &[String]) -> bool {
        open.iter()
            .any(|name| self.config.text_tags.iter().any(|t| t == name))
    }

    fn text(&self, raw: &str, open: &[String], out: &mut Emitter) {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return;
        }
        if self.keeps_text(open) {
            out.push(self.scrub(&collapsed));
        } else {
            out.mask();
        }
    }

    fn open_tag(&self, name: &str, attrs: &str) -> String {
        let mut tag = format!("<{name}");
        for caps in ATTR_RE.captures_iter(attrs) {
            let Some(attr) = caps.get(1) else { continue };
            let attr = attr.as_str().to_ascii_lowercase();
            if !self.config.kept_attributes.iter().any(|a| *a == attr) {
                continue;
            }
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str());
            match value {
                Some(value) => {
                    let value = self.scrub(value).replace('"', "&quot;");
                    tag.push_str(&format!(" {attr}=\"{value}\""));
                }
                None => tag.push_str(&format!(" {attr}")),
            }
        }
        tag.push('>');
        tag
    }

    fn scrub(&self, text: &str) -> String {
        if !self.config.scrub_pii {
            return text.to_string();
        }
        let token = self.config.mask_token.as_str();
        let text = EMAIL_RE.replace_all(text, token);
        DIGITS_RE.replace_all(&text, token).into_owned()
    }
}

/// Sanitize with the default configuration
#[must_use]
pub fn sanitize(snapshot: &PageSnapshot) -> SanitizedContext {
    Sanitizer::default().sanitize(snapshot)
}

fn is_void(name: &str) -> bool {
    VOID_TAGS.contains(&name)
}

/// Contents of a raw-text element and the offset just past its end tag
fn raw_text<'a>(html: &'a str, name: &str, from: usize) -> (&'a str, usize) {
    match find_close_tag(&html[from..], name) {
        Some(rel) => {
            let close_start = from + rel;
            let end = html[close_start..]
                .find('>')
                .map_or(html.len(), |gt| close_start + gt + 1);
            (&html[from..close_start], end)
        }
        None => (&html[from..], html.len()),
    }
}

/// Offset of the first `</name`, compared ASCII case-insensitively in place
fn find_close_tag(html: &str, name: &str) -> Option<usize> {
    let name = name.as_bytes();
    html.match_indices("</").map(|(at, _)| at).find(|&at| {
        html.as_bytes()
            .get(at + 2..at + 2 + name.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(name))
    })
}

/// Offset just past the end of a stripped element opened before `from`
fn skip_element(html: &str, name: &str, from: usize) -> usize {
    if RAW_TEXT_TAGS.contains(&name) {
        return raw_text(html, name, from).1;
    }
    let mut depth = 1usize;
    let mut cursor = from;
    while let Some(caps) = TAG_RE.captures_at(html, cursor) {
        let Some(whole) = caps.get(0) else { break };
        cursor = whole.end();
        let Some(tag) = caps.get(2) else { continue };
        if !tag.as_str().eq_ignore_ascii_case(name) {
            continue;
        }
        let closing = caps.get(1).is_some_and(|m| m.as_str() == "/");
        let self_closing = caps
            .get(3)
            .is_some_and(|m| m.as_str().trim_end().ends_with('/'));
        if closing {
            depth -= 1;
            if depth == 0 {
                return cursor;
            }
        } else if !self_closing {
            depth += 1;
        }
    }
    html.len()
}

/// Accumulates output pieces and enforces the character cap
struct Emitter<'a> {
    mask: &'a str,
    cap: usize,
    pieces: Vec<String>,
    chars: usize,
    last_masked: bool,
}

impl<'a> Emitter<'a> {
    fn new(mask: &'a str, cap: usize) -> Self {
        Self {
            mask,
            cap,
            pieces: Vec::new(),
            chars: 0,
            last_masked: false,
        }
    }

    fn is_full(&self) -> bool {
        self.chars > self.cap
    }

    fn push(&mut self, piece: String) {
        let separator = usize::from(!self.pieces.is_empty());
        self.chars += piece.chars().count() + separator;
        self.pieces.push(piece);
        self.last_masked = false;
    }

    fn mask(&mut self) {
        if !self.last_masked {
            self.push(self.mask.to_string());
            self.last_masked = true;
        }
    }

    fn finish(self) -> String {
        let mut text = self.pieces.join(" ");
        if let Some((cut, _)) = text.char_indices().nth(self.cap) {
            text.truncate(cut);
        }
        text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn run(html: &str) -> String {
        sanitize(&PageSnapshot::new(html)).as_str().to_string()
    }

    // ========================================================================
    // Stripping
    // ========================================================================

    #[test]
    fn test_script_and_style_removed_with_contents() {
        let out = run(
            "<script>var token = 'abc';</script><style>.x{color:red}</style><button id=\"go\">Go</button>",
        );
        assert!(!out.contains("token"));
        assert!(!out.contains("color"));
        assert_eq!(out, "<button id=\"go\"> Go </button>");
    }

    #[test]
    fn test_script_containing_markup_is_fully_dropped() {
        let out =
            run("<script>document.write('<a href=\"/x\">x</a>')</script><a href=\"/y\">Y</a>");
        assert!(!out.contains("/x"));
        assert!(out.contains("href=\"/y\""));
    }

    #[test]
    fn test_nested_svg_dropped() {
        let out = run(
            "<svg><g><svg><path d=\"M0\"/></svg><text>label</text></g></svg><button>Ok</button>",
        );
        assert!(!out.contains("label"));
        assert!(!out.contains("path"));
        assert_eq!(out, "<button> Ok </button>");
    }

    #[test]
    fn test_meta_link_and_iframe_dropped() {
        let out = run(
            "<head><meta charset=\"utf-8\"><link rel=\"stylesheet\" href=\"a.css\"></head><iframe src=\"ad\">fallback</iframe><a href=\"/home\">Home</a>",
        );
        assert!(!out.contains("a.css"));
        assert!(!out.contains("fallback"));
        assert!(out.contains("<a href=\"/home\"> Home </a>"));
    }

    #[test]
    fn test_comments_and_doctype_ignored() {
        let out = run("<!DOCTYPE html><!-- secret build id --><button>Send</button>");
        assert_eq!(out, "<button> Send </button>");
    }

    // ========================================================================
    // Attribute whitelist
    // ========================================================================

    #[test]
    fn test_only_whitelisted_attributes_survive() {
        let out = run(
            "<input id=\"user\" name=\"username\" type=\"text\" placeholder=\"Username\" value=\"tomsmith\" onclick=\"steal()\" style=\"color:red\" data-track=\"x1\">",
        );
        assert_eq!(
            out,
            "<input id=\"user\" name=\"username\" type=\"text\" placeholder=\"Username\">"
        );
    }

    #[test]
    fn test_unquoted_and_boolean_attributes() {
        let out = run("<input type=checkbox disabled name='agree'>");
        assert_eq!(out, "<input type=\"checkbox\" name=\"agree\">");
    }

    #[test]
    fn test_uppercase_tags_and_attributes() {
        let out = run("<BUTTON ID=\"Go\" CLASS=\"btn\">Go</BUTTON>");
        assert_eq!(out, "<button id=\"Go\" class=\"btn\"> Go </button>");
    }

    #[test]
    fn test_non_interactive_tags_not_emitted() {
        let out = run(
            "<div class=\"wrap\"><form id=\"login\"><button type=\"submit\">Login</button></form></div>",
        );
        assert!(!out.contains("div"));
        assert!(!out.contains("wrap"));
        assert_eq!(
            out,
            "<form id=\"login\"> <button type=\"submit\"> Login </button> </form>"
        );
    }

    // ========================================================================
    // Masking
    // ========================================================================

    #[test]
    fn test_free_text_masked() {
        let out = run("<p>Welcome back, Jane Doe</p><label for=\"u\">Username</label>");
        assert!(!out.contains("Jane"));
        assert_eq!(out, "[MASKED] <label> Username </label>");
    }

    #[test]
    fn test_consecutive_masks_collapse() {
        let out = run("<p>one</p><p>two</p><span>three</span><button>Go</button>");
        assert_eq!(out, "[MASKED] <button> Go </button>");
    }

    #[test]
    fn test_heading_text_kept() {
        let out = run("<h2>Login Page</h2><p>Account 42</p>");
        assert_eq!(out, "Login Page [MASKED]");
    }

    #[test]
    fn test_textarea_contents_masked() {
        let out = run("<textarea name=\"notes\">my private notes</textarea>");
        assert_eq!(out, "<textarea name=\"notes\"> [MASKED] </textarea>");
    }

    #[test]
    fn test_pii_scrubbed_inside_kept_text() {
        let out = run("<label>Contact jane.doe@example.com or 555-123-4567</label>");
        assert!(!out.contains("jane.doe"));
        assert!(!out.contains("4567"));
        assert!(out.contains("Contact [MASKED] or [MASKED]"));
    }

    #[test]
    fn test_pii_scrub_can_be_disabled() {
        let config = SanitizerConfig {
            scrub_pii: false,
            ..SanitizerConfig::default()
        };
        let out = Sanitizer::new(config)
            .sanitize(&PageSnapshot::new("<label>a@b.io</label>"));
        assert!(out.as_str().contains("a@b.io"));
    }

    #[test]
    fn test_custom_mask_token() {
        let config = SanitizerConfig::default().with_mask_token("<redacted>");
        let out = Sanitizer::new(config).sanitize(&PageSnapshot::new("<p>hidden</p>"));
        assert_eq!(out.as_str(), "<redacted>");
    }

    // ========================================================================
    // Truncation
    // ========================================================================

    #[test]
    fn test_truncated_to_cap() {
        let html = "<button class=\"b\">Press</button>".repeat(1_000);
        let config = SanitizerConfig::default().with_max_chars(100);
        let out = Sanitizer::new(config).sanitize(&PageSnapshot::new(html));
        assert_eq!(out.char_len(), 100);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let html = "<button>Ünïcödé Ünïcödé</button>".repeat(50);
        let config = SanitizerConfig::default().with_max_chars(37);
        let out = Sanitizer::new(config).sanitize(&PageSnapshot::new(html));
        assert_eq!(out.char_len(), 37);
    }

    // ========================================================================
    // Robustness
    // ========================================================================

    #[test]
    fn test_empty_snapshot() {
        let out = sanitize(&PageSnapshot::empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_unclosed_script_drops_rest() {
        let out = run("<button>Go</button><script>let x = 1;");
        assert_eq!(out, "<button> Go </button>");
    }

    #[test]
    fn test_raw_text_close_tag_any_case() {
        let out = run("<SCRIPT>if (a </b) {}</ScRiPt><button>Go</button>");
        assert_eq!(out, "<button> Go </button>");
    }

    #[test]
    fn test_find_close_tag_in_place() {
        assert_eq!(find_close_tag("ünï </b> </STYLE>", "style"), Some(11));
        assert_eq!(find_close_tag("a </scrip", "script"), None);
        assert_eq!(find_close_tag("", "title"), None);
    }

    #[test]
    fn test_many_scripts_on_large_page() {
        let html = "<script>let v = '<p>';</script><p>text</p>".repeat(5_000)
            + "<button id=\"end\">End</button>";
        let config = SanitizerConfig::default().with_max_chars(usize::MAX);
        let out = Sanitizer::new(config)
            .sanitize(&PageSnapshot::new(html))
            .as_str()
            .to_string();
        assert!(!out.contains("let v"));
        assert!(out.ends_with("<button id=\"end\"> End </button>"));
    }

    #[test]
    fn test_stray_closing_tags_tolerated() {
        let out = run("</div></button><a href=\"/x\">X</a></span>");
        assert_eq!(out, "</button> <a href=\"/x\"> X </a>");
    }

    #[test]
    fn test_input_does_not_open_text_scope() {
        // Text after a void element is outside any labeling element
        let out = run("<input id=\"q\">loose text");
        assert_eq!(out, "<input id=\"q\"> [MASKED]");
    }

    #[test]
    fn test_original_snapshot_untouched() {
        let snapshot = PageSnapshot::new("<p>keep me</p>");
        let before = snapshot.clone();
        let _ = sanitize(&snapshot);
        assert_eq!(snapshot, before);
    }

    // ========================================================================
    // Properties
    // ========================================================================

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_sanitize_is_deterministic(html in ".{0,400}") {
                let snapshot = PageSnapshot::new(html);
                prop_assert_eq!(sanitize(&snapshot), sanitize(&snapshot));
            }

            #[test]
            fn prop_output_never_exceeds_cap(
                html in ".{0,3000}",
                repeat in 0usize..200,
                cap in 1usize..300
            ) {
                let html = format!("{html}{}", "<a href=\"/p\">Link</a><p>x</p>".repeat(repeat));
                let config = SanitizerConfig::default().with_max_chars(cap);
                let out = Sanitizer::new(config).sanitize(&PageSnapshot::new(html));
                prop_assert!(out.char_len() <= cap);
            }

            #[test]
            fn prop_free_text_never_leaks(
                words in proptest::collection::vec("zq[a-z]{8,16}", 1..8)
            ) {
                let mut html = String::from("<html><body><div>");
                for (i, word) in words.iter().enumerate() {
                    html.push_str(&format!(
                        "<p>{word}</p><button id=\"b{i}\">Go</button><span>{word} {word}</span>"
                    ));
                }
                html.push_str("</div></body></html>");
                let out = sanitize(&PageSnapshot::new(html));
                for word in &words {
                    prop_assert!(!out.as_str().contains(word.as_str()));
                }
            }
        }
    }
}

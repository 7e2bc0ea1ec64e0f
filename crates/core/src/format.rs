//! Markup rendering for message bodies.
use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(https?://[^\s<]+)").expect("url pattern is valid"));

const LINK_TEMPLATE: &str = r#"<a href="$1" target="_blank" rel="noopener noreferrer" style="color: #667eea; text-decoration: underline;">$1</a>"#;

/// Converts line breaks to `<br>` and wraps bare `http(s)` URLs in links.
///
/// Absent or empty text renders as an empty string.
pub fn format_message<'a>(text: impl Into<Option<&'a str>>) -> String {
    let text = match text.into() {
        Some(text) if !text.is_empty() => text,
        _ => return String::new(),
    };

    let with_breaks = text.replace('\n', "<br>");
    URL_RE.replace_all(&with_breaks, LINK_TEMPLATE).into_owned()
}

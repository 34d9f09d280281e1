//! Presentation cleanup for generated titles and summaries.
//!
//! Small models like to answer `Title: "Something"`. Before display we strip
//! a leading label and any surrounding quotes. This is cosmetic and makes no
//! promise about what the model returns.

use once_cell::sync::Lazy;
use regex::Regex;

use triage_core::defaults::LABEL_MAX_LEN;

/// Leading `label:` on the first line, optionally wrapped in markdown
/// emphasis (`**Title:**`, `**Title**:`) or led by a heading marker.
///
/// The label must start with a letter and stay within [`LABEL_MAX_LEN`], so
/// a time like `10:30` or a long sentence that happens to contain a colon is
/// left alone.
static LABEL_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(?:#+\s*)?(?:\*\*|__|\*|_)?[\p{{L}}][^:\n]{{0,{}}}:(?:\*\*|__|\*|_)?\s*",
        LABEL_MAX_LEN - 1
    ))
    .expect("label prefix pattern is valid")
});

/// Opening and closing characters stripped when they wrap the whole text.
const WRAPPERS: &[(&str, &str)] = &[
    ("**", "**"),
    ("__", "__"),
    ("\"", "\""),
    ("'", "'"),
    ("“", "”"),
    ("‘", "’"),
    ("`", "`"),
];

/// Strip a leading label and a surrounding pair of quotes from generated
/// text. An unmatched quote is kept.
pub fn sanitize_generated(text: &str) -> String {
    let mut out = strip_label(text).trim();
    for (open, close) in WRAPPERS {
        if let Some(inner) = strip_pair(out, open, close) {
            out = inner.trim();
        }
    }
    out.to_string()
}

fn strip_label(text: &str) -> &str {
    match LABEL_PREFIX.find(text) {
        // `https://...` is a URL, not a label.
        Some(m) if !text[m.end()..].starts_with("//") => &text[m.end()..],
        _ => text,
    }
}

fn strip_pair<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    if text.len() < open.len() + close.len() {
        return None;
    }
    text.strip_prefix(open)?.strip_suffix(close)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize_generated("Hello World"), "Hello World");
    }

    #[test]
    fn test_strips_label() {
        assert_eq!(sanitize_generated("Title: Reading Notes"), "Reading Notes");
        assert_eq!(sanitize_generated("Summary:\nA short recap."), "A short recap.");
    }

    #[test]
    fn test_strips_label_and_quotes() {
        assert_eq!(sanitize_generated("Title: \"Deep Work\""), "Deep Work");
        assert_eq!(sanitize_generated("  “Curly Quotes”  "), "Curly Quotes");
        assert_eq!(sanitize_generated("'single'"), "single");
    }

    #[test]
    fn test_only_first_colon_label_is_removed() {
        assert_eq!(
            sanitize_generated("Summary: the ratio was 3:1 overall"),
            "the ratio was 3:1 overall"
        );
    }

    #[test]
    fn test_time_is_not_a_label() {
        assert_eq!(
            sanitize_generated("10:30 meeting notes"),
            "10:30 meeting notes"
        );
    }

    #[test]
    fn test_long_prefix_is_not_a_label() {
        let text = "This sentence is far too long to be a label: it is content";
        assert_eq!(sanitize_generated(text), text);
    }

    #[test]
    fn test_colon_on_later_line_is_kept() {
        let text = "First line\nNote: second";
        assert_eq!(sanitize_generated(text), text);
    }

    #[test]
    fn test_inner_quotes_are_kept() {
        assert_eq!(
            sanitize_generated("\"The \"best\" ideas\""),
            "The \"best\" ideas"
        );
    }

    #[test]
    fn test_label_without_space_after_colon() {
        assert_eq!(sanitize_generated("Title:\"Deep Work\""), "Deep Work");
        assert_eq!(sanitize_generated("Title:Deep Work"), "Deep Work");
    }

    #[test]
    fn test_markdown_emphasized_label() {
        assert_eq!(sanitize_generated("**Title:** \"Deep Work\""), "Deep Work");
        assert_eq!(sanitize_generated("**Title**: Deep Work"), "Deep Work");
        assert_eq!(sanitize_generated("## Summary: Focus wins"), "Focus wins");
        assert_eq!(sanitize_generated("**Deep Work**"), "Deep Work");
    }

    #[test]
    fn test_unmatched_quote_is_kept() {
        assert_eq!(sanitize_generated("\"Deep Work"), "\"Deep Work");
        assert_eq!(sanitize_generated("Title: Deep Work\""), "Deep Work\"");
    }

    #[test]
    fn test_url_is_not_a_label() {
        assert_eq!(
            sanitize_generated("https://example.com/notes"),
            "https://example.com/notes"
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_generated(""), "");
        assert_eq!(sanitize_generated("Title:"), "");
    }
}

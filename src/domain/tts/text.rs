use html2text::from_read;
use regex::Regex;
use std::sync::OnceLock;

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("static URL pattern"))
}

fn markup_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[*_`~#>]+").expect("static markup pattern"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("static whitespace pattern"))
}

/// Reduce submitted text to what should actually be spoken.
///
/// Converts HTML to plain text, drops URLs and markdown emphasis markers,
/// and collapses whitespace runs into single spaces.
pub fn clean_text(text: &str) -> String {
    let plain_text = from_read(text.as_bytes(), usize::MAX);
    let without_urls = url_pattern().replace_all(&plain_text, "");
    let without_markup = markup_pattern().replace_all(&without_urls, "");
    let normalized = whitespace_pattern().replace_all(&without_markup, " ");

    normalized.trim().to_string()
}

//! Content normalization for HTML-bearing fields
//!
//! Comment bodies, story text and user "about" fields are served as partial
//! HTML. These helpers strip the origin's presentational debris while keeping
//! the paragraph structure intact.

use regex::Regex;
use std::sync::LazyLock;

// Pre-compiled regex patterns for performance
static DASH_FONT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)">-+</font"#).unwrap());

static FONT_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?font[^<>]*>").unwrap());

static CLOSING_P_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</p>").unwrap());

static OPENING_P_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^<p>").unwrap());

static REPLY_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<div class="reply">.*?</div>"#).unwrap());

static UNDERLINED_REPLY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<u>\s*<a[^>]*href="reply[^"]*"[^>]*>.*?</a>\s*</u>"#).unwrap()
});

static REPLY_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<a[^>]*href="reply[^"]*"[^>]*>.*?</a>"#).unwrap());

static DOMAIN_HINT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(\s?([^()]+)\s?\)").unwrap());

static FNID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"fnid=(\w+)").unwrap());

static ITEM_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"id=(\d+)").unwrap());

/// Normalize an HTML fragment into paragraph-delimited partial markup
///
/// Steps, in order:
/// 1. Drop the invisible dash run the origin appends before a closing `</font>`
/// 2. Remove `<font>` wrappers
/// 3. Remove closing `</p>` tags
/// 4. Make sure the fragment opens with `<p>`
///
/// # Examples
///
/// ```
/// use hnapi::parser::sanitize::clean_content;
///
/// let html = r##"<font color="#000000">First<p>Second</p></font>"##;
/// assert_eq!(clean_content(html), "<p>First<p>Second");
/// ```
pub fn clean_content(html: &str) -> String {
    let html = DASH_FONT_REGEX.replace_all(html.trim(), r#""></font"#);
    let html = FONT_TAG_REGEX.replace_all(&html, "");
    let html = CLOSING_P_REGEX.replace_all(&html, "");
    let html = html.trim();

    if OPENING_P_REGEX.is_match(html) {
        html.to_string()
    } else {
        format!("<p>{html}")
    }
}

/// Remove the "reply" affordance embedded in a comment body
///
/// Handles the three shapes the origin has used: a `div.reply` block, a
/// reply link wrapped in `<u>`, and a bare reply link.
pub fn strip_reply_link(html: &str) -> String {
    let html = REPLY_BLOCK_REGEX.replace_all(html, "");
    let html = UNDERLINED_REPLY_REGEX.replace_all(&html, "");
    REPLY_LINK_REGEX.replace_all(&html, "").into_owned()
}

/// Extract the parenthesized domain hint, e.g. `" (example.com)"`
pub fn domain_hint(text: &str) -> Option<String> {
    DOMAIN_HINT_REGEX
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Continuation token from a `/x?fnid=...` link
pub fn continuation_token(href: &str) -> Option<String> {
    FNID_REGEX
        .captures(href)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Numeric item id from a link, preferring an `id=` parameter over the first
/// digit run.
pub fn item_id_from_url(url: &str) -> Option<u64> {
    ITEM_ID_REGEX
        .captures(url)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .or_else(|| crate::utils::first_digits(url))
}

/// Returns true when the link points back into the item namespace.
pub fn is_item_permalink(url: &str) -> bool {
    url.get(..4)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("item"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content_prepends_paragraph() {
        assert_eq!(clean_content("Hello"), "<p>Hello");
        assert_eq!(clean_content("<p>Hello</p>"), "<p>Hello");
    }

    #[test]
    fn test_clean_content_removes_font_and_dashes() {
        let html = r##"<font color="#000000">Text</font><font size="1"><a href="x">-----</a></font>"##;
        let cleaned = clean_content(html);
        assert!(!cleaned.to_lowercase().contains("font"));
        assert!(cleaned.starts_with("<p>Text"));

        let dashed = r##"<span>ok</span><font color="#f6f6ef">--------</font>"##;
        let cleaned = clean_content(dashed);
        assert!(!cleaned.contains("font"));
    }

    #[test]
    fn test_clean_content_keeps_paragraph_breaks() {
        let cleaned = clean_content("one<p>two</p><p>three</p>");
        assert_eq!(cleaned, "<p>one<p>two<p>three");
    }

    #[test]
    fn test_strip_reply_link_underlined() {
        let html = r#"Nice.<p><font size="1"><u><a href="reply?id=5&amp;goto=item">reply</a></u></font></p>"#;
        let stripped = strip_reply_link(html);
        assert!(!stripped.contains("reply?id"));
        assert!(stripped.starts_with("Nice."));
    }

    #[test]
    fn test_strip_reply_link_bare_and_block() {
        let bare = r#"Text <a href="reply?id=9">reply</a>"#;
        assert_eq!(strip_reply_link(bare).trim(), "Text");

        let block = r#"Text<div class="reply"><p><a href="reply?id=9">reply</a></p></div>"#;
        assert_eq!(strip_reply_link(block), "Text");
    }

    #[test]
    fn test_domain_hint() {
        assert_eq!(domain_hint(" (example.com) "), Some("example.com".to_string()));
        assert_eq!(domain_hint("( github.com/rust-lang )"), Some("github.com/rust-lang".to_string()));
        assert_eq!(domain_hint("no hint"), None);
    }

    #[test]
    fn test_continuation_token() {
        assert_eq!(continuation_token("/x?fnid=Ab3_x9"), Some("Ab3_x9".to_string()));
        assert_eq!(continuation_token("/x?other=1"), None);
    }

    #[test]
    fn test_item_ids() {
        assert_eq!(item_id_from_url("item?id=8863"), Some(8863));
        assert_eq!(item_id_from_url("https://jobs.example.com/posting/7741"), Some(7741));
        assert_eq!(item_id_from_url("https://example.com/"), None);
        assert!(is_item_permalink("item?id=1"));
        assert!(is_item_permalink("ITEM?id=1"));
        assert!(!is_item_permalink("https://example.com/item"));
    }
}

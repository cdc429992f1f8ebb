//! Common utilities and helper functions
//!
//! Small text helpers shared by the extractor and the gateway.

pub mod error;

use regex::Regex;
use std::sync::OnceLock;

/// Returns true when the body contains at least one tag-like marker.
pub fn looks_like_markup(body: &str) -> bool {
    body.contains('<') || body.contains('>')
}

/// Parse a leading integer the way a lenient `parseInt` would: skip leading
/// whitespace, read an optional sign and the digits that follow, ignore the rest.
pub fn leading_int(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    let value: i64 = digits.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Parse a leading decimal number (`parseFloat` semantics).
pub fn leading_float(text: &str) -> Option<f64> {
    static FLOAT_RE: OnceLock<Regex> = OnceLock::new();

    let re = FLOAT_RE
        .get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)").expect("Invalid regex pattern"));

    re.find(text.trim_start())
        .and_then(|m| m.as_str().parse().ok())
}

/// First run of ASCII digits anywhere in the text.
pub fn first_digits(text: &str) -> Option<u64> {
    static DIGITS_RE: OnceLock<Regex> = OnceLock::new();

    let re = DIGITS_RE.get_or_init(|| Regex::new(r"\d+").expect("Invalid regex pattern"));

    re.find(text).and_then(|m| m.as_str().parse().ok())
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

    let re = WHITESPACE_RE.get_or_init(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

    re.replace_all(text.trim(), " ").to_string()
}

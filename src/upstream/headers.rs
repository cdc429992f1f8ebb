//! Request headers sent to the origin

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, USER_AGENT,
};

/// `X-Forwarded-For`
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Default User-Agent for origin requests
pub const DEFAULT_USER_AGENT: &str = concat!("hnapi/", env!("CARGO_PKG_VERSION"));

/// Build the header set for one origin request
///
/// Asks for gzip explicitly; the body is decompressed by the fetcher. The
/// client address, when known, is forwarded so the origin can attribute the
/// request. Values that are not valid header text are skipped.
///
/// # Examples
///
/// ```
/// use hnapi::upstream::headers::{build_origin_headers, X_FORWARDED_FOR};
///
/// let headers = build_origin_headers("hnapi-test", Some("203.0.113.9"));
/// assert_eq!(headers.get(X_FORWARDED_FOR).unwrap(), "203.0.113.9");
/// ```
pub fn build_origin_headers(user_agent: &str, forwarded_for: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();

    let agent = HeaderValue::from_str(user_agent)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_USER_AGENT));
    headers.insert(USER_AGENT, agent);
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    if let Some(value) = forwarded_for.and_then(|ip| HeaderValue::from_str(ip.trim()).ok()) {
        headers.insert(X_FORWARDED_FOR, value);
    }

    headers
}

/// Returns true when the response body is gzip-encoded
pub fn is_gzip(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("gzip"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_headers() {
        let headers = build_origin_headers("hnapi-test", None);

        assert_eq!(headers.get(USER_AGENT).unwrap(), "hnapi-test");
        assert_eq!(headers.get(ACCEPT_ENCODING).unwrap(), "gzip");
        assert!(headers.contains_key(ACCEPT));
        assert!(!headers.contains_key(X_FORWARDED_FOR));
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let headers = build_origin_headers("bad\nagent", Some("bad\nip"));
        assert_eq!(headers.get(USER_AGENT).unwrap(), DEFAULT_USER_AGENT);
        assert!(!headers.contains_key(X_FORWARDED_FOR));
    }

    #[test]
    fn test_is_gzip() {
        let mut headers = HeaderMap::new();
        assert!(!is_gzip(&headers));
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("GZIP"));
        assert!(is_gzip(&headers));
    }
}

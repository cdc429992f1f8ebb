//! Error types for the hnapi gateway
//!
//! Each core component owns one error enum. The unified [`crate::error::Error`]
//! wraps them at the request-serving boundary.

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while fetching from the upstream origin
///
/// `Clone` so a single outcome can be handed to every waiter attached to
/// the same in-flight fetch.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// Transport-level failure (connect, reset, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Http(Arc<reqwest::Error>),

    /// Origin answered with a non-2xx status
    #[error("Upstream returned status {0}")]
    UpstreamStatus(u16),

    /// No response within the fetch bound
    #[error("Upstream request timed out")]
    UpstreamTimeout,

    /// The fetch queue is saturated
    #[error("Fetch queue is full ({0} requests queued)")]
    QueueOverflow(usize),

    /// Content-Encoding or charset decoding failed
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The requested path could not be joined onto the origin URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The dispatcher went away before answering
    #[error("Fetch coordinator is shut down")]
    Shutdown,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::UpstreamTimeout
        } else {
            Self::Http(Arc::new(err))
        }
    }
}

/// Errors that can occur while extracting records from markup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The body does not look like markup at all
    #[error("Not HTML content")]
    NotMarkup,

    /// The continuation token has expired upstream
    #[error("Content expired: {0}")]
    ExpiredContent(String),
}

/// Errors raised by a cache backend
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The remote store could not be reached or failed the command
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A stored value could not be converted to or from its transport form
    #[error("Cache serialization error: {0}")]
    Serialization(String),

    /// The backend settings are unusable (bad URL, empty server list)
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<memcache::MemcacheError> for CacheError {
    fn from(err: memcache::MemcacheError) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_is_clone() {
        let err = FetchError::UpstreamStatus(503);
        let copy = err.clone();
        assert_eq!(copy.to_string(), "Upstream returned status 503");
    }

    #[test]
    fn test_extract_error_messages() {
        assert_eq!(ExtractError::NotMarkup.to_string(), "Not HTML content");
        let expired = ExtractError::ExpiredContent("Unknown or expired link.".into());
        assert!(expired.to_string().contains("expired"));
    }

    #[test]
    fn test_cache_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}

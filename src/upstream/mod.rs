//! Upstream origin access
//!
//! [`FetchCoordinator`] is the only component that talks to the origin. It
//! paces dispatches, coalesces concurrent requests for the same path and
//! decodes bodies before handing them back.

pub mod fetcher;
pub mod headers;

pub use fetcher::{FetchContext, FetchCoordinator, Origin};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upstream origin configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin base URL
    pub base_url: String,

    /// Minimum spacing between two dispatches, in milliseconds
    pub pacing_interval_ms: u64,

    /// Fetches allowed to wait behind the one in flight
    pub max_queued: usize,

    /// Bound on a single fetch, in seconds
    pub request_timeout_secs: u64,

    /// User-Agent sent to the origin
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://news.ycombinator.com".to_string(),
            pacing_interval_ms: 1000,
            max_queued: 1000,
            request_timeout_secs: 10,
            user_agent: headers::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl UpstreamConfig {
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

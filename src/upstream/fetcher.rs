//! Single-flight, paced fetcher for the origin
//!
//! This module provides the fetch coordinator with features including:
//! - Single-flight: concurrent requests for one path share one origin request
//! - Pacing with governor: one request in flight, dispatches spaced by a
//!   fixed interval, FIFO by arrival
//! - Bounded queue: requests beyond the queue depth are rejected
//! - Per-fetch timeout that clears the in-flight record
//! - gzip and charset decoding of response bodies

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use flate2::read::GzDecoder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header::CONTENT_TYPE, Client};
use std::collections::HashMap;
use std::io::Read;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use url::Url;

use super::headers::{build_origin_headers, is_gzip};
use super::UpstreamConfig;
use crate::metrics;
use crate::utils::error::FetchError;

type FetchResult = Result<String, FetchError>;

/// Caller attribution forwarded to the origin
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchContext {
    /// Originating client address, sent as `X-Forwarded-For`
    pub client_ip: Option<String>,
}

impl FetchContext {
    pub fn for_client(ip: impl Into<String>) -> Self {
        Self {
            client_ip: Some(ip.into()),
        }
    }
}

/// Source of raw page bodies
///
/// The request-serving path depends on this seam rather than on the
/// coordinator directly, so it can run against a stub origin.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch `path` (e.g. `/item?id=1`) and return the decoded body
    async fn fetch(&self, path: &str, context: &FetchContext) -> FetchResult;
}

/// One outstanding origin request and everyone waiting on it
struct InFlightFetch {
    started_at: Instant,
    waiters: Vec<oneshot::Sender<FetchResult>>,
}

/// A dispatch slot in the queue
struct Job {
    path: String,
    context: FetchContext,
}

/// State shared between callers and the dispatcher task
struct Shared {
    client: Client,
    base_url: Url,
    user_agent: String,
    request_timeout: Duration,
    rate_limiter: Option<DefaultDirectRateLimiter>,
    in_flight: Mutex<HashMap<String, InFlightFetch>>,
}

/// Paced, deduplicating fetcher for one origin
pub struct FetchCoordinator {
    shared: Arc<Shared>,
    jobs: mpsc::Sender<Job>,
    max_queued: usize,
}

impl FetchCoordinator {
    /// Create a coordinator and start its dispatcher task
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for an unusable base URL and
    /// `FetchError::Http` if the HTTP client cannot be created
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        // One dispatch per pacing interval, no bursts
        let rate_limiter = Quota::with_period(config.pacing_interval())
            .map(|quota| quota.allow_burst(NonZeroU32::MIN))
            .map(RateLimiter::direct);

        let shared = Arc::new(Shared {
            client,
            base_url,
            user_agent: config.user_agent.clone(),
            request_timeout: config.request_timeout(),
            rate_limiter,
            in_flight: Mutex::new(HashMap::new()),
        });

        let max_queued = config.max_queued.max(1);
        let (jobs, queue) = mpsc::channel(max_queued);
        tokio::spawn(dispatch(Arc::clone(&shared), queue));

        tracing::info!(
            base_url = %config.base_url,
            pacing_ms = config.pacing_interval_ms,
            max_queued,
            "Fetch coordinator started"
        );

        Ok(Self {
            shared,
            jobs,
            max_queued,
        })
    }

    /// Coordinator against a different origin, for mock servers in tests
    ///
    /// # Errors
    ///
    /// Same as [`FetchCoordinator::new`]
    pub fn with_base_url(base_url: &str, pacing_interval: Duration) -> Result<Self, FetchError> {
        let config = UpstreamConfig {
            base_url: base_url.to_string(),
            pacing_interval_ms: u64::try_from(pacing_interval.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        };
        Self::new(&config)
    }

    /// Fetch `path`, joining an in-flight request for the same path if any
    ///
    /// # Errors
    ///
    /// - `FetchError::QueueOverflow` when the queue is full
    /// - `FetchError::UpstreamStatus` for a non-2xx answer
    /// - `FetchError::UpstreamTimeout` when no response arrived in time
    /// - `FetchError::Decode` when the body cannot be decompressed or decoded
    /// - `FetchError::Http` for transport failures
    pub async fn fetch(&self, path: &str, context: &FetchContext) -> FetchResult {
        let (tx, rx) = oneshot::channel();

        {
            let mut in_flight = self
                .shared
                .in_flight
                .lock()
                .map_err(|_| FetchError::Shutdown)?;

            if let Some(existing) = in_flight.get_mut(path) {
                tracing::debug!(
                    path = %path,
                    age_ms = existing.started_at.elapsed().as_millis() as u64,
                    waiters = existing.waiters.len() + 1,
                    "Joining in-flight fetch"
                );
                existing.waiters.push(tx);
                metrics::record_single_flight_join();
            } else {
                let job = Job {
                    path: path.to_string(),
                    context: context.clone(),
                };
                match self.jobs.try_send(job) {
                    Ok(()) => {
                        in_flight.insert(
                            path.to_string(),
                            InFlightFetch {
                                started_at: Instant::now(),
                                waiters: vec![tx],
                            },
                        );
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::error!(path = %path, max_queued = self.max_queued, "Fetch queue is full");
                        metrics::record_queue_rejection();
                        return Err(FetchError::QueueOverflow(self.max_queued));
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        return Err(FetchError::Shutdown);
                    }
                }
            }
        }

        rx.await.unwrap_or(Err(FetchError::Shutdown))
    }

    /// Number of distinct paths currently queued or in flight
    pub fn in_flight(&self) -> usize {
        self.shared
            .in_flight
            .lock()
            .map(|table| table.len())
            .unwrap_or(0)
    }

    pub fn max_queued(&self) -> usize {
        self.max_queued
    }
}

#[async_trait]
impl Origin for FetchCoordinator {
    async fn fetch(&self, path: &str, context: &FetchContext) -> FetchResult {
        FetchCoordinator::fetch(self, path, context).await
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Drain the queue one job at a time, paced by the rate limiter
///
/// Ends when every sender is gone, i.e. when the coordinator is dropped.
async fn dispatch(shared: Arc<Shared>, mut queue: mpsc::Receiver<Job>) {
    while let Some(job) = queue.recv().await {
        if let Some(limiter) = &shared.rate_limiter {
            limiter.until_ready().await;
        }

        let result = shared.perform(&job).await;
        shared.complete(&job.path, result);
    }

    tracing::debug!("Fetch dispatcher stopped");
}

impl Shared {
    /// Issue the origin request for one job, bounded by the request timeout
    async fn perform(&self, job: &Job) -> FetchResult {
        let url = self
            .base_url
            .join(&job.path)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {e}", job.path)))?;

        tracing::info!(path = %job.path, "Fetching upstream");
        let started = Instant::now();

        let outcome = tokio::time::timeout(self.request_timeout, self.request(url, &job.context))
            .await
            .unwrap_or(Err(FetchError::UpstreamTimeout));

        let elapsed = started.elapsed();
        match &outcome {
            Ok((_, gzip)) => tracing::info!(
                path = %job.path,
                elapsed_ms = elapsed.as_millis() as u64,
                gzip = *gzip,
                "Fetch duration"
            ),
            Err(e) => tracing::warn!(
                path = %job.path,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Upstream fetch failed"
            ),
        }
        metrics::record_upstream_fetch(outcome_label(&outcome), elapsed.as_secs_f64());

        outcome.map(|(body, _)| body)
    }

    async fn request(&self, url: Url, context: &FetchContext) -> Result<(String, bool), FetchError> {
        let headers = build_origin_headers(&self.user_agent, context.client_ip.as_deref());
        let response = self.client.get(url).headers(headers).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus(status.as_u16()));
        }

        let gzip = is_gzip(response.headers());
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;
        let body = if gzip { gunzip(&bytes)? } else { bytes.to_vec() };

        decode_body(&body, &content_type).map(|text| (text, gzip))
    }

    /// Remove the in-flight record and answer every waiter in attach order
    fn complete(&self, path: &str, result: FetchResult) {
        let entry = match self.in_flight.lock() {
            Ok(mut table) => table.remove(path),
            Err(_) => None,
        };

        let Some(entry) = entry else {
            return;
        };

        for waiter in entry.waiters {
            // A waiter that gave up is not an error
            let _ = waiter.send(result.clone());
        }
    }
}

fn outcome_label(outcome: &Result<(String, bool), FetchError>) -> &'static str {
    match outcome {
        Ok(_) => "ok",
        Err(FetchError::UpstreamStatus(_)) => "status",
        Err(FetchError::UpstreamTimeout) => "timeout",
        Err(FetchError::Decode(_)) => "decode",
        Err(_) => "transport",
    }
}

// ============================================================================
// Body decoding
// ============================================================================

/// Decompress a gzip body
///
/// # Errors
///
/// Returns `FetchError::Decode` if the stream is not valid gzip
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, FetchError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FetchError::Decode(format!("gzip: {e}")))?;
    Ok(out)
}

/// Decode a body to text
///
/// Uses the `charset` of the Content-Type when present, otherwise UTF-8,
/// otherwise a `<meta charset>` found near the top of the document.
///
/// # Errors
///
/// Returns `FetchError::Decode` when no strategy yields clean text
pub fn decode_body(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
    if let Some(encoding) = charset_of(content_type).and_then(Encoding::for_label) {
        return decode_with(encoding, bytes);
    }

    if let Ok(text) = decode_with(UTF_8, bytes) {
        return Ok(text);
    }

    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]).to_lowercase();
    if let Some(encoding) = meta_charset(&head).and_then(Encoding::for_label) {
        return decode_with(encoding, bytes);
    }

    Err(FetchError::Decode(
        "Body is not valid UTF-8 and declares no charset".to_string(),
    ))
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, FetchError> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::Decode(format!("{} decoding errors", encoding.name())));
    }
    Ok(text.into_owned())
}

fn charset_of(content_type: &str) -> Option<&[u8]> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').as_bytes())
}

fn meta_charset(head: &str) -> Option<&[u8]> {
    let start = head.find("charset=")? + "charset=".len();
    let rest = head[start..].trim_start_matches(['"', '\'']);
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(rest.len());
    Some(rest[..end].as_bytes()).filter(|label| !label.is_empty())
}

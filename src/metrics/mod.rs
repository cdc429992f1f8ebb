//! Prometheus metrics for the hnapi gateway
//!
//! This module tracks:
//! - Tiered cache: hits per level, misses, backend errors
//! - Fetch coordinator: upstream fetches by outcome, single-flight joins,
//!   queue rejections, fetch duration
//! - Serving path: error responses by kind
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram, Counter, CounterVec, Encoder,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all gateway metrics
struct GatewayMetrics {
    cache_hits: CounterVec,
    cache_misses: Counter,
    cache_errors: Counter,
    upstream_fetches: CounterVec,
    upstream_duration: Histogram,
    single_flight_joins: Counter,
    queue_rejections: Counter,
    response_errors: CounterVec,
}

/// Global storage for gateway metrics
static GATEWAY_METRICS: OnceLock<GatewayMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// Safe to call more than once; only the first call registers anything.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = hnapi::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = GatewayMetrics {
        cache_hits: register_counter_vec!(
            "hnapi_cache_hits_total",
            "Cache hits by level",
            &["level"]
        )?,
        cache_misses: register_counter!(
            "hnapi_cache_misses_total",
            "Lookups that missed every cache level"
        )?,
        cache_errors: register_counter!(
            "hnapi_cache_backend_errors_total",
            "Remote cache backend failures"
        )?,
        upstream_fetches: register_counter_vec!(
            "hnapi_upstream_fetches_total",
            "Upstream fetches by outcome",
            &["outcome"]
        )?,
        upstream_duration: register_histogram!(
            "hnapi_upstream_fetch_duration_seconds",
            "Upstream fetch duration in seconds",
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]
        )?,
        single_flight_joins: register_counter!(
            "hnapi_single_flight_joins_total",
            "Requests that attached to an in-flight fetch"
        )?,
        queue_rejections: register_counter!(
            "hnapi_fetch_queue_rejections_total",
            "Fetches rejected because the queue was full"
        )?,
        response_errors: register_counter_vec!(
            "hnapi_response_errors_total",
            "Error responses by kind",
            &["kind"]
        )?,
    };

    GATEWAY_METRICS
        .set(metrics)
        .map_err(|_| "Gateway metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    GATEWAY_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record a cache hit at `level` (`memory` or `remote`)
pub fn record_cache_hit(level: &str) {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.cache_hits.with_label_values(&[level]).inc();
    }
}

pub fn record_cache_miss() {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.cache_misses.inc();
    }
}

pub fn record_cache_error() {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.cache_errors.inc();
    }
}

/// Record a finished upstream fetch
pub fn record_upstream_fetch(outcome: &str, duration_secs: f64) {
    let Some(m) = GATEWAY_METRICS.get() else {
        return;
    };

    m.upstream_fetches.with_label_values(&[outcome]).inc();
    m.upstream_duration.observe(duration_secs);
}

pub fn record_single_flight_join() {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.single_flight_joins.inc();
    }
}

pub fn record_queue_rejection() {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.queue_rejections.inc();
    }
}

/// Record an error response by its error kind
pub fn record_response_error(kind: &str) {
    if let Some(m) = GATEWAY_METRICS.get() {
        m.response_errors.with_label_values(&[kind]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================

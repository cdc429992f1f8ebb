//! REST API handlers for the gateway server
//!
//! This module defines the routes, the JSON/JSONP response shape, the
//! error-to-status mapping and the edge middleware.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, GatewayErrorTrait};
use crate::metrics;
use crate::models::ListingKind;
use crate::upstream::headers::X_FORWARDED_FOR;
use crate::upstream::FetchContext;
use crate::utils::error::{ExtractError, FetchError};

use super::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Error envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

/// Service description served at `/`
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_url: Option<&'static str>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub started_at: String,
    pub cache: CacheHealth,
}

#[derive(Debug, Serialize)]
pub struct CacheHealth {
    pub memory: bool,
    pub remote: bool,
    pub degraded: bool,
}

/// Query accepted by every resource route
#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    /// 1-based listing page
    pub page: Option<u32>,
    /// JSONP callback name
    pub callback: Option<String>,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(index))
        .route("/favicon.ico", get(favicon))
        .route("/robots.txt", get(robots))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/item/{id}", get(get_item))
        .route("/comments/{token}", get(get_comments))
        .route("/newcomments", get(get_new_comments))
        .route("/user/{id}", get(get_user));

    for kind in ListingKind::ALL {
        router = router.route(
            &format!("/{}", kind.as_str()),
            get(
                move |State(state): State<AppState>,
                      Extension(context): Extension<FetchContext>,
                      Query(query): Query<ResourceQuery>| async move {
                    get_listing(state, kind, context, query).await
                },
            ),
        );
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), edge))
        .with_state(state)
}

// ============================================================================
// Edge Middleware
// ============================================================================

/// Attach caller attribution, enforce the response timeout and set
/// `Cache-Control`
async fn edge(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let context = FetchContext {
        client_ip: client_ip(request.headers()).or(peer),
    };
    request.extensions_mut().insert(context);

    let uri = request.uri().clone();
    let mut response =
        match tokio::time::timeout(state.config.response_timeout(), next.run(request)).await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!(uri = %uri, "Server timeout");
                metrics::record_response_error("response_timeout");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    Json(ErrorResponse::new("Server timeout")),
                )
                    .into_response()
            }
        };

    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", state.cache_max_age)) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// First entry of `X-Forwarded-For`
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Responses
// ============================================================================

/// HTTP status for a gateway error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Extract(ExtractError::NotMarkup) => StatusCode::BAD_GATEWAY,
        Error::Extract(ExtractError::ExpiredContent(_)) => StatusCode::GONE,
        Error::Fetch(FetchError::UpstreamStatus(_)) => StatusCode::BAD_GATEWAY,
        Error::Fetch(FetchError::UpstreamTimeout) => StatusCode::GATEWAY_TIMEOUT,
        Error::Fetch(FetchError::QueueOverflow(_)) => StatusCode::SERVICE_UNAVAILABLE,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSONP callback names must be plain (dotted) identifiers
pub fn is_valid_callback(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
        && name.len() <= 128
}

/// Serialize `value` as JSON, or as a JSONP call when a callback is given
fn render<T: Serialize>(status: StatusCode, value: &T, callback: Option<&str>) -> Response {
    let Some(callback) = callback else {
        return (status, Json(value)).into_response();
    };

    if !is_valid_callback(callback) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid callback name")),
        )
            .into_response();
    }

    match serde_json::to_string(value) {
        Ok(json) => (
            status,
            [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
            format!("/**/ typeof {callback} === 'function' && {callback}({json});"),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

/// Render a gateway result, logging and escalating errors
fn respond<T: Serialize>(state: &AppState, result: crate::Result<T>, callback: Option<&str>) -> Response {
    match result {
        Ok(value) => render(StatusCode::OK, &value, callback),
        Err(err) => {
            let status = status_for(&err);
            metrics::record_response_error(err.kind());

            if err.is_severe() {
                tracing::error!(error = %err, kind = err.kind(), "Severe upstream error");
                if state.config.exit_on_severe_error {
                    state.shutdown.notify_one();
                }
            } else if status.is_server_error() {
                tracing::warn!(error = %err, kind = err.kind(), "Request failed");
            } else {
                tracing::debug!(error = %err, kind = err.kind(), "Request rejected");
            }

            render(status, &ErrorResponse::new(err.to_string()), callback)
        }
    }
}

// ============================================================================
// Static Handlers
// ============================================================================

async fn index() -> impl IntoResponse {
    let repository = env!("CARGO_PKG_REPOSITORY");
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        version: env!("CARGO_PKG_VERSION"),
        project_url: (!repository.is_empty()).then_some(repository),
    })
}

async fn favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn robots() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "User-agent: *\nDisallow: /",
    )
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let cache = state.gateway.cache();
    Json(HealthResponse {
        status: if cache.is_degraded() { "degraded" } else { "healthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        started_at: state.started_at.to_rfc3339(),
        cache: CacheHealth {
            memory: cache.memory_enabled(),
            remote: cache.has_remote(),
            degraded: cache.is_degraded(),
        },
    })
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Resource Handlers
// ============================================================================

async fn get_listing(
    state: AppState,
    kind: ListingKind,
    context: FetchContext,
    query: ResourceQuery,
) -> Response {
    let page = query.page.unwrap_or(1);
    let result = state.gateway.listing(kind, page, &context).await;
    respond(&state, result, query.callback.as_deref())
}

async fn get_item(
    State(state): State<AppState>,
    Extension(context): Extension<FetchContext>,
    Path(id): Path<u64>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let result = state.gateway.post(id, &context).await;
    respond(&state, result, query.callback.as_deref())
}

async fn get_comments(
    State(state): State<AppState>,
    Extension(context): Extension<FetchContext>,
    Path(token): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let result = state.gateway.comments(&token, &context).await;
    respond(&state, result, query.callback.as_deref())
}

async fn get_new_comments(
    State(state): State<AppState>,
    Extension(context): Extension<FetchContext>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let result = state.gateway.new_comments(&context).await;
    respond(&state, result, query.callback.as_deref())
}

async fn get_user(
    State(state): State<AppState>,
    Extension(context): Extension<FetchContext>,
    Path(id): Path<String>,
    Query(query): Query<ResourceQuery>,
) -> Response {
    let result = state.gateway.user(&id, &context).await;
    respond(&state, result, query.callback.as_deref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&ExtractError::NotMarkup.into()), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&ExtractError::ExpiredContent("expired".into()).into()),
            StatusCode::GONE
        );
        assert_eq!(
            status_for(&FetchError::UpstreamStatus(503).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&FetchError::UpstreamTimeout.into()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&FetchError::QueueOverflow(1000).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_for(&Error::not_found("No such user.")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::config("bad")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_callback_validation() {
        assert!(is_valid_callback("handle"));
        assert!(is_valid_callback("jQuery_123.cb"));
        assert!(is_valid_callback("$cb"));
        assert!(!is_valid_callback("1abc"));
        assert!(!is_valid_callback("alert(1)"));
        assert!(!is_valid_callback(""));
    }

    #[test]
    fn test_client_ip_takes_first_forwarded_entry() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);

        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_error_envelope_shape() {
        let value = serde_json::to_value(ErrorResponse::new("No such user.")).unwrap();
        assert_eq!(value, serde_json::json!({"error": "No such user."}));
    }
}

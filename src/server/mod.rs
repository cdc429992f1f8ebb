//! HTTP server for the gateway
//!
//! This module wires the [`Gateway`] into an axum router with CORS,
//! compression, request tracing, `Cache-Control` headers and a per-request
//! response timeout.

pub mod api;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{Config, ServerConfig};
use crate::gateway::Gateway;

pub use api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Read-through gateway
    pub gateway: Gateway,

    /// Server configuration
    pub config: ServerConfig,

    /// `Cache-Control` max-age in seconds
    pub cache_max_age: u64,

    /// Server start time
    pub start_time: Instant,

    /// Wall-clock start, reported by `/health`
    pub started_at: DateTime<Utc>,

    /// Raised when a severe error asks for a restart
    pub shutdown: Arc<Notify>,
}

impl AppState {
    pub fn new(gateway: Gateway, config: &Config) -> Self {
        Self {
            gateway,
            config: config.server.clone(),
            cache_max_age: config.cache_control_max_age(),
            start_time: Instant::now(),
            started_at: Utc::now(),
            shutdown: Arc::new(Notify::new()),
        }
    }
}

// ============================================================================
// Gateway Server
// ============================================================================

/// HTTP front of the gateway
pub struct GatewayServer {
    config: Config,
    state: AppState,
}

impl GatewayServer {
    /// Create a server around a ready gateway
    pub fn new(gateway: Gateway, config: Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let state = AppState::new(gateway, &config);
        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes and layers
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        if self.config.server.enable_compression {
            router = router.layer(CompressionLayer::new());
        }

        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until `shutdown_signal`
    /// resolves or a severe error requests a restart
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.server.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::BindError(format!("{addr}: {e}")))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener
    ///
    /// Returns `ServerError::SevereShutdown` when the server stopped because a
    /// severe upstream error was raised with `exit_on_severe_error` set.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        tracing::info!(addr = %local, "Starting hnapi server");

        self.start_background_tasks();

        let restart = Arc::clone(&self.state.shutdown);
        let severe = Arc::new(AtomicBool::new(false));
        let raised = Arc::clone(&severe);
        let shutdown = async move {
            tokio::select! {
                () = shutdown_signal => {}
                () = restart.notified() => {
                    tracing::error!("Severe upstream error, shutting down for restart");
                    raised.store(true, Ordering::SeqCst);
                }
            }
        };

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| ServerError::ServeError(e.to_string()))?;

        tracing::info!("hnapi server shutdown complete");
        if severe.load(Ordering::SeqCst) {
            return Err(ServerError::SevereShutdown);
        }
        Ok(())
    }

    /// Start cache maintenance (expiry sweep, remote health probe)
    fn start_background_tasks(&self) {
        let cache = &self.config.cache;
        self.state.gateway.cache().spawn_maintenance(
            std::time::Duration::from_secs(cache.sweep_interval_secs),
            std::time::Duration::from_secs(cache.health_interval_secs),
        );

        tracing::info!("Background tasks started");
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.server.bind_address(),
            upstream: self.config.upstream.base_url.clone(),
            cache_store: format!("{:?}", self.config.cache.store).to_lowercase(),
            cors_enabled: self.config.server.enable_cors,
            compression_enabled: self.config.server.enable_compression,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: String,
    pub upstream: String,
    pub cache_store: String,
    pub cors_enabled: bool,
    pub compression_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "hnapi Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Upstream: {}\n\
             Cache Store: {}\n\
             CORS: {}\n\
             Compression: {}",
            "",
            self.bind_address,
            self.upstream,
            self.cache_store,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.compression_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),

    /// Stopped on a severe upstream error so a supervisor can restart it
    SevereShutdown,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            Self::BindError(msg) => write!(f, "Failed to bind: {msg}"),
            Self::ServeError(msg) => write!(f, "Server error: {msg}"),
            Self::SevereShutdown => write!(f, "Stopped after a severe upstream error"),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TieredCache;
    use crate::upstream::{FetchContext, Origin};
    use crate::utils::error::FetchError;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoOrigin;

    #[async_trait]
    impl Origin for NoOrigin {
        async fn fetch(&self, _path: &str, _context: &FetchContext) -> Result<String, FetchError> {
            Err(FetchError::Shutdown)
        }
    }

    fn gateway(config: &Config) -> Gateway {
        Gateway::new(
            Arc::new(NoOrigin),
            TieredCache::memory_only(Duration::from_secs(60)),
            &config.parser,
        )
    }

    #[test]
    fn test_server_info() {
        let config = Config::default();
        let server = GatewayServer::new(gateway(&config), config).unwrap();
        let info = server.info();

        assert_eq!(info.bind_address, "0.0.0.0:8080");
        assert_eq!(info.cache_store, "none");
        assert!(info.cors_enabled);
        assert!(info.display().contains("news.ycombinator.com"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.parser.page_size = 0;
        let result = GatewayServer::new(gateway(&config), config);
        assert!(matches!(result, Err(ServerError::ConfigError(_))));
    }

    #[test]
    fn test_state_uses_cache_ttl_for_max_age() {
        let mut config = Config::default();
        config.cache.ttl_secs = 90;
        let state = AppState::new(gateway(&config), &config);
        assert_eq!(state.cache_max_age, 90);
    }
}

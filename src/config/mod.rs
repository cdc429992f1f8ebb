//! Configuration management for the hnapi gateway
//!
//! This module handles loading and validating configuration from environment variables,
//! files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cache::{CacheConfig, StoreKind};
use crate::parser::DEFAULT_INDENT_UNIT;
use crate::upstream::UpstreamConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Origin access configuration
    pub upstream: UpstreamConfig,

    /// Tiered cache configuration
    pub cache: CacheConfig,

    /// Extraction and pagination configuration
    pub parser: ParserConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Enable CORS for any origin
    pub enable_cors: bool,

    /// Enable gzip response compression
    pub enable_compression: bool,

    /// Per-request response timeout in seconds
    pub response_timeout_secs: u64,

    /// `Cache-Control` max-age in seconds; defaults to the cache TTL
    pub cache_control_max_age: Option<u64>,

    /// Shut down on queue overflow or upstream timeout so a supervisor restarts us
    pub exit_on_severe_error: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            enable_compression: true,
            response_timeout_secs: 25,
            cache_control_max_age: None,
            exit_on_severe_error: false,
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_secs(self.response_timeout_secs)
    }
}

/// Extraction and pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Spacer width of one comment nesting level
    pub indent_unit: u32,

    /// Entries per served listing page
    pub page_size: usize,

    /// Entries per page on the origin's own listings
    pub upstream_page_size: usize,

    /// Highest listing page served
    pub max_page: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            indent_unit: DEFAULT_INDENT_UNIT,
            page_size: 30,
            upstream_page_size: 30,
            max_page: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Read and parse one `HNAPI_*` variable, keeping `default` when unset or malformed
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let server = ServerConfig {
            host: std::env::var("HNAPI_HOST").unwrap_or(defaults.server.host),
            port: env_or("HNAPI_PORT", defaults.server.port),
            enable_cors: env_or("HNAPI_ENABLE_CORS", defaults.server.enable_cors),
            enable_compression: env_or(
                "HNAPI_ENABLE_COMPRESSION",
                defaults.server.enable_compression,
            ),
            response_timeout_secs: env_or(
                "HNAPI_RESPONSE_TIMEOUT",
                defaults.server.response_timeout_secs,
            ),
            cache_control_max_age: std::env::var("HNAPI_CACHE_CONTROL_MAX_AGE")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            exit_on_severe_error: env_or(
                "HNAPI_EXIT_ON_SEVERE_ERROR",
                defaults.server.exit_on_severe_error,
            ),
        };

        let upstream = UpstreamConfig {
            base_url: std::env::var("HNAPI_UPSTREAM_URL").unwrap_or(defaults.upstream.base_url),
            pacing_interval_ms: env_or(
                "HNAPI_PACING_INTERVAL_MS",
                defaults.upstream.pacing_interval_ms,
            ),
            max_queued: env_or("HNAPI_MAX_QUEUED", defaults.upstream.max_queued),
            request_timeout_secs: env_or(
                "HNAPI_REQUEST_TIMEOUT",
                defaults.upstream.request_timeout_secs,
            ),
            user_agent: std::env::var("HNAPI_USER_AGENT").unwrap_or(defaults.upstream.user_agent),
        };

        let store = match std::env::var("HNAPI_CACHE_STORE") {
            Ok(value) => value
                .parse::<StoreKind>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Invalid HNAPI_CACHE_STORE")?,
            Err(_) => defaults.cache.store,
        };

        let cache = CacheConfig {
            store,
            redis_url: std::env::var("REDIS_URL")
                .or_else(|_| std::env::var("HNAPI_REDIS_URL"))
                .unwrap_or(defaults.cache.redis_url),
            memcached_servers: std::env::var("HNAPI_MEMCACHED_SERVERS")
                .unwrap_or(defaults.cache.memcached_servers),
            pool_size: env_or("HNAPI_REDIS_POOL_SIZE", defaults.cache.pool_size),
            memory_enabled: std::env::var("HNAPI_MEMORY_CACHE")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
            ttl_secs: env_or("HNAPI_CACHE_TTL", defaults.cache.ttl_secs),
            key_prefix: std::env::var("HNAPI_CACHE_PREFIX").unwrap_or(defaults.cache.key_prefix),
            sweep_interval_secs: env_or(
                "HNAPI_CACHE_SWEEP_INTERVAL",
                defaults.cache.sweep_interval_secs,
            ),
            health_interval_secs: env_or(
                "HNAPI_CACHE_HEALTH_INTERVAL",
                defaults.cache.health_interval_secs,
            ),
        };

        let parser = ParserConfig {
            indent_unit: env_or("HNAPI_INDENT_UNIT", defaults.parser.indent_unit),
            page_size: env_or("HNAPI_PAGE_SIZE", defaults.parser.page_size),
            upstream_page_size: env_or(
                "HNAPI_UPSTREAM_PAGE_SIZE",
                defaults.parser.upstream_page_size,
            ),
            max_page: env_or("HNAPI_MAX_PAGE", defaults.parser.max_page),
        };

        let logging = LoggingConfig {
            level: std::env::var("HNAPI_LOG_LEVEL").unwrap_or(defaults.logging.level),
            format: std::env::var("HNAPI_LOG_FORMAT").unwrap_or(defaults.logging.format),
        };

        Ok(Self {
            server,
            upstream,
            cache,
            parser,
            logging,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.server.response_timeout_secs == 0 {
            anyhow::bail!("response_timeout_secs must be greater than 0");
        }

        url::Url::parse(&self.upstream.base_url)
            .with_context(|| format!("Invalid upstream base_url: {}", self.upstream.base_url))?;

        if self.upstream.max_queued == 0 {
            anyhow::bail!("max_queued must be greater than 0");
        }

        if self.upstream.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than 0");
        }

        if self.cache.ttl_secs == 0 {
            anyhow::bail!("cache ttl_secs must be greater than 0");
        }

        match self.cache.store {
            StoreKind::Redis => {
                if self.cache.pool_size == 0 {
                    anyhow::bail!("pool_size must be greater than 0");
                }
                let redis_url = url::Url::parse(&self.cache.redis_url)
                    .with_context(|| format!("Invalid redis_url: {}", self.cache.redis_url))?;
                if !matches!(redis_url.scheme(), "redis" | "rediss" | "redis+unix" | "unix") {
                    anyhow::bail!("redis_url must use a redis:// scheme");
                }
            }
            StoreKind::Memcached => {
                crate::cache::memcached::parse_servers(&self.cache.memcached_servers)
                    .context("Invalid memcached_servers")?;
            }
            StoreKind::None => {}
        }

        if self.parser.indent_unit == 0 {
            anyhow::bail!("indent_unit must be greater than 0");
        }

        if self.parser.page_size == 0
            || self.parser.upstream_page_size == 0
            || self.parser.max_page == 0
        {
            anyhow::bail!("page_size, upstream_page_size and max_page must be greater than 0");
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            anyhow::bail!("log format must be 'text' or 'json'");
        }

        Ok(())
    }

    /// `Cache-Control` max-age served with every response
    #[must_use]
    pub fn cache_control_max_age(&self) -> u64 {
        self.server
            .cache_control_max_age
            .unwrap_or(self.cache.ttl_secs)
    }
}

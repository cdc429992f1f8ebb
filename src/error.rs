//! Unified error handling for the hnapi crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`GatewayErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use hnapi::error::{Error, GatewayErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_severe() {
//!         tracing::error!(error = %err, "Origin is overwhelmed");
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::utils::error::{CacheError, ExtractError, FetchError};

/// Common trait for all hnapi error types
pub trait GatewayErrorTrait: std::error::Error {
    /// Check if a fresh request could succeed where this one failed
    fn is_recoverable(&self) -> bool;

    /// Conditions that warrant operator escalation (restart signal)
    fn is_severe(&self) -> bool {
        false
    }

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Origin transport, status, pacing and timeout errors
    Network,
    /// Markup extraction errors
    Parsing,
    /// Cache backend errors
    Cache,
    /// Configuration and validation errors
    Config,
    /// The requested entity does not exist
    NotFound,
    /// Other/unknown errors
    Other,
}

impl GatewayErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_) | Self::Shutdown)
    }

    fn is_severe(&self) -> bool {
        matches!(self, Self::QueueOverflow(_) | Self::UpstreamTimeout)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl GatewayErrorTrait for ExtractError {
    fn is_recoverable(&self) -> bool {
        // The origin may answer with a proper page next time
        matches!(self, Self::NotMarkup)
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl GatewayErrorTrait for CacheError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Backend(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Cache,
        }
    }
}

/// Unified error type for the hnapi crate
#[derive(Error, Debug)]
pub enum Error {
    /// Upstream fetch errors
    #[error("{0}")]
    Fetch(#[from] FetchError),

    /// Markup extraction errors
    #[error("{0}")]
    Extract(#[from] ExtractError),

    /// Cache backend errors
    #[error("{0}")]
    Cache(#[from] CacheError),

    /// The origin answered, but the entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GatewayErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Extract(e) => e.is_recoverable(),
            Self::Cache(e) => e.is_recoverable(),
            Self::NotFound(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn is_severe(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_severe(),
            _ => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(_) => ErrorCategory::Network,
            Self::Extract(_) | Self::Json(_) => ErrorCategory::Parsing,
            Self::Cache(e) => e.category(),
            Self::NotFound(_) => ErrorCategory::NotFound,
            Self::Config(_) => ErrorCategory::Config,
            Self::Io(_) | Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Stable, machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::UpstreamStatus(_)) => "upstream_status",
            Self::Fetch(FetchError::UpstreamTimeout) => "upstream_timeout",
            Self::Fetch(FetchError::QueueOverflow(_)) => "queue_overflow",
            Self::Fetch(FetchError::Decode(_)) => "decode",
            Self::Fetch(_) => "upstream",
            Self::Extract(ExtractError::NotMarkup) => "not_markup",
            Self::Extract(ExtractError::ExpiredContent(_)) => "expired_content",
            Self::Cache(CacheError::InvalidConfig(_)) => "config",
            Self::Cache(_) => "cache_backend",
            Self::NotFound(_) => "not_found",
            Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Other { .. } => "internal",
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

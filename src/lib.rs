//! hnapi - Hacker News JSON gateway
//!
//! A read-through API gateway that turns the Hacker News web pages into
//! normalized JSON resources while shielding the origin from request storms.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`upstream`] - Single-flight, paced fetching from the origin
//! - [`parser`] - HTML extraction into typed records
//! - [`cache`] - Tiered cache (memory over optional Redis)
//! - [`gateway`] - Read-through orchestration of the three above
//! - [`server`] - axum HTTP surface
//! - [`models`] - Core data structures and types
//! - [`metrics`] - Prometheus counters
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use hnapi::cache::CacheHooks;
//! use hnapi::config::Config;
//! use hnapi::gateway::Gateway;
//! use hnapi::models::ListingKind;
//! use hnapi::upstream::FetchContext;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let gateway = Gateway::from_config(&config, CacheHooks::default()).await?;
//!     let stories = gateway
//!         .listing(ListingKind::News, 1, &FetchContext::default())
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&stories)?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod server;
pub mod upstream;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::{CacheConfig, CacheHooks, TieredCache};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, GatewayErrorTrait, Result};
    pub use crate::gateway::Gateway;
    pub use crate::models::{Comment, CommentBatch, ListingEntry, ListingKind, Post, UserProfile};
    pub use crate::parser::Extractor;
    pub use crate::upstream::{FetchContext, FetchCoordinator, Origin};
}

// Direct re-exports for convenience
pub use error::{Error, Result};
pub use models::{Comment, CommentBatch, ItemType, ListingEntry, ListingKind, Post, UserProfile};

pub mod fetch;
pub mod serve;

// Re-export command functions for convenience
pub use fetch::{fetch, Resource};
pub use serve::serve;

use anyhow::{Context, Result};
use std::path::Path;

use hnapi::config::Config;

/// Load configuration from a TOML file when given, otherwise from `HNAPI_*`
/// environment variables, and validate it
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env().context("Failed to read configuration from environment")?,
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

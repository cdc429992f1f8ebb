//! Memcached-backed remote cache level
//!
//! The `memcache` client is blocking, so every command runs on the blocking
//! pool. The client is created on first use; a failed command drops it and
//! the next call reconnects.

use async_trait::async_trait;
use memcache::{Client, MemcacheError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::CacheStore;
use crate::utils::error::CacheError;

/// URL scheme understood by the `memcache` client
const SCHEME: &str = "memcache://";

/// Split a comma-separated server list into client URLs
///
/// Bare `host:port` entries get the `memcache://` scheme.
///
/// # Errors
/// `CacheError::InvalidConfig` when the list has no server.
pub fn parse_servers(servers: &str) -> Result<Vec<String>, CacheError> {
    let urls: Vec<String> = servers
        .split(',')
        .map(str::trim)
        .filter(|server| !server.is_empty())
        .map(|server| {
            if server.contains("://") {
                server.to_string()
            } else {
                format!("{SCHEME}{server}")
            }
        })
        .collect();

    if urls.is_empty() {
        return Err(CacheError::InvalidConfig(
            "memcached server list is empty".to_string(),
        ));
    }
    Ok(urls)
}

/// Memcached client over one or more servers
pub struct MemcachedStore {
    servers: Vec<String>,
    client: Mutex<Option<Arc<Client>>>,
}

impl MemcachedStore {
    /// Parse the server list; no connection is opened yet
    pub fn connect(servers: &str) -> Result<Self, CacheError> {
        Ok(Self {
            servers: parse_servers(servers)?,
            client: Mutex::new(None),
        })
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    fn cached_client(&self) -> Option<Arc<Client>> {
        self.client.lock().ok().and_then(|slot| slot.clone())
    }

    fn reset(&self) {
        if let Ok(mut slot) = self.client.lock() {
            *slot = None;
        }
    }

    async fn client(&self) -> Result<Arc<Client>, CacheError> {
        if let Some(client) = self.cached_client() {
            return Ok(client);
        }

        let servers = self.servers.clone();
        let client = tokio::task::spawn_blocking(move || Client::connect(servers))
            .await
            .map_err(|e| CacheError::Backend(format!("memcached connect task failed: {e}")))??;
        let client = Arc::new(client);

        if let Ok(mut slot) = self.client.lock() {
            *slot = Some(Arc::clone(&client));
        }
        Ok(client)
    }

    /// Run one blocking command against the shared client
    async fn run<T, F>(&self, command: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Client) -> Result<T, MemcacheError> + Send + 'static,
    {
        let client = self.client().await?;
        let outcome = tokio::task::spawn_blocking(move || command(&client))
            .await
            .map_err(|e| CacheError::Backend(format!("memcached task failed: {e}")))
            .and_then(|result| result.map_err(CacheError::from));

        if outcome.is_err() {
            self.reset();
        }
        outcome
    }
}

#[async_trait]
impl CacheStore for MemcachedStore {
    fn name(&self) -> &'static str {
        "memcached"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let key = key.to_string();
        self.run(move |client| client.get::<String>(&key)).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let key = key.to_string();
        let value = value.to_string();
        let expiration = u32::try_from(ttl.as_secs().max(1)).unwrap_or(u32::MAX);
        self.run(move |client| client.set(&key, value.as_str(), expiration))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let key = key.to_string();
        self.run(move |client| client.delete(&key).map(|_| ()))
            .await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        self.run(|client| client.version().map(|_| ())).await
    }
}

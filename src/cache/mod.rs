//! Tiered cache: in-process memory level over an optional remote store
//!
//! - Memory level: structured JSON values, always consulted first
//! - Remote level: pluggable [`CacheStore`] (Redis or Memcached), JSON strings
//!   with backend-native TTL
//!
//! A remote hit is copied into memory with half the base TTL so one process
//! never serves a value staler than half the nominal window. Remote failures
//! never reach callers: the cache reports them to the `on_error` observer and
//! keeps serving from memory until a health probe succeeds again. The memory
//! level stays in use while degraded even when it is switched off, and remote
//! deletes that fail are replayed once the backend is back.
//!
//! # Example
//!
//! ```rust,ignore
//! use hnapi::cache::{CacheConfig, CacheHooks, TieredCache};
//!
//! let cache = TieredCache::from_config(&CacheConfig::default(), CacheHooks::default()).await?;
//! cache.set("post1", serde_json::json!({"id": 1}), cache.base_ttl()).await;
//! assert!(cache.get("post1").await.is_some());
//! ```

pub mod memcached;
pub mod memory;
pub mod redis;

pub use self::memcached::MemcachedStore;
pub use self::memory::MemoryStore;
pub use self::redis::RedisStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::metrics;
use crate::utils::error::CacheError;

// ============================================================================
// Configuration
// ============================================================================

/// Remote store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Memory level only
    #[default]
    None,
    Redis,
    Memcached,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "memory" | "" => Ok(Self::None),
            "redis" => Ok(Self::Redis),
            "memcached" | "memcache" => Ok(Self::Memcached),
            other => Err(format!("Unsupported cache store: {other}")),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Remote store kind
    pub store: StoreKind,

    /// Redis URL (e.g., redis://localhost:6379)
    pub redis_url: String,

    /// Memcached servers, comma-separated `host:port` entries
    pub memcached_servers: String,

    /// Connection pool size
    pub pool_size: usize,

    /// Memory level switch; forced on when there is no remote store
    pub memory_enabled: Option<bool>,

    /// Base TTL in seconds (default: 10 minutes)
    pub ttl_secs: u64,

    /// Key prefix for namespacing remote keys
    pub key_prefix: String,

    /// Interval of the proactive expiry sweep
    pub sweep_interval_secs: u64,

    /// Interval of the remote health probe while degraded
    pub health_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::None,
            redis_url: "redis://localhost:6379".to_string(),
            memcached_servers: "localhost:11211".to_string(),
            pool_size: 10,
            memory_enabled: None,
            ttl_secs: 600,
            key_prefix: "hnapi".to_string(),
            sweep_interval_secs: 60,
            health_interval_secs: 30,
        }
    }
}

impl CacheConfig {
    /// Whether the memory level is active for this configuration
    pub fn memory_level_enabled(&self) -> bool {
        self.store == StoreKind::None || self.memory_enabled.unwrap_or(true)
    }

    pub fn base_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============================================================================
// Remote store capability
// ============================================================================

/// Remote cache backend capability set
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs and observers
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Reachability probe
    async fn ping(&self) -> Result<(), CacheError>;
}

// ============================================================================
// Observers
// ============================================================================

pub type ConnectHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&CacheError) + Send + Sync>;

/// Connectivity observers
#[derive(Clone)]
pub struct CacheHooks {
    pub on_connect: ConnectHook,
    pub on_error: ErrorHook,
}

impl Default for CacheHooks {
    fn default() -> Self {
        Self {
            on_connect: Arc::new(|store| {
                tracing::info!(store = %store, "Connected to cache backend");
            }),
            on_error: Arc::new(|err| {
                tracing::error!(error = %err, "Cache backend error, fallback to in-memory cache");
            }),
        }
    }
}

impl std::fmt::Debug for CacheHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHooks").finish_non_exhaustive()
    }
}

// ============================================================================
// Tiered cache
// ============================================================================

struct Inner {
    memory: MemoryStore,
    /// Memory level in normal operation; it is always used while degraded
    memory_enabled: bool,
    remote: Option<Arc<dyn CacheStore>>,
    base_ttl: Duration,
    key_prefix: String,
    degraded: AtomicBool,
    /// Remote keys whose delete failed, replayed on recovery
    pending_deletes: Mutex<HashSet<String>>,
    hooks: CacheHooks,
}

impl Inner {
    fn remote_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{key}", self.key_prefix)
        }
    }

    fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Memory level, if it is in use right now
    fn memory(&self) -> Option<&MemoryStore> {
        (self.memory_enabled || self.remote.is_none() || self.is_degraded()).then_some(&self.memory)
    }

    /// Remote store, unless we are running degraded
    fn live_remote(&self) -> Option<&Arc<dyn CacheStore>> {
        self.remote.as_ref().filter(|_| !self.is_degraded())
    }

    fn report(&self, err: CacheError) {
        if matches!(err, CacheError::Backend(_)) {
            metrics::record_cache_error();
            if !self.degraded.swap(true, Ordering::AcqRel) {
                tracing::warn!("Remote cache unavailable, serving from memory only");
            }
        }
        (self.hooks.on_error)(&err);
    }

    fn defer_delete(&self, remote_key: String) {
        if let Ok(mut pending) = self.pending_deletes.lock() {
            pending.insert(remote_key);
        }
    }

    fn take_pending_deletes(&self) -> Vec<String> {
        self.pending_deletes
            .lock()
            .map(|mut pending| pending.drain().collect())
            .unwrap_or_default()
    }

    fn mark_connected(&self, store: &str) {
        self.degraded.store(false, Ordering::Release);
        (self.hooks.on_connect)(store);
    }
}

/// Two-level read-through cache
///
/// Cheap to clone; clones share both levels.
#[derive(Clone)]
pub struct TieredCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("memory", &self.inner.memory_enabled)
            .field("remote", &self.inner.remote.as_ref().map(|r| r.name()))
            .field("base_ttl", &self.inner.base_ttl)
            .field("degraded", &self.is_degraded())
            .finish()
    }
}

impl TieredCache {
    /// Memory level only
    pub fn memory_only(base_ttl: Duration) -> Self {
        Self::build(true, None, base_ttl, String::new(), CacheHooks::default())
    }

    /// Memory level (unless disabled) over a remote store
    ///
    /// A disabled memory level still serves while the remote store is
    /// unreachable.
    pub fn with_store(
        store: Arc<dyn CacheStore>,
        memory_enabled: bool,
        base_ttl: Duration,
        key_prefix: impl Into<String>,
        hooks: CacheHooks,
    ) -> Self {
        Self::build(memory_enabled, Some(store), base_ttl, key_prefix.into(), hooks)
    }

    fn build(
        memory_enabled: bool,
        remote: Option<Arc<dyn CacheStore>>,
        base_ttl: Duration,
        key_prefix: String,
        hooks: CacheHooks,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                memory: MemoryStore::new(),
                memory_enabled,
                remote,
                base_ttl,
                key_prefix,
                degraded: AtomicBool::new(false),
                pending_deletes: Mutex::new(HashSet::new()),
                hooks,
            }),
        }
    }

    /// Build from configuration and check the remote store once
    ///
    /// An unreachable store does not fail construction: the cache starts
    /// degraded and the maintenance task keeps probing.
    ///
    /// # Errors
    /// `CacheError::InvalidConfig` when the backend settings cannot be used
    /// at all (malformed Redis URL, empty Memcached server list).
    pub async fn from_config(config: &CacheConfig, hooks: CacheHooks) -> Result<Self, CacheError> {
        let base_ttl = config.base_ttl();

        let store: Arc<dyn CacheStore> = match config.store {
            StoreKind::None => {
                return Ok(Self::build(
                    true,
                    None,
                    base_ttl,
                    config.key_prefix.clone(),
                    hooks,
                ));
            }
            StoreKind::Redis => Arc::new(RedisStore::connect(&config.redis_url, config.pool_size)?),
            StoreKind::Memcached => Arc::new(MemcachedStore::connect(&config.memcached_servers)?),
        };

        let cache = Self::with_store(
            store,
            config.memory_level_enabled(),
            base_ttl,
            config.key_prefix.clone(),
            hooks,
        );
        cache.check_health().await;
        Ok(cache)
    }

    pub fn base_ttl(&self) -> Duration {
        self.inner.base_ttl
    }

    /// TTL given to memory copies of remote hits
    pub fn promoted_ttl(&self) -> Duration {
        self.inner.base_ttl / 2
    }

    pub fn has_remote(&self) -> bool {
        self.inner.remote.is_some()
    }

    /// Whether the memory level is in use right now
    pub fn memory_enabled(&self) -> bool {
        self.inner.memory().is_some()
    }

    pub fn key_prefix(&self) -> &str {
        &self.inner.key_prefix
    }

    /// True while remote operations are suspended after a failure
    pub fn is_degraded(&self) -> bool {
        self.inner.is_degraded()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Look a key up, memory first
    pub async fn get(&self, key: &str) -> Option<Value> {
        if let Some(memory) = self.inner.memory() {
            if let Some(value) = memory.get(key).await {
                tracing::debug!(key = %key, "Memory cache hit");
                metrics::record_cache_hit("memory");
                return Some(value);
            }
        }

        let Some(remote) = self.inner.live_remote() else {
            metrics::record_cache_miss();
            return None;
        };

        match remote.get(&self.inner.remote_key(key)).await {
            Ok(Some(raw)) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => {
                    tracing::debug!(key = %key, store = remote.name(), "Remote cache hit");
                    metrics::record_cache_hit("remote");
                    if let Some(memory) = self.inner.memory() {
                        memory.set(key, value.clone(), self.promoted_ttl()).await;
                    }
                    Some(value)
                }
                Err(e) => {
                    self.inner.report(e.into());
                    metrics::record_cache_miss();
                    None
                }
            },
            Ok(None) => {
                metrics::record_cache_miss();
                None
            }
            Err(e) => {
                self.inner.report(e);
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Typed lookup; a value of the wrong shape counts as a miss
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding cached value of unexpected shape");
                None
            }
        }
    }

    /// Store a value with `ttl` in both levels
    ///
    /// The memory write completes before this returns. The remote write runs
    /// in the background, unless the memory level is disabled, in which case
    /// it is awaited so the value is readable right away.
    pub async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let payload = self
            .inner
            .live_remote()
            .is_some()
            .then(|| serde_json::to_string(&value));

        if let Some(memory) = self.inner.memory() {
            memory.set(key, value, ttl).await;
        }

        let payload = match payload {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                self.inner.report(e.into());
                return;
            }
            None => return,
        };

        let inner = Arc::clone(&self.inner);
        let remote_key = inner.remote_key(key);
        let write = async move {
            if let Some(remote) = inner.live_remote() {
                if let Err(e) = remote.set(&remote_key, &payload, ttl).await {
                    inner.report(e);
                }
            }
        };

        if self.inner.memory_enabled {
            tokio::spawn(write);
        } else {
            write.await;
        }
    }

    /// Typed store
    pub async fn set_as<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => self.set(key, value, ttl).await,
            Err(e) => self.inner.report(e.into()),
        }
    }

    /// Remove a key from both levels
    ///
    /// The remote delete is attempted even while degraded. If it fails, the
    /// key is kept and deleted again when the backend recovers.
    pub async fn delete(&self, key: &str) {
        self.inner.memory.delete(key).await;

        let Some(remote) = &self.inner.remote else {
            return;
        };

        let remote_key = self.inner.remote_key(key);
        if let Err(e) = remote.delete(&remote_key).await {
            self.inner.defer_delete(remote_key);
            self.inner.report(e);
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Ping the remote store; returns true if it is reachable
    ///
    /// On success the deferred deletes are replayed and, when the memory
    /// level is switched off, the entries written while degraded are dropped.
    pub async fn check_health(&self) -> bool {
        let Some(remote) = &self.inner.remote else {
            return false;
        };

        if let Err(e) = remote.ping().await {
            self.inner.report(e);
            return false;
        }

        for remote_key in self.inner.take_pending_deletes() {
            if let Err(e) = remote.delete(&remote_key).await {
                self.inner.defer_delete(remote_key);
                self.inner.report(e);
                return false;
            }
        }

        if !self.inner.memory_enabled {
            self.inner.memory.clear().await;
        }

        self.inner.mark_connected(remote.name());
        true
    }

    /// Drop expired memory entries now
    pub async fn sweep(&self) -> usize {
        self.inner.memory.purge_expired().await
    }

    /// Spawn the background sweep and health-probe loop
    ///
    /// The task holds a weak reference and exits once every clone of the
    /// cache is dropped.
    pub fn spawn_maintenance(&self, sweep_interval: Duration, health_interval: Duration) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let mut sweep = tokio::time::interval(sweep_interval.max(Duration::from_millis(10)));
            let mut health = tokio::time::interval(health_interval.max(Duration::from_millis(10)));

            loop {
                tokio::select! {
                    _ = sweep.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let cache = TieredCache { inner };
                        let purged = cache.sweep().await;
                        if purged > 0 {
                            tracing::debug!(purged, "Purged expired memory cache entries");
                        }
                    }
                    _ = health.tick() => {
                        let Some(inner) = weak.upgrade() else { break };
                        let cache = TieredCache { inner };
                        if cache.is_degraded() && cache.check_health().await {
                            tracing::info!("Remote cache reachable again");
                        }
                    }
                }
            }
        })
    }
}

/// Manifest cache layer
///
/// Maps a manifest identifier to the final, rewritten manifest object. There
/// is no expiry: an entry is served until it is explicitly deleted.
///
/// Backends:
/// - `MemoryCache`: process-local map (default)
/// - `RedisCache`: shared across service instances
pub mod redis_cache;

pub use redis_cache::RedisCache;

use crate::{
    config::{CacheBackend, CacheConfig},
    error::HxResult,
    metrics,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Key-value store for resolved manifests
#[async_trait]
pub trait ManifestCache: Send + Sync {
    /// Get a cached manifest
    async fn get(&self, key: &str) -> HxResult<Option<Value>>;

    /// Store a manifest
    async fn set(&self, key: &str, manifest: &Value) -> HxResult<()>;

    /// Remove a manifest; missing keys are not an error
    async fn delete(&self, key: &str) -> HxResult<()>;

    /// Backend name for logs and metrics
    fn backend(&self) -> &'static str;
}

/// In-process cache
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached manifests
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ManifestCache for MemoryCache {
    async fn get(&self, key: &str) -> HxResult<Option<Value>> {
        let value = self.entries.read().await.get(key).cloned();
        debug!(key, hit = value.is_some(), "Cache GET");
        metrics::record_cache_access(self.backend(), value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, manifest: &Value) -> HxResult<()> {
        debug!(key, "Cache SET");
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), manifest.clone());
        metrics::CACHE_SIZE.set(entries.len() as i64);
        Ok(())
    }

    async fn delete(&self, key: &str) -> HxResult<()> {
        debug!(key, "Cache DELETE");
        let mut entries = self.entries.write().await;
        entries.remove(key);
        metrics::CACHE_SIZE.set(entries.len() as i64);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

/// Build the configured cache backend
pub async fn from_config(config: &CacheConfig) -> HxResult<Arc<dyn ManifestCache>> {
    match config.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::Redis => Ok(Arc::new(RedisCache::new(config).await?)),
    }
}

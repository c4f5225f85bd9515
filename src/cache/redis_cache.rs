/// Redis-backed manifest cache, shared by every hxprezi instance pointing at
/// the same server
use crate::{
    cache::ManifestCache,
    config::CacheConfig,
    error::{HxResult, ManifestError},
    metrics,
};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Redis cache client
#[derive(Clone)]
pub struct RedisCache {
    connection: ConnectionManager,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to redis
    pub async fn new(config: &CacheConfig) -> HxResult<Self> {
        info!("Connecting to Redis at {}", config.redis_url);

        let client = Client::open(config.redis_url.as_str()).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            ManifestError::Cache(format!("Redis client creation failed: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            ManifestError::Cache(format!("Redis connection failed: {}", e))
        })?;

        info!("Redis connection established");

        Ok(Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        build_key(&self.key_prefix, key)
    }
}

fn build_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

#[async_trait]
impl ManifestCache for RedisCache {
    async fn get(&self, key: &str) -> HxResult<Option<Value>> {
        let cache_key = self.build_key(key);

        debug!("Cache GET: {}", cache_key);

        let mut conn = self.connection.clone();
        let result: Option<String> = match conn.get::<_, Option<String>>(&cache_key).await {
            Ok(result) => result,
            Err(e) => {
                // An unreachable cache only costs us a re-resolution
                warn!("Redis GET failed for {}: {}", cache_key, e);
                metrics::record_cache_access(self.backend(), false);
                return Ok(None);
            }
        };

        match result {
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => {
                    debug!("Cache HIT: {}", cache_key);
                    metrics::record_cache_access(self.backend(), true);
                    Ok(Some(value))
                }
                Err(e) => {
                    warn!("Failed to deserialize cached manifest: {}", e);
                    let _ = self.delete(key).await;
                    metrics::record_cache_access(self.backend(), false);
                    Ok(None)
                }
            },
            None => {
                debug!("Cache MISS: {}", cache_key);
                metrics::record_cache_access(self.backend(), false);
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, manifest: &Value) -> HxResult<()> {
        let cache_key = self.build_key(key);

        debug!("Cache SET: {}", cache_key);

        let json = serde_json::to_string(manifest).map_err(|e| {
            error!("Failed to serialize manifest for cache: {}", e);
            ManifestError::Cache(format!("Cache serialization failed: {}", e))
        })?;

        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(&cache_key, json).await.map_err(|e| {
            warn!("Redis SET failed for {}: {}", cache_key, e);
            ManifestError::Cache(format!("Cache set failed: {}", e))
        })?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> HxResult<()> {
        let cache_key = self.build_key(key);

        debug!("Cache DELETE: {}", cache_key);

        let mut conn = self.connection.clone();
        conn.del::<_, ()>(&cache_key).await.map_err(|e| {
            warn!("Redis DELETE failed for {}: {}", cache_key, e);
            ManifestError::Cache(format!("Cache delete failed: {}", e))
        })?;

        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

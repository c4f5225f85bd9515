/// Manifest Resolver - orchestrates cache, local files and provider proxying
use crate::{
    cache::ManifestCache,
    config::{RewriteConfig, ServerConfig},
    error::{HxResult, ManifestError},
    manifest::{
        id::{ManifestId, Source},
        provider::{ProviderConfig, ProviderRegistry},
        rewrite::{fix_placeholders, normalize_image_services, parse_rewritten},
        store::LocalStore,
        upstream::ManifestFetcher,
    },
    metrics,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where a resolved manifest came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Cache,
    FileCache,
    Local,
    Proxy,
}

impl Origin {
    fn label(self) -> &'static str {
        match self {
            Origin::Cache => "cache",
            Origin::FileCache => "file_cache",
            Origin::Local => "local",
            Origin::Proxy => "proxy",
        }
    }
}

/// Main manifest resolver
///
/// Resolution order:
/// 1. Cache (fast path, served as-is)
/// 2. Local cache tier (already rewritten)
/// 3. Local source tier (our own manifests, or local copies of provider ones)
/// 4. Provider proxy
///
/// Steps 3 and 4 are rewritten, saved to the cache tier and cached.
#[derive(Clone)]
pub struct ManifestResolver {
    cache: Arc<dyn ManifestCache>,
    store: LocalStore,
    fetcher: Arc<dyn ManifestFetcher>,
    providers: ProviderRegistry,
    hx_servers: ProviderConfig,
    rewrite: RewriteConfig,
}

impl ManifestResolver {
    /// Create a new resolver
    pub fn new(
        config: &ServerConfig,
        cache: Arc<dyn ManifestCache>,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> Self {
        Self {
            cache,
            store: LocalStore::from_config(&config.storage),
            fetcher,
            providers: config.providers.clone(),
            hx_servers: config.hx_servers.clone(),
            rewrite: config.rewrite.clone(),
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Resolve a manifest identifier to the rewritten manifest object
    pub async fn resolve(&self, manifest_id: &str) -> HxResult<Value> {
        self.resolve_with_origin(manifest_id)
            .await
            .map(|(manifest, _)| manifest)
    }

    /// Resolve and report which stage produced the manifest
    pub async fn resolve_with_origin(&self, manifest_id: &str) -> HxResult<(Value, Origin)> {
        let (source, result) = self.resolve_inner(manifest_id).await;

        match &result {
            Ok((_, origin)) => {
                debug!(manifest_id, source, origin = origin.label(), "Manifest resolved");
                metrics::record_resolution(source, origin.label());
            }
            Err(e) => {
                info!(
                    manifest_id,
                    source,
                    status = e.status_code().as_u16(),
                    error = %e,
                    "Manifest resolution failed"
                );
                metrics::record_resolution(source, e.kind());
            }
        }

        result
    }

    async fn resolve_inner(&self, manifest_id: &str) -> (&'static str, HxResult<(Value, Origin)>) {
        if let Some(manifest) = self.cache_get(manifest_id).await {
            return ("cache", Ok((manifest, Origin::Cache)));
        }

        let id = match ManifestId::parse(manifest_id, &self.providers) {
            Ok(id) => id,
            Err(e) => return ("unknown", Err(e)),
        };

        let source = if id.is_local() { "local" } else { "provider" };
        (source, self.resolve_uncached(&id).await)
    }

    async fn resolve_uncached(&self, id: &ManifestId) -> HxResult<(Value, Origin)> {
        debug!(
            manifest_id = %id,
            source = id.source().label(),
            doc_id = id.doc_id(),
            "Cache miss, resolving manifest"
        );

        // Files are always named after the full identifier
        match self.store.read_cached(id.as_str()).await {
            Ok(text) => {
                let manifest = parse_rewritten(&text, id.as_str())?;
                self.cache_set(id.as_str(), &manifest).await;
                return Ok((manifest, Origin::FileCache));
            }
            Err(ManifestError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let (text, placeholders, origin) = match self.store.read_source(id.as_str()).await {
            Ok(text) => (text, &self.hx_servers, Origin::Local),
            Err(ManifestError::NotFound(message)) => match id.source() {
                Source::Local => return Err(ManifestError::NotFound(message)),
                Source::Provider(key) => {
                    let provider = self.providers.get(key).ok_or_else(|| {
                        ManifestError::NotFound(format!(
                            "unknown source for manifest_id({})",
                            id
                        ))
                    })?;
                    let url = provider.manifest_url(id.doc_id());
                    (self.fetcher.fetch(&url).await?, provider, Origin::Proxy)
                }
            },
            Err(e) => return Err(e),
        };

        let fixed = fix_placeholders(
            &text,
            placeholders,
            &self.hx_servers,
            self.rewrite.replace_https,
        );
        let mut manifest = parse_rewritten(&fixed, id.as_str())?;

        // Remote manifests keep whatever image API their provider speaks
        if origin == Origin::Local {
            normalize_image_services(&mut manifest, &self.rewrite);
        }

        self.save_to_file_cache(id, &manifest).await;
        self.cache_set(id.as_str(), &manifest).await;

        Ok((manifest, origin))
    }

    /// Drop a manifest from the cache and the cache tier
    pub async fn invalidate(&self, manifest_id: &str) -> HxResult<()> {
        let result = self.invalidate_inner(manifest_id).await;
        metrics::record_invalidation(result.is_ok());
        result
    }

    async fn invalidate_inner(&self, manifest_id: &str) -> HxResult<()> {
        let id = ManifestId::parse(manifest_id, &self.providers)?;
        self.store.check_doc_id(id.as_str())?;

        self.cache.delete(id.as_str()).await?;
        self.store.remove_cached(id.as_str()).await?;

        info!(manifest_id, "Manifest invalidated");
        Ok(())
    }

    async fn cache_get(&self, key: &str) -> Option<Value> {
        match self.cache.get(key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Cache lookup failed, resolving anyway");
                None
            }
        }
    }

    async fn cache_set(&self, key: &str, manifest: &Value) {
        if let Err(e) = self.cache.set(key, manifest).await {
            warn!(key, error = %e, "Failed to cache manifest");
        }
    }

    async fn save_to_file_cache(&self, id: &ManifestId, manifest: &Value) {
        if !self.store.has_cache_tier() {
            return;
        }

        let text = match serde_json::to_string(manifest) {
            Ok(text) => text,
            Err(e) => {
                warn!(manifest_id = %id, error = %e, "Failed to serialize manifest for file cache");
                return;
            }
        };

        if let Err(e) = self.store.write_cached(id.as_str(), &text).await {
            warn!(manifest_id = %id, error = %e, "Failed to save manifest to file cache");
        }
    }
}

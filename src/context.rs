/// Application context and dependency injection
use crate::{
    cache::{self, ManifestCache},
    config::ServerConfig,
    error::HxResult,
    manifest::{HttpFetcher, ManifestFetcher, ManifestResolver},
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub resolver: Arc<ManifestResolver>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> HxResult<Self> {
        // Validate configuration
        config.validate()?;

        if !config.storage.source_dir.is_dir() {
            tracing::warn!(
                "Local manifests directory {} does not exist; only proxied manifests will resolve",
                config.storage.source_dir.display()
            );
        }

        // Initialize manifest cache
        let cache = cache::from_config(&config.cache).await?;
        tracing::info!("Manifest cache backend: {}", cache.backend());

        // Initialize upstream fetcher
        let fetcher: Arc<dyn ManifestFetcher> = Arc::new(HttpFetcher::new(&config.upstream)?);

        Ok(Self::with_services(config, cache, fetcher))
    }

    /// Assemble a context from already-built services
    pub fn with_services(
        config: ServerConfig,
        cache: Arc<dyn ManifestCache>,
        fetcher: Arc<dyn ManifestFetcher>,
    ) -> Self {
        let resolver = Arc::new(ManifestResolver::new(&config, cache, fetcher));

        Self {
            config: Arc::new(config),
            resolver,
        }
    }

    /// Get the public manifests base URL
    pub fn manifests_url(&self) -> String {
        let manifests = &self.config.hx_servers.manifests;
        let scheme = if self.config.rewrite.replace_https {
            "http"
        } else {
            "https"
        };
        format!("{}://{}/{}", scheme, manifests.hostname, manifests.path)
    }
}

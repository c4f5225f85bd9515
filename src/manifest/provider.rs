/// Provider registry - static configuration of the manifest sources we proxy
use crate::error::{HxResult, ManifestError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// One endpoint of a provider (its manifests server or its images server)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub hostname: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub id_prefix: String,
    /// String baked into manifests that must be rewritten to our own hostname
    #[serde(default)]
    pub placeholder: String,
    /// URL scheme used when fetching; providers are https unless overridden
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

fn default_scheme() -> String {
    "https".to_string()
}

impl EndpointConfig {
    pub fn new(hostname: &str, path: &str, id_prefix: &str, placeholder: &str) -> Self {
        Self {
            hostname: hostname.to_string(),
            path: path.to_string(),
            id_prefix: id_prefix.to_string(),
            placeholder: placeholder.to_string(),
            scheme: default_scheme(),
        }
    }
}

/// Manifests and images endpoints of a single source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub manifests: EndpointConfig,
    pub images: EndpointConfig,
}

impl ProviderConfig {
    /// Upstream URL for a document: `{scheme}://{hostname}/{path}/{id_prefix}{doc_id}`
    pub fn manifest_url(&self, doc_id: &str) -> String {
        let m = &self.manifests;
        format!(
            "{}://{}/{}/{}{}",
            m.scheme, m.hostname, m.path, m.id_prefix, doc_id
        )
    }
}

/// Key of a configured provider (the identifier prefix, e.g. "drs")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderKey(String);

impl ProviderKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed mapping from provider key to provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKey, ProviderConfig>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider
    pub fn with_provider(mut self, key: &str, config: ProviderConfig) -> Self {
        self.providers.insert(ProviderKey(key.to_string()), config);
        self
    }

    /// Resolve a raw prefix into a known provider key
    pub fn key(&self, prefix: &str) -> Option<ProviderKey> {
        self.providers
            .get_key_value(&ProviderKey(prefix.to_string()))
            .map(|(k, _)| k.clone())
    }

    pub fn get(&self, key: &ProviderKey) -> Option<&ProviderConfig> {
        self.providers.get(key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider keys in sorted order
    pub fn keys(&self) -> Vec<&ProviderKey> {
        let mut keys: Vec<_> = self.providers.keys().collect();
        keys.sort();
        keys
    }

    /// Providers of the original Harvard deployment
    pub fn harvard_defaults() -> Self {
        Self::new()
            .with_provider(
                "drs",
                ProviderConfig {
                    manifests: EndpointConfig::new(
                        "iiif.lib.harvard.edu",
                        "manifests",
                        "drs:",
                        "iiif.lib.harvard.edu",
                    ),
                    images: EndpointConfig::new(
                        "ids.lib.harvard.edu",
                        "ids/iiif",
                        "",
                        "ids.lib.harvard.edu",
                    ),
                },
            )
            .with_provider(
                "huam",
                ProviderConfig {
                    manifests: EndpointConfig::new(
                        "iiif.harvardartmuseums.org",
                        "manifests/object",
                        "",
                        "iiif.harvardartmuseums.org",
                    ),
                    images: EndpointConfig::new(
                        "ids.lib.harvard.edu",
                        "ids/iiif",
                        "",
                        "ids.lib.harvard.edu",
                    ),
                },
            )
    }

    /// Parse a registry from JSON: `{"drs": {"manifests": {...}, "images": {...}}}`
    pub fn from_json_str(json: &str) -> HxResult<Self> {
        let registry: Self = serde_json::from_str(json)
            .map_err(|e| ManifestError::Config(format!("Invalid provider registry: {}", e)))?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry file
    pub fn from_file(path: &Path) -> HxResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ManifestError::Config(format!(
                "Failed to read provider registry {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject keys that could never be parsed out of an identifier
    pub fn validate(&self) -> HxResult<()> {
        for (key, config) in &self.providers {
            if key.0.is_empty() || key.0.contains(':') {
                return Err(ManifestError::Config(format!(
                    "Invalid provider key '{}'",
                    key
                )));
            }
            if config.manifests.hostname.is_empty() {
                return Err(ManifestError::Config(format!(
                    "Provider '{}' has no manifests hostname",
                    key
                )));
            }
        }
        Ok(())
    }
}

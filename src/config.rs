/// Configuration management for hxprezi
use crate::error::{HxResult, ManifestError};
use crate::manifest::provider::{EndpointConfig, ProviderConfig, ProviderRegistry};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    /// Our own public manifests/images endpoints
    pub hx_servers: ProviderConfig,
    pub storage: StorageConfig,
    pub providers: ProviderRegistry,
    pub upstream: UpstreamConfig,
    pub rewrite: RewriteConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
}

/// Local manifest storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Authoritative, externally managed manifests
    pub source_dir: PathBuf,
    /// Rewritten manifests written back by the service; `None` disables the tier
    pub cache_dir: Option<PathBuf>,
    /// Replaces ':' from identifiers in file names
    pub filename_separator: String,
}

/// Outbound requests to providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

/// Manifest rewriting options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteConfig {
    /// Serve our own hostnames over http (vagrant-style dev clusters)
    pub replace_https: bool,
    pub image_service_context: String,
    pub image_service_profile: String,
}

/// Manifest cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

/// Manifest cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub key_prefix: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

/// Default IIIF Image API 2 context (loris)
pub const IMAGE_API_CONTEXT: &str = "http://iiif.io/api/image/2/context.json";
/// Default IIIF Image API 2 profile
pub const IMAGE_API_PROFILE: &str = "http://iiif.io/api/image/2/profiles/level2.json";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            hx_servers: ProviderConfig {
                manifests: EndpointConfig::new(
                    "manifests.vm",
                    "manifests",
                    "",
                    "oculus.harvardx.harvard.edu",
                ),
                images: EndpointConfig::new(
                    "images.vm",
                    "iiif",
                    "",
                    "images.harvardx.harvard.edu",
                ),
            },
            storage: StorageConfig {
                source_dir: PathBuf::from("./data/hx"),
                cache_dir: Some(PathBuf::from("./data/cache")),
                filename_separator: ":".to_string(),
            },
            providers: ProviderRegistry::harvard_defaults(),
            upstream: UpstreamConfig {
                timeout_secs: 5,
                user_agent: format!("hxprezi/{}", env!("CARGO_PKG_VERSION")),
            },
            rewrite: RewriteConfig {
                replace_https: false,
                image_service_context: IMAGE_API_CONTEXT.to_string(),
                image_service_profile: IMAGE_API_PROFILE.to_string(),
            },
            cache: CacheConfig {
                backend: CacheBackend::Memory,
                redis_url: "redis://localhost:6379".to_string(),
                key_prefix: "hxprezi:manifest:".to_string(),
            },
            logging: LoggingConfig {
                level: "hxprezi=debug,tower_http=debug".to_string(),
                json: false,
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> HxResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_vars<F>(var: F) -> HxResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = var("HXPREZI_HOST").unwrap_or(defaults.service.host);
        let port = match var("HXPREZI_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| ManifestError::Config(format!("Invalid port number: {}", port)))?,
            None => defaults.service.port,
        };

        let mut hx_servers = defaults.hx_servers;
        if let Some(hostname) = var("HXPREZI_MANIFESTS_HOSTNAME") {
            hx_servers.manifests.hostname = hostname;
        }
        if let Some(hostname) = var("HXPREZI_IMAGES_HOSTNAME") {
            hx_servers.images.hostname = hostname;
        }
        if let Some(placeholder) = var("HXPREZI_MANIFESTS_PLACEHOLDER") {
            hx_servers.manifests.placeholder = placeholder;
        }
        if let Some(placeholder) = var("HXPREZI_IMAGES_PLACEHOLDER") {
            hx_servers.images.placeholder = placeholder;
        }

        let source_dir = var("HXPREZI_LOCAL_MANIFESTS_SOURCE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.source_dir);
        // An explicitly empty value turns the cache tier off
        let cache_dir = match var("HXPREZI_LOCAL_MANIFESTS_CACHE_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => defaults.storage.cache_dir,
        };
        let filename_separator =
            var("HXPREZI_FILENAME_SEPARATOR").unwrap_or(defaults.storage.filename_separator);

        let providers = match var("HXPREZI_PROVIDERS_FILE") {
            Some(path) => ProviderRegistry::from_file(&PathBuf::from(path))?,
            None => defaults.providers,
        };

        let timeout_secs = var("HXPREZI_REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.upstream.timeout_secs);
        let user_agent = var("HXPREZI_USER_AGENT").unwrap_or(defaults.upstream.user_agent);

        let replace_https = var("HXPREZI_REPLACE_HTTPS")
            .map(|s| s.eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.rewrite.replace_https);
        let image_service_context = var("HXPREZI_IMAGE_SERVICE_CONTEXT")
            .unwrap_or(defaults.rewrite.image_service_context);
        let image_service_profile = var("HXPREZI_IMAGE_SERVICE_PROFILE")
            .unwrap_or(defaults.rewrite.image_service_profile);

        let backend = match var("HXPREZI_CACHE_BACKEND").as_deref() {
            None | Some("memory") | Some("simple") => CacheBackend::Memory,
            Some("redis") => CacheBackend::Redis,
            Some(other) => {
                return Err(ManifestError::Config(format!(
                    "Unknown cache backend: {}",
                    other
                )))
            }
        };
        let redis_url = var("HXPREZI_REDIS_URL").unwrap_or(defaults.cache.redis_url);
        let key_prefix = var("HXPREZI_CACHE_KEY_PREFIX").unwrap_or(defaults.cache.key_prefix);

        let level = var("RUST_LOG").unwrap_or(defaults.logging.level);
        let json = var("HXPREZI_LOG_FORMAT")
            .map(|s| s.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig { host, port },
            hx_servers,
            storage: StorageConfig {
                source_dir,
                cache_dir,
                filename_separator,
            },
            providers,
            upstream: UpstreamConfig {
                timeout_secs,
                user_agent,
            },
            rewrite: RewriteConfig {
                replace_https,
                image_service_context,
                image_service_profile,
            },
            cache: CacheConfig {
                backend,
                redis_url,
                key_prefix,
            },
            logging: LoggingConfig { level, json },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> HxResult<()> {
        if self.hx_servers.manifests.hostname.is_empty()
            || self.hx_servers.images.hostname.is_empty()
        {
            return Err(ManifestError::Config(
                "Manifests and images hostnames cannot be empty".to_string(),
            ));
        }

        if self.upstream.timeout_secs == 0 {
            return Err(ManifestError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        let sep = &self.storage.filename_separator;
        if sep.is_empty() || sep.contains('/') || sep.contains('\\') {
            return Err(ManifestError::Config(format!(
                "Invalid filename separator '{}'",
                sep
            )));
        }

        self.providers.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.service.port, 5000);
        assert_eq!(config.hx_servers.manifests.hostname, "manifests.vm");
        assert_eq!(config.upstream.timeout_secs, 5);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert!(config.providers.key("drs").is_some());
        assert!(!config.rewrite.replace_https);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_vars(vars(&[
            ("HXPREZI_PORT", "8080"),
            ("HXPREZI_MANIFESTS_HOSTNAME", "manifests.example.org"),
            ("HXPREZI_LOCAL_MANIFESTS_CACHE_DIR", ""),
            ("HXPREZI_REPLACE_HTTPS", "TRUE"),
            ("HXPREZI_CACHE_BACKEND", "redis"),
        ]))
        .unwrap();

        assert_eq!(config.service.port, 8080);
        assert_eq!(config.hx_servers.manifests.hostname, "manifests.example.org");
        assert!(config.storage.cache_dir.is_none());
        assert!(config.rewrite.replace_https);
        assert_eq!(config.cache.backend, CacheBackend::Redis);
    }

    #[test]
    fn test_invalid_port() {
        let result = ServerConfig::from_vars(vars(&[("HXPREZI_PORT", "not-a-port")]));
        assert!(matches!(result, Err(ManifestError::Config(_))));
    }

    #[test]
    fn test_unknown_cache_backend() {
        let result = ServerConfig::from_vars(vars(&[("HXPREZI_CACHE_BACKEND", "memcached")]));
        assert!(matches!(result, Err(ManifestError::Config(_))));
    }

    #[test]
    fn test_validate_separator() {
        let mut config = ServerConfig::default();
        config.storage.filename_separator = "/".to_string();
        assert!(config.validate().is_err());
    }
}

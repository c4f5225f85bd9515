/// Remote manifest fetching from third-party providers
use crate::{
    config::UpstreamConfig,
    error::{HxResult, ManifestError},
    metrics,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Fetches a manifest document from a URL
#[async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Return the body text, guaranteed to be valid JSON
    async fn fetch(&self, url: &str) -> HxResult<String>;
}

/// reqwest-based fetcher with a bounded timeout
#[derive(Clone)]
pub struct HttpFetcher {
    http_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &UpstreamConfig) -> HxResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ManifestError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn fetch_inner(&self, url: &str) -> HxResult<String> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            warn!(url, error = %e, "Upstream request failed");
            ManifestError::UpstreamUnreachable(format!(
                "unable to fetch manifest from ({}) - {}",
                url, e
            ))
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(url, status = status.as_u16(), "Upstream returned error status");
            return Err(ManifestError::UpstreamError {
                status: status.as_u16(),
                message: format!("error fetching manifest from ({}) - {}", url, status),
            });
        }

        // A timeout can also hit while the body is streaming
        let body = response.text().await.map_err(|e| {
            ManifestError::UpstreamUnreachable(format!(
                "unable to fetch manifest from ({}) - {}",
                url, e
            ))
        })?;

        if let Err(e) = serde_json::from_str::<serde::de::IgnoredAny>(&body) {
            return Err(ManifestError::UpstreamBadResponse(format!(
                "error decoding json response from ({}) - {}",
                url, e
            )));
        }

        Ok(body)
    }
}

#[async_trait]
impl ManifestFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> HxResult<String> {
        let start = Instant::now();
        debug!(url, "Fetching upstream manifest");

        let result = self.fetch_inner(url).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::record_upstream_fetch(outcome, start.elapsed().as_secs_f64());

        result
    }
}

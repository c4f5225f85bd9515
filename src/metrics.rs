/// Metrics and telemetry for hxprezi
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - Manifest resolutions by source and outcome
/// - Cache hit/miss rates
/// - Upstream provider fetch latencies

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // ========== Manifest Metrics ==========

    /// Manifest resolutions by source kind and outcome
    pub static ref MANIFEST_RESOLUTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "manifest_resolutions_total",
        "Total number of manifest resolutions",
        &["source", "outcome"]
    )
    .unwrap();

    /// Manifest cache invalidations
    pub static ref MANIFEST_INVALIDATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "manifest_invalidations_total",
        "Total number of manifest cache invalidations",
        &["status"]
    )
    .unwrap();

    // ========== Cache Metrics ==========

    /// Cache hits by backend
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_hits_total",
        "Total number of cache hits",
        &["cache_type"]
    )
    .unwrap();

    /// Cache misses by backend
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["cache_type"]
    )
    .unwrap();

    /// Number of entries in the in-memory cache
    pub static ref CACHE_SIZE: IntGauge = register_int_gauge!(
        "cache_size",
        "Number of entries in cache"
    )
    .unwrap();

    // ========== Upstream Metrics ==========

    /// Upstream fetches by outcome
    pub static ref UPSTREAM_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "upstream_fetches_total",
        "Total number of manifest fetches from providers",
        &["outcome"]
    )
    .unwrap();

    /// Upstream fetch duration in seconds
    pub static ref UPSTREAM_FETCH_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "upstream_fetch_duration_seconds",
        "Provider fetch latencies in seconds",
        &["outcome"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
}

/// Render metrics in Prometheus text format
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record a manifest resolution
pub fn record_resolution(source: &str, outcome: &str) {
    MANIFEST_RESOLUTIONS_TOTAL
        .with_label_values(&[source, outcome])
        .inc();
}

/// Record a cache invalidation
pub fn record_invalidation(success: bool) {
    MANIFEST_INVALIDATIONS_TOTAL
        .with_label_values(&[if success { "success" } else { "failure" }])
        .inc();
}

/// Record a cache access
pub fn record_cache_access(cache_type: &str, hit: bool) {
    if hit {
        CACHE_HITS_TOTAL.with_label_values(&[cache_type]).inc();
    } else {
        CACHE_MISSES_TOTAL.with_label_values(&[cache_type]).inc();
    }
}

/// Record a provider fetch
pub fn record_upstream_fetch(outcome: &str, duration: f64) {
    UPSTREAM_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
    UPSTREAM_FETCH_DURATION_SECONDS
        .with_label_values(&[outcome])
        .observe(duration);
}

/// hxprezi - IIIF presentation manifest service
///
/// Resolves manifest identifiers of the form `<source>:<id>` to IIIF
/// manifests, served from local files or proxied from third-party providers
/// with their hostnames rewritten to point at this service.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod manifest;
pub mod metrics;
pub mod server;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{HxResult, ManifestError};

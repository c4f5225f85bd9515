/// Manifest resolution
///
/// Turns a manifest identifier into a IIIF presentation manifest by looking
/// in the cache, the local filesystem, or a third-party provider, and points
/// every embedded hostname at this service.

pub mod id;
pub mod provider;
pub mod resolver;
pub mod rewrite;
pub mod store;
pub mod upstream;

pub use id::{ManifestId, Source};
pub use provider::{EndpointConfig, ProviderConfig, ProviderKey, ProviderRegistry};
pub use resolver::{ManifestResolver, Origin};
pub use store::LocalStore;
pub use upstream::{HttpFetcher, ManifestFetcher};

/// Manifest identifier parsing
///
/// Identifiers follow the legacy oculus pattern `<source>:<doc_id>`. When the
/// source is a configured provider the request is proxied and the provider
/// only sees `doc_id`. Any other source is one of our own collections
/// (`cellx`, `malariax`, ...) and the whole identifier names the local file.
use crate::{
    error::{HxResult, ManifestError},
    manifest::provider::{ProviderKey, ProviderRegistry},
};
use std::fmt;

/// Delimiter between source and document id
pub const ID_SEPARATOR: char = ':';

/// Where a manifest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Our own corpus on the local filesystem
    Local,
    /// A configured third-party provider
    Provider(ProviderKey),
}

impl Source {
    /// Label used in logs and metrics
    pub fn label(&self) -> &str {
        match self {
            Source::Local => "local",
            Source::Provider(key) => key.as_str(),
        }
    }
}

/// A parsed manifest identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestId {
    raw: String,
    source: Source,
    doc_id: String,
}

impl ManifestId {
    /// Parse a raw identifier against the provider registry
    pub fn parse(raw: &str, providers: &ProviderRegistry) -> HxResult<Self> {
        let mut parts = raw.split(ID_SEPARATOR);
        let (prefix, rest) = match (parts.next(), parts.next(), parts.next()) {
            (Some(prefix), Some(rest), None) => (prefix, rest),
            _ => {
                return Err(ManifestError::InvalidIdentifier(format!(
                    "invalid manifest_id({}); expected <source>{}<id> format",
                    raw, ID_SEPARATOR
                )))
            }
        };

        let (source, doc_id) = match providers.key(prefix) {
            Some(key) => (Source::Provider(key), rest.to_string()),
            None => (Source::Local, raw.to_string()),
        };

        Ok(Self {
            raw: raw.to_string(),
            source,
            doc_id,
        })
    }

    /// The identifier exactly as requested; used as the cache key
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Provider-specific document id (the full identifier for local manifests)
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn is_local(&self) -> bool {
        self.source == Source::Local
    }
}

impl fmt::Display for ManifestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::harvard_defaults()
    }

    #[test]
    fn test_provider_id_strips_prefix() {
        let id = ManifestId::parse("drs:blah", &registry()).unwrap();
        assert_eq!(id.source().label(), "drs");
        assert_eq!(id.doc_id(), "blah");
        assert_eq!(id.as_str(), "drs:blah");
        assert!(!id.is_local());
    }

    #[test]
    fn test_unknown_prefix_is_local_with_full_id() {
        let id = ManifestId::parse("chx:nonexistent", &registry()).unwrap();
        assert_eq!(id.source(), &Source::Local);
        assert_eq!(id.doc_id(), "chx:nonexistent");
    }

    #[test]
    fn test_empty_parts_are_local() {
        let id = ManifestId::parse(":abc", &registry()).unwrap();
        assert!(id.is_local());
        assert_eq!(id.doc_id(), ":abc");

        let id = ManifestId::parse("drs:", &registry()).unwrap();
        assert_eq!(id.source().label(), "drs");
        assert_eq!(id.doc_id(), "");
    }

    #[test]
    fn test_wrong_delimiter_count_is_invalid() {
        for raw in ["too:many:colon:", "nocolon", "", "a:b:c"] {
            let err = ManifestId::parse(raw, &registry()).unwrap_err();
            assert!(matches!(err, ManifestError::InvalidIdentifier(_)), "{}", raw);
            assert!(err.to_string().contains("invalid"));
        }
    }

    #[test]
    fn test_provider_matching_is_exact() {
        let id = ManifestId::parse("DRS:blah", &registry()).unwrap();
        assert!(id.is_local());
        assert_eq!(id.doc_id(), "DRS:blah");
    }
}

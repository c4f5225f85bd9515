/// Filesystem manifest storage
///
/// Two tiers, both holding `{doc_id}.json` files:
/// - cache tier: manifests already rewritten by this service, checked first
/// - source tier: authoritative manifests managed outside the service
use crate::{
    config::StorageConfig,
    error::{HxResult, ManifestError},
    manifest::id::ID_SEPARATOR,
};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

/// Distinguishes temporary files of concurrent writers
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Local manifest store
#[derive(Debug, Clone)]
pub struct LocalStore {
    source_dir: PathBuf,
    cache_dir: Option<PathBuf>,
    filename_separator: String,
}

impl LocalStore {
    pub fn new(source_dir: PathBuf, cache_dir: Option<PathBuf>) -> Self {
        Self {
            source_dir,
            cache_dir,
            filename_separator: ID_SEPARATOR.to_string(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            source_dir: config.source_dir.clone(),
            cache_dir: config.cache_dir.clone(),
            filename_separator: config.filename_separator.clone(),
        }
    }

    pub fn has_cache_tier(&self) -> bool {
        self.cache_dir.is_some()
    }

    /// File name for a document id
    ///
    /// `doc_id` is untrusted input: the name must stay a single plain path
    /// component so that the join cannot leave the base directory.
    fn file_name(&self, doc_id: &str) -> HxResult<String> {
        let name = format!(
            "{}.json",
            doc_id.replace(ID_SEPARATOR, &self.filename_separator)
        );

        let invalid = doc_id.is_empty()
            || doc_id.starts_with('.')
            || name.contains(['/', '\\', '\0'])
            || {
                let mut components = Path::new(&name).components();
                !matches!(
                    (components.next(), components.next()),
                    (Some(Component::Normal(_)), None)
                )
            };

        if invalid {
            return Err(ManifestError::InvalidIdentifier(format!(
                "invalid manifest_id({}); not a valid document name",
                doc_id
            )));
        }

        Ok(name)
    }

    /// Read a manifest from one tier, as raw text
    async fn read_from(&self, base_dir: &Path, doc_id: &str) -> HxResult<String> {
        let not_found =
            || ManifestError::NotFound(format!("local manifest ({}) not found", doc_id));

        let path = base_dir.join(self.file_name(doc_id)?);

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat manifest");
                return Err(not_found());
            }
        };
        if !metadata.is_file() {
            return Err(not_found());
        }

        // A symlink inside the base directory must still resolve inside it
        let (canonical_base, canonical_path) =
            match (fs::canonicalize(base_dir).await, fs::canonicalize(&path).await) {
                (Ok(base), Ok(path)) => (base, path),
                _ => return Err(not_found()),
            };
        if !canonical_path.starts_with(&canonical_base) {
            warn!(path = %path.display(), "Manifest path escapes base directory");
            return Err(not_found());
        }

        match fs::read_to_string(&canonical_path).await {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "Read local manifest");
                Ok(text)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read manifest");
                Err(not_found())
            }
        }
    }

    /// Read from the cache tier
    pub async fn read_cached(&self, doc_id: &str) -> HxResult<String> {
        match &self.cache_dir {
            Some(dir) => self.read_from(dir, doc_id).await,
            None => Err(ManifestError::NotFound(format!(
                "local manifest ({}) not found",
                doc_id
            ))),
        }
    }

    /// Read from the source tier
    pub async fn read_source(&self, doc_id: &str) -> HxResult<String> {
        self.read_from(&self.source_dir, doc_id).await
    }

    /// Save a rewritten manifest into the cache tier
    ///
    /// Each write goes to its own temporary file which is then renamed into
    /// place, so readers never observe a partially written manifest. With
    /// concurrent writers the last rename wins.
    pub async fn write_cached(&self, doc_id: &str, text: &str) -> HxResult<()> {
        let Some(dir) = &self.cache_dir else {
            return Ok(());
        };

        let name = self.file_name(doc_id)?;
        fs::create_dir_all(dir).await?;

        let path = dir.join(&name);
        let tmp_path = dir.join(format!(
            ".{}.{}.{}.tmp",
            name,
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&tmp_path, text).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %path.display(), "Saved manifest to file cache");
        Ok(())
    }

    /// Check that a document id maps to a valid file name
    pub fn check_doc_id(&self, doc_id: &str) -> HxResult<()> {
        self.file_name(doc_id).map(|_| ())
    }

    /// Remove a manifest from the cache tier
    pub async fn remove_cached(&self, doc_id: &str) -> HxResult<()> {
        let Some(dir) = &self.cache_dir else {
            return Ok(());
        };

        let path = dir.join(self.file_name(doc_id)?);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

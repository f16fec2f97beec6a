//! Local-disk cache in front of the object store
//!
//! The cache directory is flat: one `.npy` file per reference, named by
//! [`FeatureReference::cache_file_name`]. Existence of the file is the hit
//! signal; there is no manifest and no freshness check. Files are written to
//! a temporary file in the same directory and renamed into place, so a
//! reader never sees a partial file. Two concurrent misses for the same
//! reference both fetch and both rename; the content is identical.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::cache::codec::{decode_spectrogram, encode_spectrogram};
use crate::cache::reference::FeatureReference;
use crate::cache::store::ObjectStore;
use crate::error::{PipelineError, Result};
use crate::features::spectrogram::Spectrogram;

/// Spectrogram cache backed by an [`ObjectStore`]
#[derive(Clone)]
pub struct FeatureCache {
    dir: PathBuf,
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for FeatureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureCache")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FeatureCache {
    /// Open (creating if needed) a cache directory
    pub fn new(dir: impl Into<PathBuf>, store: Arc<dyn ObjectStore>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            PipelineError::CacheError(format!(
                "Failed to create cache directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir, store })
    }

    /// Cache directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Local file a reference is cached under
    pub fn cache_path(&self, reference: &FeatureReference) -> PathBuf {
        self.dir.join(reference.cache_file_name())
    }

    /// Whether `reference` is already cached locally
    pub fn contains(&self, reference: &FeatureReference) -> bool {
        self.cache_path(reference).is_file()
    }

    /// Resolve a remote reference to its raw spectrogram
    ///
    /// A cache hit is returned without contacting the store. A miss fetches
    /// `bucket/key`, decodes it, and fills the cache before returning.
    ///
    /// # Errors
    ///
    /// - `PipelineError::ReferenceError` for a local reference
    /// - `PipelineError::FetchError` if the object cannot be fetched
    /// - `PipelineError::CacheError` if the body or cached file is not a
    ///   valid spectrogram, or the cache cannot be written
    pub fn get(&self, reference: &FeatureReference) -> Result<Spectrogram> {
        let FeatureReference::Remote { bucket, key } = reference else {
            return Err(PipelineError::ReferenceError(format!(
                "{} is not a store reference",
                reference
            )));
        };

        self.get_or_insert_with(reference, || {
            log::debug!("Cache miss for {}, fetching from store", reference);
            let body = self.store.get(bucket, key)?;
            let spectrogram = decode_spectrogram(&body)?;
            log::info!("Fetched {} ({} bytes) into the cache", reference, body.len());
            Ok(spectrogram)
        })
    }

    /// Return the cached spectrogram for `reference`, or compute and cache it
    pub fn get_or_insert_with<F>(
        &self,
        reference: &FeatureReference,
        compute: F,
    ) -> Result<Spectrogram>
    where
        F: FnOnce() -> Result<Spectrogram>,
    {
        let path = self.cache_path(reference);
        if path.is_file() {
            log::debug!("Cache hit for {}", reference);
            return self.read_cached(&path);
        }

        let spectrogram = compute()?;
        self.write_cached(&path, &encode_spectrogram(&spectrogram)?)?;
        Ok(spectrogram)
    }

    /// Upload a spectrogram as `bucket/key` and cache it locally
    ///
    /// Returns the canonical reference for the new object.
    pub fn put(
        &self,
        bucket: &str,
        key: &str,
        spectrogram: &Spectrogram,
    ) -> Result<FeatureReference> {
        let reference = FeatureReference::remote(bucket, key);
        let body = encode_spectrogram(spectrogram)?;
        self.store.put(bucket, key, &body)?;
        self.write_cached(&self.cache_path(&reference), &body)?;
        log::debug!("Uploaded {} ({} bytes)", reference, body.len());
        Ok(reference)
    }

    fn read_cached(&self, path: &Path) -> Result<Spectrogram> {
        let body = fs::read(path).map_err(|e| {
            PipelineError::CacheError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        decode_spectrogram(&body)
    }

    fn write_cached(&self, path: &Path, body: &[u8]) -> Result<()> {
        let cache_error = |e: std::io::Error| {
            PipelineError::CacheError(format!("Failed to write {}: {}", path.display(), e))
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(cache_error)?;
        tmp.write_all(body).map_err(cache_error)?;
        tmp.persist(path).map_err(|e| cache_error(e.error))?;
        Ok(())
    }
}

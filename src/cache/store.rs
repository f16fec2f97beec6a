//! Object store boundary
//!
//! The feature cache talks to remote storage only through [`ObjectStore`].
//! Two implementations ship with the crate: a directory mirror and an
//! in-process map.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cache::reference::FeatureReference;
use crate::config::StoreConfig;
use crate::error::{PipelineError, Result};

/// Read/write access to bucketed objects
pub trait ObjectStore: Send + Sync {
    /// Fetch the full body of `bucket/key`
    ///
    /// # Errors
    ///
    /// `PipelineError::FetchError` if the object is missing or unreadable.
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Store `body` under `bucket/key`, replacing any existing object
    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()>;
}

fn fetch_error(bucket: &str, key: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::FetchError {
        reference: FeatureReference::remote(bucket, key).to_string(),
        message: message.into(),
    }
}

/// Store backed by a local directory laid out as `root/bucket/key`
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let relative = Path::new(bucket).join(key);
        let only_normal = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if bucket.is_empty() || key.is_empty() || !only_normal {
            return Err(PipelineError::ReferenceError(
                FeatureReference::remote(bucket, key).to_string(),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for LocalObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).map_err(|e| fetch_error(bucket, key, e.to_string()))
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, body)?;
        log::debug!("Stored {} bytes at {}", body.len(), path.display());
        Ok(())
    }
}

/// In-process store
///
/// Counts `get` calls so callers can observe cache behaviour.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fetches: AtomicUsize,
}

impl MemoryObjectStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served so far, including failed ones
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `bucket/key` exists
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .lock()
            .map(|m| m.contains_key(&(bucket.to_string(), key.to_string())))
            .unwrap_or(false)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let objects = self
            .objects
            .lock()
            .map_err(|_| fetch_error(bucket, key, "store lock poisoned"))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| fetch_error(bucket, key, "no such object"))
    }

    fn put(&self, bucket: &str, key: &str, body: &[u8]) -> Result<()> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| PipelineError::CacheError("store lock poisoned".to_string()))?;
        objects.insert((bucket.to_string(), key.to_string()), body.to_vec());
        Ok(())
    }
}

/// Build the store described by `config`
///
/// # Errors
///
/// `PipelineError::ConfigError` if the settings are incomplete, the
/// credentials cannot be resolved, or no backend is configured.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ObjectStore>> {
    config.validate()?;
    match &config.root {
        Some(root) => {
            log::info!(
                "Using local object store at {} (bucket {}, region {})",
                root.display(),
                config.bucket,
                config.region
            );
            Ok(Arc::new(LocalObjectStore::new(root.clone())))
        }
        None => Err(PipelineError::ConfigError(
            "store.root must be set to a local mirror directory".to_string(),
        )),
    }
}

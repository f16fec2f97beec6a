//! Configuration parameters for the spectrogram pipeline
//!
//! Every struct has a documented `Default` and can be deserialized from TOML
//! with missing fields falling back to those defaults:
//!
//! ```toml
//! batch_size = 16
//! cache_dir = "/var/cache/genre-dsp"
//!
//! [tensor]
//! channels = 3
//!
//! [store]
//! bucket = "aims3"
//! region = "us-east-2"
//! root = "/mnt/aims3"
//! credentials = { provider = "environment" }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Environment variable holding the access key id for [`CredentialsProvider::Environment`]
pub const ACCESS_KEY_ENV: &str = "AWS_ACCESS_KEY_ID";

/// Environment variable holding the secret key for [`CredentialsProvider::Environment`]
pub const SECRET_KEY_ENV: &str = "AWS_SECRET_ACCESS_KEY";

/// Mel-spectrogram extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Number of mel bands (default: 128)
    pub n_mels: usize,

    /// FFT frame size (default: 2048)
    pub n_fft: usize,

    /// Hop size between frames (default: 512)
    pub hop_length: usize,

    /// Lowest mel filter edge in Hz (default: 0.0)
    pub fmin: f32,

    /// Highest mel filter edge in Hz (default: 8000.0)
    pub fmax: f32,

    /// Dynamic range floor below the peak in dB (default: Some(80.0))
    /// `None` keeps the full range down to `amin`.
    pub top_db: Option<f32>,

    /// Power floor applied before taking the logarithm (default: 1e-10)
    pub amin: f32,

    /// Sample rate audio is resampled to before extraction (default: Some(22050))
    /// `None` extracts at the native rate.
    pub target_sample_rate: Option<u32>,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            n_mels: 128,
            n_fft: 2048,
            hop_length: 512,
            fmin: 0.0,
            fmax: 8000.0,
            top_db: Some(80.0),
            amin: 1e-10,
            target_sample_rate: Some(22050),
        }
    }
}

impl SpectrogramConfig {
    /// Check the parameters are usable for extraction
    pub fn validate(&self) -> Result<()> {
        if self.n_mels == 0 {
            return Err(PipelineError::ConfigError("n_mels must be > 0".to_string()));
        }
        if self.n_fft < 2 {
            return Err(PipelineError::ConfigError("n_fft must be >= 2".to_string()));
        }
        if self.hop_length == 0 {
            return Err(PipelineError::ConfigError(
                "hop_length must be > 0".to_string(),
            ));
        }
        if !(self.fmin >= 0.0 && self.fmax > self.fmin) {
            return Err(PipelineError::ConfigError(format!(
                "Invalid mel frequency range: fmin={}, fmax={}",
                self.fmin, self.fmax
            )));
        }
        if !(self.amin > 0.0) {
            return Err(PipelineError::ConfigError("amin must be > 0".to_string()));
        }
        if let Some(top_db) = self.top_db {
            if !(top_db >= 0.0) {
                return Err(PipelineError::ConfigError(
                    "top_db must be non-negative".to_string(),
                ));
            }
        }
        if self.target_sample_rate == Some(0) {
            return Err(PipelineError::ConfigError(
                "target_sample_rate must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixed model input shape (height x width x channels)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TensorShape {
    /// Rows, one per mel band (default: 128)
    pub height: usize,

    /// Columns, one per time frame (default: 1024)
    pub width: usize,

    /// Channel count, 1 or 3 (default: 1)
    pub channels: usize,
}

impl Default for TensorShape {
    fn default() -> Self {
        Self {
            height: 128,
            width: 1024,
            channels: 1,
        }
    }
}

impl TensorShape {
    /// Shape with the given channel count and default height/width
    pub fn with_channels(channels: usize) -> Self {
        Self {
            channels,
            ..Self::default()
        }
    }

    /// Check the shape is one the tensor builder can produce
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(PipelineError::InvalidInput(format!(
                "Target shape must be non-empty, got {}x{}",
                self.height, self.width
            )));
        }
        if self.channels != 1 && self.channels != 3 {
            return Err(PipelineError::InvalidInput(format!(
                "Channel count must be 1 or 3, got {}",
                self.channels
            )));
        }
        Ok(())
    }
}

/// Where remote-store credentials come from
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum CredentialsProvider {
    /// Read `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` at startup
    Environment,
    /// Keys given inline in the configuration
    Static {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        secret_access_key: String,
    },
    /// Public bucket, no credentials
    Anonymous,
}

impl fmt::Debug for CredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialsProvider::Environment => write!(f, "Environment"),
            CredentialsProvider::Static { access_key_id, .. } => f
                .debug_struct("Static")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<redacted>")
                .finish(),
            CredentialsProvider::Anonymous => write!(f, "Anonymous"),
        }
    }
}

/// Resolved store credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

impl CredentialsProvider {
    /// Resolve credentials now, failing if the provider cannot supply them
    ///
    /// Returns `None` for anonymous access.
    pub fn resolve(&self) -> Result<Option<Credentials>> {
        match self {
            CredentialsProvider::Anonymous => Ok(None),
            CredentialsProvider::Static {
                access_key_id,
                secret_access_key,
            } => {
                if access_key_id.is_empty() || secret_access_key.is_empty() {
                    return Err(PipelineError::ConfigError(
                        "Static credentials must set both access_key_id and secret_access_key"
                            .to_string(),
                    ));
                }
                Ok(Some(Credentials {
                    access_key_id: access_key_id.clone(),
                    secret_access_key: secret_access_key.clone(),
                }))
            }
            CredentialsProvider::Environment => {
                let read = |name: &str| {
                    std::env::var(name)
                        .ok()
                        .filter(|v| !v.is_empty())
                        .ok_or_else(|| {
                            PipelineError::ConfigError(format!(
                                "Environment variable {} is not set",
                                name
                            ))
                        })
                };
                Ok(Some(Credentials {
                    access_key_id: read(ACCESS_KEY_ENV)?,
                    secret_access_key: read(SECRET_KEY_ENV)?,
                }))
            }
        }
    }
}

/// Remote object store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default bucket for uploads
    pub bucket: String,

    /// Store region
    pub region: String,

    /// Credentials source
    pub credentials: CredentialsProvider,

    /// Local directory mirroring the store (`root/bucket/key`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StoreConfig {
    /// Fail fast on incomplete store settings
    pub fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            return Err(PipelineError::ConfigError(
                "store.bucket must not be empty".to_string(),
            ));
        }
        if self.region.trim().is_empty() {
            return Err(PipelineError::ConfigError(
                "store.region must not be empty".to_string(),
            ));
        }
        self.credentials.resolve()?;
        Ok(())
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Extraction parameters
    pub spectrogram: SpectrogramConfig,

    /// Model input shape
    pub tensor: TensorShape,

    /// Entries per batch (default: 32)
    pub batch_size: usize,

    /// Local feature cache directory (default: `spectrogram_cache`)
    pub cache_dir: PathBuf,

    /// Shuffle seed; `None` seeds from the OS
    pub seed: Option<u64>,

    /// Remote store; required by anything that resolves `store://` references
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Persisted genre map; the built-in canonical map is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre_map_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            spectrogram: SpectrogramConfig::default(),
            tensor: TensorShape::default(),
            batch_size: 32,
            cache_dir: PathBuf::from("spectrogram_cache"),
            seed: None,
            store: None,
            genre_map_path: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document and validate it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(source)
            .map_err(|e| PipelineError::ConfigError(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&source).inspect_err(|e| {
            log::error!("Rejected configuration {}: {}", path.display(), e);
        })
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.spectrogram.validate()?;
        self.tensor
            .validate()
            .map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        if self.batch_size == 0 {
            return Err(PipelineError::ConfigError(
                "batch_size must be > 0".to_string(),
            ));
        }
        if let Some(store) = &self.store {
            store.validate()?;
        }
        Ok(())
    }
}

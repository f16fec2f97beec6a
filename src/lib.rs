//! # Genre DSP
//!
//! Audio feature pipeline for music genre classification: mel-spectrogram
//! extraction, fixed-shape model input tensors, a local cache in front of a
//! remote object store, and a batch generator for training and evaluation.
//!
//! ## Features
//!
//! - **Extraction**: librosa-compatible log-power mel spectrograms (Slaney
//!   mel scale, dB relative to the item's peak, 80 dB floor)
//! - **Shaping**: symmetric zero-pad or prefix crop to 128 x 1024, per-item
//!   min-max normalization, 1 or 3 channels
//! - **Caching**: `store://bucket/key` references resolved through a flat
//!   local `.npy` cache
//! - **Batching**: ragged-last-batch generator with per-item skip on failure
//!   and seeded shuffling at epoch boundaries
//! - **Inference**: top-3 genre predictions from a pluggable model
//!
//! ## Quick Start
//!
//! ```no_run
//! use genre_dsp::{prepare_input, PipelineConfig};
//!
//! let samples = vec![0.0f32; 44100]; // one second of mono audio
//! let tensor = prepare_input(&samples, 44100, &PipelineConfig::default())?;
//! assert_eq!(tensor.dim(), (128, 1024, 1));
//! # Ok::<(), genre_dsp::PipelineError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Audio → Decode/Downmix → Resample → Mel Spectrogram → Cache
//!       → Pad/Normalize → Batch → Model
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod io;
pub mod preprocessing;

use std::path::Path;
use std::sync::Arc;

use ndarray::Array3;

// Re-export main types
pub use cache::{FeatureCache, FeatureReference, ObjectStore};
pub use config::{PipelineConfig, SpectrogramConfig, StoreConfig, TensorShape};
pub use dataset::{
    Batch, BatchGenerator, BatchSource, DataIndex, DataIndexEntry, FeatureLoader, GenreMap,
    SpectrogramSource,
};
pub use error::{PipelineError, Result};
pub use features::Spectrogram;
pub use inference::{Classifier, GenreModel, GenrePrediction, ModelHandle};

/// Turn mono samples into a model input tensor
///
/// Extracts the mel spectrogram with `config.spectrogram` and shapes it to
/// `config.tensor`.
///
/// # Arguments
///
/// * `samples` - Mono audio samples in [-1.0, 1.0]
/// * `sample_rate` - Sample rate in Hz
/// * `config` - Pipeline configuration
///
/// # Returns
///
/// Tensor of shape `(height, width, channels)` with values in [0, 1]
///
/// # Errors
///
/// Returns `PipelineError` if the input is empty or non-finite, or the
/// configuration is unusable.
pub fn prepare_input(
    samples: &[f32],
    sample_rate: u32,
    config: &PipelineConfig,
) -> Result<Array3<f32>> {
    log::debug!(
        "Preparing model input: {} samples at {} Hz",
        samples.len(),
        sample_rate
    );
    let spectrogram =
        features::mel::extract_mel_spectrogram(samples, sample_rate, &config.spectrogram)?;
    features::tensor::to_model_input(&spectrogram, &config.tensor)
}

/// Decode an audio file and turn it into a model input tensor
pub fn prepare_file(path: &Path, config: &PipelineConfig) -> Result<Array3<f32>> {
    let audio = io::decoder::decode_audio(path)?;
    prepare_input(&audio.samples, audio.sample_rate, config)
}

/// Genre map from `config.genre_map_path`, or the canonical map
pub fn load_genre_map(config: &PipelineConfig) -> Result<GenreMap> {
    match &config.genre_map_path {
        Some(path) => GenreMap::load(path),
        None => Ok(GenreMap::canonical()),
    }
}

/// Open the configured store and cache and build a [`FeatureLoader`]
///
/// # Errors
///
/// `PipelineError::ConfigError` if no store is configured or its settings
/// are incomplete; `PipelineError::CacheError` if the cache directory
/// cannot be created.
pub fn open_loader(config: &PipelineConfig) -> Result<FeatureLoader> {
    let store_config = config.store.as_ref().ok_or_else(|| {
        PipelineError::ConfigError("A [store] section is required to resolve features".to_string())
    })?;
    let store: Arc<dyn ObjectStore> = cache::open_store(store_config)?;
    let cache = FeatureCache::new(&config.cache_dir, store)?;
    Ok(FeatureLoader::new(cache, config.spectrogram.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_input_shape() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let tensor = prepare_input(&samples, 44100, &PipelineConfig::default()).unwrap();
        assert_eq!(tensor.dim(), (128, 1024, 1));
        assert!(tensor.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_prepare_input_empty() {
        assert!(matches!(
            prepare_input(&[], 22050, &PipelineConfig::default()),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_open_loader_requires_store() {
        let config = PipelineConfig::default();
        assert!(matches!(open_loader(&config), Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_open_loader_local_store() {
        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            cache_dir: dir.path().join("cache"),
            store: Some(StoreConfig {
                bucket: "aims3".to_string(),
                region: "us-east-2".to_string(),
                credentials: config::CredentialsProvider::Anonymous,
                root: Some(dir.path().join("mirror")),
            }),
            ..PipelineConfig::default()
        };
        let loader = open_loader(&config).unwrap();
        assert!(loader.cache().dir().exists());
    }

    #[test]
    fn test_load_genre_map_default() {
        let map = load_genre_map(&PipelineConfig::default()).unwrap();
        assert_eq!(map, GenreMap::canonical());
    }
}

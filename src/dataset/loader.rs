//! Resolving index entries to raw spectrograms

use std::path::Path;

use crate::cache::codec::decode_spectrogram;
use crate::cache::feature_cache::FeatureCache;
use crate::cache::reference::FeatureReference;
use crate::config::SpectrogramConfig;
use crate::error::{PipelineError, Result};
use crate::features::mel::extract_mel_spectrogram;
use crate::features::spectrogram::Spectrogram;
use crate::io::decoder::{decode_audio, is_audio_path};

/// Anything that can turn a feature reference string into a spectrogram
///
/// Errors are per-item: the batch generator skips entries whose load fails
/// with an error for which [`PipelineError::is_item_error`] holds.
pub trait SpectrogramSource {
    /// Load the raw spectrogram for `reference`
    fn load(&self, reference: &str) -> Result<Spectrogram>;
}

/// Default source: feature cache for store objects, direct reads for local
/// files
///
/// - `store://bucket/key` goes through [`FeatureCache::get`]
/// - a local `.npy` file is read as-is
/// - a local audio file is decoded and extracted; the spectrogram is cached
///   under the escaped path so later loads skip decoding
#[derive(Debug, Clone)]
pub struct FeatureLoader {
    cache: FeatureCache,
    spectrogram: SpectrogramConfig,
}

impl FeatureLoader {
    /// Create a loader over `cache`, extracting local audio with `spectrogram`
    pub fn new(cache: FeatureCache, spectrogram: SpectrogramConfig) -> Self {
        Self { cache, spectrogram }
    }

    /// Underlying cache
    pub fn cache(&self) -> &FeatureCache {
        &self.cache
    }

    fn load_local(&self, reference: &FeatureReference, path: &Path) -> Result<Spectrogram> {
        let is_npy = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("npy"))
            .unwrap_or(false);

        if is_npy {
            let body = std::fs::read(path).map_err(|e| {
                PipelineError::FetchError {
                    reference: reference.to_string(),
                    message: e.to_string(),
                }
            })?;
            return decode_spectrogram(&body);
        }

        if !is_audio_path(path) {
            return Err(PipelineError::ReferenceError(format!(
                "{} is neither a .npy file nor supported audio",
                path.display()
            )));
        }

        self.cache.get_or_insert_with(reference, || {
            let audio = decode_audio(path)?;
            extract_mel_spectrogram(&audio.samples, audio.sample_rate, &self.spectrogram)
        })
    }
}

impl SpectrogramSource for FeatureLoader {
    fn load(&self, reference: &str) -> Result<Spectrogram> {
        let parsed = FeatureReference::parse(reference)?;
        match &parsed {
            FeatureReference::Remote { .. } => self.cache.get(&parsed),
            FeatureReference::Local(path) => self.load_local(&parsed, path),
        }
    }
}

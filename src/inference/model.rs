//! Model boundary and the single-item classifier
//!
//! The network itself lives outside this crate. It is plugged in through
//! [`GenreModel`] and held behind an immutable [`ModelHandle`] created once
//! at startup; a handle that failed to load stays unavailable and every
//! classification reports [`PipelineError::ModelNotReady`].

use std::path::Path;
use std::sync::Arc;

use ndarray::{Array2, ArrayView4, Axis};

use crate::config::{PipelineConfig, SpectrogramConfig, TensorShape};
use crate::dataset::genre_map::GenreMap;
use crate::error::{PipelineError, Result};
use crate::features::mel::extract_mel_spectrogram;
use crate::features::spectrogram::Spectrogram;
use crate::features::tensor::to_model_input;
use crate::inference::predictions::{top_predictions, GenrePrediction, TOP_K};
use crate::io::decoder::{decode_audio, decode_audio_bytes};

/// A trained genre classifier
pub trait GenreModel: Send + Sync {
    /// Class probabilities for a batch
    ///
    /// `inputs` has shape `(n, height, width, channels)`; the result has
    /// shape `(n, num_classes)`.
    fn predict(&self, inputs: ArrayView4<'_, f32>) -> Result<Array2<f32>>;
}

/// Loaded model, or the reason it is missing
#[derive(Clone)]
pub enum ModelHandle {
    /// Model available for inference
    Ready(Arc<dyn GenreModel>),
    /// Loading failed at startup
    Unavailable(String),
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelHandle::Ready(_) => write!(f, "Ready"),
            ModelHandle::Unavailable(reason) => f.debug_tuple("Unavailable").field(reason).finish(),
        }
    }
}

impl ModelHandle {
    /// Handle from the outcome of a model load
    pub fn from_load(result: Result<Arc<dyn GenreModel>>) -> Self {
        match result {
            Ok(model) => ModelHandle::Ready(model),
            Err(e) => {
                log::error!("Model failed to load: {}", e);
                ModelHandle::Unavailable(e.to_string())
            }
        }
    }

    /// The model, or `ModelNotReady`
    pub fn model(&self) -> Result<&Arc<dyn GenreModel>> {
        match self {
            ModelHandle::Ready(model) => Ok(model),
            ModelHandle::Unavailable(reason) => Err(PipelineError::ModelNotReady(reason.clone())),
        }
    }

    /// Whether a model is loaded
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelHandle::Ready(_))
    }
}

/// Run `model` on a batch and check the output shape
pub(crate) fn predict_checked(
    model: &dyn GenreModel,
    inputs: ArrayView4<'_, f32>,
) -> Result<Array2<f32>> {
    let rows = inputs.len_of(Axis(0));
    let output = model.predict(inputs)?;
    if output.nrows() != rows {
        return Err(PipelineError::InferenceError(format!(
            "Model returned {} rows for {} inputs",
            output.nrows(),
            rows
        )));
    }
    Ok(output)
}

/// Audio → top-3 genre predictions
///
/// Built once and shared read-only; cloning is cheap.
#[derive(Debug, Clone)]
pub struct Classifier {
    model: ModelHandle,
    genres: Arc<GenreMap>,
    spectrogram: SpectrogramConfig,
    shape: TensorShape,
}

impl Classifier {
    /// Create a classifier with the extraction and shape settings of `config`
    pub fn new(model: ModelHandle, genres: Arc<GenreMap>, config: &PipelineConfig) -> Self {
        if let ModelHandle::Unavailable(reason) = &model {
            log::warn!("Classifier created without a model: {}", reason);
        }
        Self {
            model,
            genres,
            spectrogram: config.spectrogram.clone(),
            shape: config.tensor,
        }
    }

    /// Whether classification can succeed
    pub fn is_ready(&self) -> bool {
        self.model.is_ready()
    }

    /// Genre map used for labels
    pub fn genres(&self) -> &GenreMap {
        &self.genres
    }

    /// Classify an audio file
    pub fn classify_file(&self, path: &Path) -> Result<Vec<GenrePrediction>> {
        self.model.model()?;
        let audio = decode_audio(path)?;
        self.classify_samples(&audio.samples, audio.sample_rate)
    }

    /// Classify in-memory audio (e.g. an upload); `extension` is a format hint
    pub fn classify_bytes(
        &self,
        bytes: Vec<u8>,
        extension: Option<&str>,
    ) -> Result<Vec<GenrePrediction>> {
        self.model.model()?;
        let audio = decode_audio_bytes(bytes, extension)?;
        self.classify_samples(&audio.samples, audio.sample_rate)
    }

    /// Classify mono samples
    pub fn classify_samples(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Vec<GenrePrediction>> {
        self.model.model()?;
        let spectrogram = extract_mel_spectrogram(samples, sample_rate, &self.spectrogram)?;
        self.classify_spectrogram(&spectrogram)
    }

    /// Classify a raw spectrogram
    pub fn classify_spectrogram(&self, spectrogram: &Spectrogram) -> Result<Vec<GenrePrediction>> {
        let model = self.model.model()?;
        let input = to_model_input(spectrogram, &self.shape)?.insert_axis(Axis(0));
        let output = predict_checked(model.as_ref(), input.view())?;

        let predictions = top_predictions(output.row(0), &self.genres, TOP_K)?;
        log::debug!("Predictions: {:?}", predictions);
        Ok(predictions)
    }
}

//! Fixed-shape model input tensors
//!
//! Turns a variable-length [`Spectrogram`] into a `(height, width, channels)`
//! array with values in [0, 1]:
//!
//! 1. [`padding::fit_to_shape`] pads/crops to `(height, width)`
//! 2. [`normalization::min_max_normalize`] scales the padded matrix per item
//! 3. [`normalization::expand_channels`] adds and replicates the channel axis
//!
//! # Example
//!
//! ```
//! use genre_dsp::config::TensorShape;
//! use genre_dsp::features::spectrogram::Spectrogram;
//! use genre_dsp::features::tensor::to_model_input;
//! use ndarray::Array2;
//!
//! let spectrogram = Spectrogram::new(Array2::from_elem((128, 300), -20.0));
//! let tensor = to_model_input(&spectrogram, &TensorShape::default())?;
//! assert_eq!(tensor.dim(), (128, 1024, 1));
//! # Ok::<(), genre_dsp::PipelineError>(())
//! ```

pub mod normalization;
pub mod padding;

use ndarray::Array3;

use crate::config::TensorShape;
use crate::error::Result;
use crate::features::spectrogram::Spectrogram;

pub use normalization::{expand_channels, min_max_normalize};
pub use padding::fit_to_shape;

/// Build the model input tensor for one spectrogram
///
/// # Errors
///
/// Returns `PipelineError::InvalidInput` if `shape` has a zero dimension or a
/// channel count other than 1 or 3.
pub fn to_model_input(spectrogram: &Spectrogram, shape: &TensorShape) -> Result<Array3<f32>> {
    shape.validate()?;

    let fitted = fit_to_shape(spectrogram.view(), shape.height, shape.width);
    let normalized = min_max_normalize(&fitted);
    Ok(expand_channels(&normalized, shape.channels))
}

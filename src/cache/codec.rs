//! `.npy` encoding for spectrograms
//!
//! `float32` is written; `float64` arrays are accepted on read and narrowed.

use std::io::Cursor;

use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::error::{PipelineError, Result};
use crate::features::spectrogram::Spectrogram;

/// Serialize a spectrogram as a 2-D `float32` `.npy` body
pub fn encode_spectrogram(spectrogram: &Spectrogram) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    spectrogram
        .as_array()
        .write_npy(&mut body)
        .map_err(|e| PipelineError::CacheError(format!("Failed to encode .npy: {}", e)))?;
    Ok(body)
}

/// Parse a 2-D `.npy` body (`float32` or `float64`)
///
/// # Errors
///
/// - `PipelineError::CacheError` if the body is not a 2-D float array or is
///   empty
/// - `PipelineError::NumericalError` if any value is NaN or infinite
pub fn decode_spectrogram(body: &[u8]) -> Result<Spectrogram> {
    let data = match Array2::<f32>::read_npy(Cursor::new(body)) {
        Ok(data) => data,
        Err(f32_err) => Array2::<f64>::read_npy(Cursor::new(body))
            .map(|wide| wide.mapv(|v| v as f32))
            .map_err(|_| {
                PipelineError::CacheError(format!("Failed to decode .npy: {}", f32_err))
            })?,
    };

    if data.is_empty() {
        return Err(PipelineError::CacheError(
            "Decoded spectrogram is empty".to_string(),
        ));
    }
    if let Some(bad) = data.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::NumericalError(format!(
            "Decoded spectrogram has a non-finite value at element {}",
            bad
        )));
    }
    Ok(Spectrogram::new(data))
}

//! Raw spectrogram container

use ndarray::{Array2, ArrayView2};

/// Log-power mel spectrogram
///
/// Rows are mel bands, columns are time frames. Values are in dB relative to
/// the item's own peak, so the maximum is 0 and everything else is <= 0.
/// Immutable once built; this is the unit stored in the feature cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    data: Array2<f32>,
}

impl Spectrogram {
    /// Wrap a `(mel bands, frames)` matrix
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Number of mel bands (rows)
    pub fn n_mels(&self) -> usize {
        self.data.nrows()
    }

    /// Number of time frames (columns)
    pub fn n_frames(&self) -> usize {
        self.data.ncols()
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Borrow the underlying matrix
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Reference to the underlying matrix
    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    /// Take the underlying matrix
    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

impl From<Array2<f32>> for Spectrogram {
    fn from(data: Array2<f32>) -> Self {
        Self::new(data)
    }
}

//! Pad/crop a spectrogram to a fixed shape
//!
//! Each axis is handled independently:
//! - shorter than the target: zero-pad symmetrically, the odd extra row
//!   (column) going to the bottom (right)
//! - longer than the target: keep the first `target` rows (columns)

use ndarray::{s, Array2, ArrayView2};

/// Leading pad and number of kept elements along one axis
fn axis_plan(current: usize, target: usize) -> (usize, usize) {
    if current < target {
        ((target - current) / 2, current)
    } else {
        (0, target)
    }
}

/// Fit `input` to exactly `(height, width)`
pub fn fit_to_shape(input: ArrayView2<'_, f32>, height: usize, width: usize) -> Array2<f32> {
    let (rows, cols) = input.dim();
    let (top, kept_rows) = axis_plan(rows, height);
    let (left, kept_cols) = axis_plan(cols, width);

    let mut output = Array2::<f32>::zeros((height, width));
    output
        .slice_mut(s![top..top + kept_rows, left..left + kept_cols])
        .assign(&input.slice(s![..kept_rows, ..kept_cols]));
    output
}

//! Per-item min-max normalization and channel expansion

use ndarray::{Array2, Array3, Axis};

/// Scale `input` into [0, 1] using its own minimum and maximum
///
/// `(x - min) / (max - min)` over the finite elements. Non-finite elements
/// map to 0. When `max == min` (constant input such as silence) or there are
/// no finite elements, the result is all zeros.
pub fn min_max_normalize(input: &Array2<f32>) -> Array2<f32> {
    let (min, max) = input
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !(range.is_finite() && range > 0.0) {
        log::debug!(
            "Constant or degenerate spectrogram (min={}, max={}), normalizing to zeros",
            min,
            max
        );
        return Array2::zeros(input.raw_dim());
    }

    input.mapv(|v| {
        if v.is_finite() {
            ((v - min) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    })
}

/// Add a trailing channel axis, replicating the plane `channels` times
pub fn expand_channels(plane: &Array2<f32>, channels: usize) -> Array3<f32> {
    let (height, width) = plane.dim();
    let single = plane.view().insert_axis(Axis(2));
    match single.broadcast((height, width, channels)) {
        Some(view) => view.to_owned(),
        None => Array3::zeros((height, width, channels)),
    }
}

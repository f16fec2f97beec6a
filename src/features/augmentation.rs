//! Waveform augmentation for training data
//!
//! Both operations take the RNG explicitly so ingest runs are reproducible
//! from a seed.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Default maximum shift as a fraction of the signal length
pub const DEFAULT_SHIFT_MAX: f32 = 0.5;

/// Default noise amplitude
pub const DEFAULT_NOISE_FACTOR: f32 = 0.005;

/// Circularly roll `samples` by a random offset
///
/// The offset is `uniform(-shift_max, shift_max) * len` samples; positive
/// offsets move samples towards the end.
pub fn time_shift<R: Rng + ?Sized>(samples: &[f32], shift_max: f32, rng: &mut R) -> Vec<f32> {
    let len = samples.len();
    if len == 0 || !(shift_max > 0.0) {
        return samples.to_vec();
    }

    let fraction: f32 = rng.random_range(-shift_max..shift_max);
    let shift = (fraction * len as f32) as isize;
    let offset = shift.rem_euclid(len as isize) as usize;

    let mut shifted = samples.to_vec();
    shifted.rotate_right(offset);
    shifted
}

/// Add standard-normal noise scaled by `noise_factor`
pub fn add_noise<R: Rng + ?Sized>(samples: &[f32], noise_factor: f32, rng: &mut R) -> Vec<f32> {
    samples
        .iter()
        .map(|&s| {
            let n: f32 = StandardNormal.sample(rng);
            s + noise_factor * n
        })
        .collect()
}

//! Mel filterbank (Slaney scale, Slaney area normalization)
//!
//! Matches librosa's `filters.mel(htk=False, norm='slaney')`: the mel scale is
//! linear below 1 kHz and logarithmic above, and each triangular filter is
//! scaled by `2 / (f_right - f_left)` so that filters have equal area.

use ndarray::Array2;

/// Hz per mel in the linear region
const F_SP: f64 = 200.0 / 3.0;

/// Start of the logarithmic region in Hz
const MIN_LOG_HZ: f64 = 1000.0;

/// Start of the logarithmic region in mels
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Step size of the logarithmic region
fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Triangular mel filterbank
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    /// Filter weights, shape `(n_mels, n_fft / 2 + 1)`
    weights: Array2<f32>,
}

impl MelFilterbank {
    /// Build the filterbank
    ///
    /// # Arguments
    ///
    /// * `n_mels` - Number of mel bands
    /// * `n_fft` - FFT size the power spectrum was computed with
    /// * `sample_rate` - Sample rate in Hz
    /// * `fmin` / `fmax` - Frequency range covered by the filters
    pub fn new(n_mels: usize, n_fft: usize, sample_rate: u32, fmin: f32, fmax: f32) -> Self {
        let n_bins = n_fft / 2 + 1;
        let fft_freqs: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        let mel_min = hz_to_mel(fmin as f64);
        let mel_max = hz_to_mel(fmax as f64);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = Array2::<f32>::zeros((n_mels, n_bins));
        let mut empty_filters = 0usize;

        for m in 0..n_mels {
            let left = mel_points[m];
            let center = mel_points[m + 1];
            let right = mel_points[m + 2];
            let lower_width = center - left;
            let upper_width = right - center;
            let enorm = 2.0 / (right - left);

            let mut any = false;
            for (k, &freq) in fft_freqs.iter().enumerate() {
                let lower = (freq - left) / lower_width;
                let upper = (right - freq) / upper_width;
                let w = lower.min(upper).max(0.0);
                if w > 0.0 {
                    weights[[m, k]] = (w * enorm) as f32;
                    any = true;
                }
            }
            if !any {
                empty_filters += 1;
            }
        }

        if empty_filters > 0 {
            log::warn!(
                "{} of {} mel filters are empty (n_fft={}, sample_rate={}, fmax={}); \
                 consider fewer mel bands",
                empty_filters,
                n_mels,
                n_fft,
                sample_rate,
                fmax
            );
        }

        Self { weights }
    }

    /// Number of mel bands
    pub fn n_mels(&self) -> usize {
        self.weights.nrows()
    }

    /// Filter weights, shape `(n_mels, n_fft / 2 + 1)`
    pub fn weights(&self) -> &Array2<f32> {
        &self.weights
    }

    /// Project a `(bins, frames)` power spectrogram onto the mel bands
    pub fn apply(&self, power: &Array2<f32>) -> Array2<f32> {
        self.weights.dot(power)
    }
}

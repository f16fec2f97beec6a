//! Log-power mel spectrogram extraction
//!
//! # Algorithm
//!
//! 1. Optionally resample to `target_sample_rate`
//! 2. Centered STFT power spectrum (`n_fft`, `hop_length`, periodic Hann)
//! 3. Project onto `n_mels` Slaney mel filters between `fmin` and `fmax`
//! 4. Convert to dB referenced to the item's own maximum, floored at
//!    `max - top_db`
//!
//! # Example
//!
//! ```no_run
//! use genre_dsp::config::SpectrogramConfig;
//! use genre_dsp::features::mel::extract_mel_spectrogram;
//!
//! let samples = vec![0.0f32; 22050 * 30];
//! let spectrogram = extract_mel_spectrogram(&samples, 22050, &SpectrogramConfig::default())?;
//! assert_eq!(spectrogram.n_mels(), 128);
//! # Ok::<(), genre_dsp::PipelineError>(())
//! ```

pub mod filterbank;
pub mod stft;

use ndarray::Array2;

use crate::config::SpectrogramConfig;
use crate::error::{PipelineError, Result};
use crate::features::spectrogram::Spectrogram;
use crate::preprocessing::resample::resample_linear;

pub use filterbank::MelFilterbank;

/// Convert a power spectrogram to decibels relative to its maximum
///
/// `10 * log10(max(amin, S)) - 10 * log10(max(amin, max(S)))`, then floored
/// at `peak - top_db` when `top_db` is set. A spectrogram whose maximum is
/// not positive (silence) maps to all zeros.
pub fn power_to_db(power: &Array2<f32>, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let reference = power.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    if !(reference.is_finite() && reference > 0.0) {
        log::debug!("Power spectrogram has no positive energy, returning all-zero dB");
        return Array2::zeros(power.raw_dim());
    }

    let ref_db = 10.0 * reference.max(amin).log10();
    let mut db = power.mapv(|p| 10.0 * p.max(amin).log10() - ref_db);

    if let Some(top_db) = top_db {
        let peak = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = peak - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }

    db
}

/// Extract a log-power mel spectrogram from mono samples
///
/// # Arguments
///
/// * `samples` - Mono audio samples
/// * `sample_rate` - Sample rate of `samples` in Hz
/// * `config` - Extraction parameters
///
/// # Returns
///
/// `Spectrogram` of shape `(n_mels, frames)` with values <= 0 dB
///
/// # Errors
///
/// Returns `PipelineError::InvalidInput` for empty input or a zero sample
/// rate, `PipelineError::NumericalError` for non-finite samples and
/// `PipelineError::ConfigError` for unusable parameters.
pub fn extract_mel_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    config: &SpectrogramConfig,
) -> Result<Spectrogram> {
    if samples.is_empty() {
        return Err(PipelineError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if sample_rate == 0 {
        return Err(PipelineError::InvalidInput(
            "Invalid sample rate".to_string(),
        ));
    }
    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        return Err(PipelineError::NumericalError(format!(
            "Non-finite sample at index {}",
            i
        )));
    }
    config.validate()?;

    let (samples, sample_rate) = match config.target_sample_rate {
        Some(target) if target != sample_rate => {
            (resample_linear(samples, sample_rate, target), target)
        }
        _ => (samples.to_vec(), sample_rate),
    };

    log::debug!(
        "Extracting mel spectrogram: {} samples at {} Hz, {} mels, fmax={}",
        samples.len(),
        sample_rate,
        config.n_mels,
        config.fmax
    );

    let power = stft::power_spectrogram(&samples, config.n_fft, config.hop_length)?;
    let filterbank = MelFilterbank::new(
        config.n_mels,
        config.n_fft,
        sample_rate,
        config.fmin,
        config.fmax,
    );
    let mel = filterbank.apply(&power);
    let db = power_to_db(&mel, config.amin, config.top_db);

    Ok(Spectrogram::new(db))
}

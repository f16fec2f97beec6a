//! Short-time power spectrum
//!
//! Centered STFT with a periodic Hann window: the signal is zero-padded by
//! `n_fft / 2` on both sides, so there are `1 + len / hop` frames and frame
//! `t` is centered on sample `t * hop`.

use ndarray::Array2;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::{PipelineError, Result};
use crate::io::sample_buffer::SampleBuffer;

struct StftWorkspace {
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

/// Periodic Hann window of length `size`
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / size as f32).cos())
        .collect()
}

/// Compute the power spectrogram `|STFT|^2`
///
/// # Returns
///
/// Matrix of shape `(n_fft / 2 + 1, frames)`
///
/// # Errors
///
/// Returns `PipelineError::InvalidInput` for empty input or zero sizes.
pub fn power_spectrogram(samples: &[f32], n_fft: usize, hop_length: usize) -> Result<Array2<f32>> {
    if samples.is_empty() {
        return Err(PipelineError::InvalidInput(
            "Empty audio samples".to_string(),
        ));
    }
    if n_fft < 2 || hop_length == 0 {
        return Err(PipelineError::InvalidInput(format!(
            "Invalid STFT parameters: n_fft={}, hop_length={}",
            n_fft, hop_length
        )));
    }

    let frames = SampleBuffer::centered(samples, n_fft, hop_length);
    let frame_count = frames.window_count();
    let n_bins = n_fft / 2 + 1;
    let window = hann_window(n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let scratch_len = fft.get_inplace_scratch_len();

    log::debug!(
        "STFT: {} samples, n_fft={}, hop={}, {} frames",
        samples.len(),
        n_fft,
        hop_length,
        frame_count
    );

    let columns: Vec<Vec<f32>> = (0..frame_count)
        .into_par_iter()
        .map_init(
            || StftWorkspace {
                buffer: vec![Complex::new(0.0, 0.0); n_fft],
                scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            },
            |workspace, frame_index| {
                // window_count() bounds frame_index, so the window always exists
                let frame = frames.window(frame_index).unwrap_or(&[]);
                for (i, slot) in workspace.buffer.iter_mut().enumerate() {
                    let sample = frame.get(i).copied().unwrap_or(0.0);
                    *slot = Complex::new(sample * window[i], 0.0);
                }
                fft.process_with_scratch(&mut workspace.buffer, &mut workspace.scratch);
                workspace.buffer[..n_bins]
                    .iter()
                    .map(|c| c.norm_sqr())
                    .collect()
            },
        )
        .collect();

    let mut power = Array2::<f32>::zeros((n_bins, frame_count));
    for (t, column) in columns.iter().enumerate() {
        for (bin, &value) in column.iter().enumerate() {
            power[[bin, t]] = value;
        }
    }

    Ok(power)
}

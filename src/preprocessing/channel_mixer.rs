//! Channel mixing (multichannel to mono conversion)

use crate::error::{PipelineError, Result};

/// Average interleaved frames of `channels` samples into mono
///
/// A trailing partial frame is dropped.
///
/// # Errors
///
/// Returns `PipelineError::InvalidInput` if `channels` is zero.
pub fn downmix_interleaved(interleaved: &[f32], channels: usize) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(PipelineError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::trace!("Downmixing {} interleaved channels", channels);

    let scale = 1.0 / channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downmix_stereo() {
        let interleaved = [1.0, 3.0, 2.0, 4.0, 9.0];
        let mono = downmix_interleaved(&interleaved, 2).unwrap();
        assert_eq!(mono, vec![2.0, 3.0]);
    }

    #[test]
    fn test_downmix_passthrough() {
        let passthrough = downmix_interleaved(&[0.1, 0.2], 1).unwrap();
        assert_eq!(passthrough, vec![0.1, 0.2]);
    }

    #[test]
    fn test_downmix_six_channels() {
        let frame = [0.6f32, 0.0, 0.0, 0.0, 0.0, 0.0];
        let mono = downmix_interleaved(&frame, 6).unwrap();
        assert!((mono[0] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_zero_channels() {
        assert!(downmix_interleaved(&[0.0; 4], 0).is_err());
    }
}

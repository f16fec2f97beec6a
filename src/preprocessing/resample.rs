//! Sample rate conversion

/// Resample mono audio using linear interpolation
///
/// Returns the input unchanged when either rate is zero or the rates match.
pub fn resample_linear(samples: &[f32], src_rate: u32, target_rate: u32) -> Vec<f32> {
    if src_rate == 0 || target_rate == 0 || src_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = target_rate as f64 / src_rate as f64;
    let new_len = ((samples.len() as f64) * ratio).ceil() as usize;
    let last = samples.len() - 1;

    log::debug!(
        "Resampling {} samples {} Hz -> {} Hz ({} samples)",
        samples.len(),
        src_rate,
        target_rate,
        new_len
    );

    (0..new_len)
        .map(|i| {
            let src_pos = i as f64 / ratio;
            let lower = src_pos.floor() as usize;
            if lower >= last {
                samples[last]
            } else {
                let frac = (src_pos - lower as f64) as f32;
                samples[lower] * (1.0 - frac) + samples[lower + 1] * frac
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_when_rates_match() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 44100, 44100), samples);
    }

    #[test]
    fn test_downsample_length() {
        let samples = vec![0.0f32; 44100];
        let out = resample_linear(&samples, 44100, 22050);
        assert_eq!(out.len(), 22050);
    }

    #[test]
    fn test_upsample_interpolates() {
        let out = resample_linear(&[0.0, 1.0], 1, 2);
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
        assert_eq!(out[3], 1.0);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample_linear(&[], 44100, 22050).is_empty());
    }
}

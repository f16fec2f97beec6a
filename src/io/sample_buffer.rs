//! Sample windowing for short-time analysis

/// Zero-padded sample buffer that hands out overlapping analysis windows
///
/// Windows start every `hop_size` samples. The signal is padded by
/// `window_size / 2` zeros on both sides so that window `t` is centered on
/// sample `t * hop_size`.
#[derive(Debug)]
pub struct SampleBuffer {
    /// Buffer data, including padding
    data: Vec<f32>,
    /// Window length
    window_size: usize,
    /// Distance between window starts
    hop_size: usize,
}

impl SampleBuffer {
    /// Create a buffer with `window_size / 2` zeros of padding on each side
    pub fn centered(samples: &[f32], window_size: usize, hop_size: usize) -> Self {
        let pad = window_size / 2;
        let mut data = Vec::with_capacity(samples.len() + 2 * pad);
        data.resize(pad, 0.0);
        data.extend_from_slice(samples);
        data.resize(samples.len() + 2 * pad, 0.0);
        Self {
            data,
            window_size,
            hop_size: hop_size.max(1),
        }
    }

    /// Number of complete windows in the buffer
    pub fn window_count(&self) -> usize {
        if self.window_size == 0 || self.data.len() < self.window_size {
            return 0;
        }
        1 + (self.data.len() - self.window_size) / self.hop_size
    }

    /// Window `index`, or `None` past the end
    pub fn window(&self, index: usize) -> Option<&[f32]> {
        if index >= self.window_count() {
            return None;
        }
        let start = index * self.hop_size;
        Some(&self.data[start..start + self.window_size])
    }
}

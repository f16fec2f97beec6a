//! Feature extraction modules
//!
//! - Log-power mel spectrogram extraction
//! - Fixed-shape tensor preparation (pad/crop, min-max, channels)
//! - Waveform augmentation for training data

pub mod augmentation;
pub mod mel;
pub mod spectrogram;
pub mod tensor;

pub use spectrogram::Spectrogram;

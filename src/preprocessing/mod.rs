//! Waveform preprocessing applied before spectrogram extraction
//!
//! - Channel mixing (interleaved multichannel to mono)
//! - Resampling to the extraction sample rate

pub mod channel_mixer;
pub mod resample;

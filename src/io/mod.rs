//! Audio I/O modules
//!
//! Audio decoding using Symphonia and windowed sample access for the STFT.

pub mod decoder;
pub mod sample_buffer;

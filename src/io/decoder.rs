//! Audio decoding using Symphonia
//!
//! Decodes any container/codec Symphonia's default registry understands
//! (WAV, MP3, FLAC, Ogg/Vorbis) into mono `f32` samples in [-1.0, 1.0].

use std::fs::File;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use crate::error::{PipelineError, Result};
use crate::preprocessing::channel_mixer::downmix_interleaved;

/// File extensions treated as decodable audio
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg"];

/// Decoded mono audio
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Mono samples
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source before downmixing
    pub source_channels: usize,
}

impl DecodedAudio {
    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Whether `path` carries one of the [`AUDIO_EXTENSIONS`]
pub fn is_audio_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Decode an audio file to mono PCM samples
///
/// # Errors
///
/// Returns `PipelineError::DecodingError` if the file cannot be opened,
/// probed or decoded, or if it yields no samples.
pub fn decode_audio(path: &Path) -> Result<DecodedAudio> {
    log::debug!("Decoding audio file: {}", path.display());

    let file = File::open(path).map_err(|e| {
        PipelineError::DecodingError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_source(Box::new(file), hint).map_err(|e| match e {
        PipelineError::DecodingError(msg) => {
            PipelineError::DecodingError(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Decode in-memory audio bytes to mono PCM samples
///
/// `extension` is an optional format hint such as `"mp3"`.
pub fn decode_audio_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
    log::debug!("Decoding {} bytes of audio", bytes.len());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    decode_source(Box::new(Cursor::new(bytes)), hint)
}

fn decode_source(source: Box<dyn MediaSource>, hint: Hint) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(source, Default::default());

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| PipelineError::DecodingError(format!("Failed to probe audio: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| {
            PipelineError::DecodingError("No supported audio tracks found".to_string())
        })?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::DecodingError("Track missing sample rate".to_string()))?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PipelineError::DecodingError(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err)) if err.kind() == ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(PipelineError::DecodingError(format!(
                    "Failed to read audio packet: {}",
                    e
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let packet_channels = spec.channels.count();
                if packet_channels == 0 {
                    continue;
                }
                if channels == 0 {
                    channels = packet_channels;
                } else if channels != packet_channels {
                    return Err(PipelineError::DecodingError(format!(
                        "Channel count changed mid-stream ({} -> {})",
                        channels, packet_channels
                    )));
                }

                let mut buffer =
                    SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupted packet; keep going with the rest of the stream.
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => {
                return Err(PipelineError::DecodingError(format!(
                    "Failed to decode audio packet: {}",
                    e
                )))
            }
        }
    }

    if interleaved.is_empty() || channels == 0 {
        return Err(PipelineError::DecodingError(
            "Audio produced no samples".to_string(),
        ));
    }

    let samples = downmix_interleaved(&interleaved, channels)?;

    log::debug!(
        "Decoded {} frames at {} Hz from {} channel(s)",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        source_channels: channels,
    })
}

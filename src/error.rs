//! Error types for the spectrogram pipeline

use thiserror::Error;

/// Errors that can occur anywhere in the pipeline
///
/// Per-item errors (see [`PipelineError::is_item_error`]) are absorbed by the
/// batch generator, which logs and skips the offending entry. Everything else
/// is batch- or configuration-level and propagates to the caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio decoding error (unreadable, corrupt or empty audio)
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Processing error during extraction or shaping
    #[error("Processing error: {0}")]
    ProcessingError(String),

    /// Numerical error (non-finite samples, overflow, etc.)
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// Malformed feature reference
    #[error("Invalid feature reference '{0}'")]
    ReferenceError(String),

    /// Remote object missing, store unreachable or access denied
    #[error("Failed to fetch {reference}: {message}")]
    FetchError {
        /// Reference that could not be fetched
        reference: String,
        /// Underlying failure
        message: String,
    },

    /// Local cache read/write or (de)serialization failure
    #[error("Cache error: {0}")]
    CacheError(String),

    /// Data index file is missing columns or inconsistent with the genre map
    #[error("Data index error: {0}")]
    IndexError(String),

    /// Incomplete or inconsistent configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Every entry of a batch failed to load
    #[error("No data available for batch {batch_index}")]
    EmptyBatch {
        /// Index of the batch that came out empty
        batch_index: usize,
    },

    /// Classification requested while no model is loaded
    #[error("Model not ready: {0}")]
    ModelNotReady(String),

    /// The model returned an unusable prediction
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Filesystem error outside the cache
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error concerns a single data item
    ///
    /// The batch generator skips items failing with one of these; any other
    /// error aborts the whole batch.
    pub fn is_item_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidInput(_)
                | PipelineError::DecodingError(_)
                | PipelineError::ProcessingError(_)
                | PipelineError::NumericalError(_)
                | PipelineError::ReferenceError(_)
                | PipelineError::FetchError { .. }
                | PipelineError::CacheError(_)
                | PipelineError::Io(_)
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

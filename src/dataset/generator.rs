//! Fixed-size batch view over a data index
//!
//! A generator owns a permutation of the index. The permutation is rebuilt
//! at every epoch boundary ([`BatchSource::on_epoch_end`]), including once
//! at construction: a fresh uniform shuffle when shuffling is on, identity
//! order otherwise.
//!
//! Each batch is assembled on demand. Entries that fail to load or shape are
//! logged, reported in [`Batch::skipped`] and left out; the batch only fails
//! when nothing could be loaded ([`PipelineError::EmptyBatch`]) or when an
//! error is not item-specific.

use ndarray::{stack, Array2, Array3, Array4, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::config::TensorShape;
use crate::dataset::index::{DataIndex, DataIndexEntry};
use crate::dataset::loader::SpectrogramSource;
use crate::error::{PipelineError, Result};
use crate::features::tensor::to_model_input;

/// Epoch-aware batch provider
pub trait BatchSource {
    /// Number of batches per epoch
    fn len(&self) -> usize;

    /// Whether an epoch has no batches
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble batch `batch_index` of the current epoch
    fn get_batch(&self, batch_index: usize) -> Result<Batch>;

    /// Epoch boundary: rebuild the iteration order
    fn on_epoch_end(&mut self);
}

/// An entry left out of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Reference of the entry
    pub reference: String,
    /// Why it was skipped
    pub reason: String,
}

/// One assembled batch
#[derive(Debug, Clone)]
pub struct Batch {
    /// Model inputs, shape `(n, height, width, channels)`
    pub inputs: Array4<f32>,
    /// One-hot labels, shape `(n, num_classes)`
    pub labels: Array2<f32>,
    /// References of the loaded entries, in row order
    pub references: Vec<String>,
    /// Entries of this batch slice that were not loaded
    pub skipped: Vec<SkippedItem>,
}

impl Batch {
    /// Number of loaded entries
    pub fn len(&self) -> usize {
        self.references.len()
    }

    /// Whether no entries were loaded (never true for a returned batch)
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    /// Class index of row `i` (argmax of its one-hot label)
    pub fn class_of(&self, i: usize) -> Option<usize> {
        self.labels
            .axis_iter(Axis(0))
            .nth(i)
            .and_then(|row| row.iter().position(|&v| v == 1.0))
    }
}

/// Generator construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorOptions {
    /// Entries per batch (> 0)
    pub batch_size: usize,
    /// Model input shape
    pub shape: TensorShape,
    /// Length of the one-hot label vectors (> 0)
    pub num_classes: usize,
    /// Shuffle at every epoch boundary
    pub shuffle: bool,
    /// Shuffle seed; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            shape: TensorShape::default(),
            num_classes: 10,
            shuffle: true,
            seed: None,
        }
    }
}

/// Encode `class` as a one-hot vector of length `num_classes`
///
/// # Errors
///
/// `PipelineError::InvalidInput` if `class >= num_classes`.
pub fn one_hot(class: usize, num_classes: usize) -> Result<Vec<f32>> {
    if class >= num_classes {
        return Err(PipelineError::InvalidInput(format!(
            "Genre index {} out of range for {} classes",
            class, num_classes
        )));
    }
    let mut encoded = vec![0.0; num_classes];
    encoded[class] = 1.0;
    Ok(encoded)
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Batch generator over a [`DataIndex`]
pub struct BatchGenerator<S> {
    entries: Vec<DataIndexEntry>,
    source: S,
    options: GeneratorOptions,
    order: Vec<usize>,
    rng: StdRng,
}

impl<S: SpectrogramSource> BatchGenerator<S> {
    /// Create a generator and run the first epoch boundary
    ///
    /// # Errors
    ///
    /// `PipelineError::InvalidInput` if `batch_size` or `num_classes` is
    /// zero or the shape is invalid.
    pub fn new(index: DataIndex, source: S, options: GeneratorOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(PipelineError::InvalidInput(
                "Batch size must be > 0".to_string(),
            ));
        }
        if options.num_classes == 0 {
            return Err(PipelineError::InvalidInput(
                "Number of classes must be > 0".to_string(),
            ));
        }
        options.shape.validate()?;

        let mut generator = Self {
            entries: index.into_entries(),
            source,
            rng: seeded_rng(options.seed),
            options,
            order: Vec::new(),
        };
        generator.on_epoch_end();

        log::info!(
            "Batch generator ready: {} entries, {} batches of {}, shuffle={}",
            generator.entries.len(),
            generator.len(),
            generator.options.batch_size,
            generator.options.shuffle
        );
        Ok(generator)
    }

    /// Replace the shuffle RNG; takes effect at the next epoch boundary
    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Construction options
    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Number of index entries
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Current epoch's entry order (positions into the index)
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Entries of batch `batch_index` in the current order
    pub fn batch_entries(&self, batch_index: usize) -> Result<Vec<&DataIndexEntry>> {
        let batches = self.len();
        if batch_index >= batches {
            return Err(PipelineError::InvalidInput(format!(
                "Batch index {} out of range ({} batches)",
                batch_index, batches
            )));
        }
        let start = batch_index * self.options.batch_size;
        let end = (start + self.options.batch_size).min(self.order.len());
        Ok(self.order[start..end].iter().map(|&i| &self.entries[i]).collect())
    }

    fn load_item(&self, entry: &DataIndexEntry) -> Result<(Array3<f32>, Vec<f32>)> {
        let label = one_hot(entry.genre_index, self.options.num_classes)?;
        let spectrogram = self.source.load(&entry.file_path)?;
        let input = to_model_input(&spectrogram, &self.options.shape)?;
        Ok((input, label))
    }
}

impl<S: SpectrogramSource> BatchSource for BatchGenerator<S> {
    fn len(&self) -> usize {
        self.entries.len().div_ceil(self.options.batch_size)
    }

    fn get_batch(&self, batch_index: usize) -> Result<Batch> {
        let slice = self.batch_entries(batch_index)?;

        let mut inputs: Vec<Array3<f32>> = Vec::with_capacity(slice.len());
        let mut labels: Vec<f32> = Vec::with_capacity(slice.len() * self.options.num_classes);
        let mut references = Vec::with_capacity(slice.len());
        let mut skipped = Vec::new();

        for entry in slice {
            match self.load_item(entry) {
                Ok((input, label)) => {
                    inputs.push(input);
                    labels.extend(label);
                    references.push(entry.file_path.clone());
                }
                Err(e) if e.is_item_error() => {
                    log::warn!("Skipping {} in batch {}: {}", entry.file_path, batch_index, e);
                    skipped.push(SkippedItem {
                        reference: entry.file_path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        if inputs.is_empty() {
            log::error!("No data available for batch {}", batch_index);
            return Err(PipelineError::EmptyBatch { batch_index });
        }

        let views: Vec<ArrayView3<'_, f32>> = inputs.iter().map(|a| a.view()).collect();
        let inputs = stack(Axis(0), &views)
            .map_err(|e| PipelineError::ProcessingError(format!("Failed to stack batch: {}", e)))?;
        let labels = Array2::from_shape_vec((references.len(), self.options.num_classes), labels)
            .map_err(|e| PipelineError::ProcessingError(format!("Failed to build labels: {}", e)))?;

        log::debug!(
            "Batch {}: {} loaded, {} skipped",
            batch_index,
            references.len(),
            skipped.len()
        );

        Ok(Batch {
            inputs,
            labels,
            references,
            skipped,
        })
    }

    fn on_epoch_end(&mut self) {
        self.order = (0..self.entries.len()).collect();
        if self.options.shuffle {
            self.order.shuffle(&mut self.rng);
        }
        log::debug!("Epoch boundary: order rebuilt (shuffle={})", self.options.shuffle);
    }
}

/// Training (shuffled) and validation (ordered) generators over one source
pub fn create_generators<S>(
    train: DataIndex,
    validation: DataIndex,
    source: S,
    options: GeneratorOptions,
) -> Result<(BatchGenerator<S>, BatchGenerator<S>)>
where
    S: SpectrogramSource + Clone,
{
    let train_generator = BatchGenerator::new(
        train,
        source.clone(),
        GeneratorOptions {
            shuffle: true,
            ..options.clone()
        },
    )?;
    let validation_generator = BatchGenerator::new(
        validation,
        source,
        GeneratorOptions {
            shuffle: false,
            ..options
        },
    )?;
    Ok((train_generator, validation_generator))
}

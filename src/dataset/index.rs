//! Data index: the list of (feature reference, genre) rows a generator reads
//!
//! Persisted as CSV with a header row:
//!
//! ```text
//! file_path,genre_label,genre_index
//! store://aims3/Spectrograms/Rock/song_spectrogram.npy,Rock,8
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::reference::FeatureReference;
use crate::dataset::genre_map::GenreMap;
use crate::error::{PipelineError, Result};

/// Columns every index file must carry
pub const REQUIRED_COLUMNS: [&str; 3] = ["file_path", "genre_label", "genre_index"];

/// One index row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataIndexEntry {
    /// Feature reference: `store://bucket/key` or a local path
    pub file_path: String,
    /// Genre label as written in the genre map
    pub genre_label: String,
    /// Class index of `genre_label`
    pub genre_index: usize,
}

impl DataIndexEntry {
    /// Entry whose label and index come from `genres`
    pub fn new(file_path: impl Into<String>, genre_index: usize, genres: &GenreMap) -> Self {
        Self {
            file_path: file_path.into(),
            genre_label: genres.label_or_unknown(genre_index).to_string(),
            genre_index,
        }
    }
}

/// Ordered collection of index rows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataIndex {
    entries: Vec<DataIndexEntry>,
}

impl DataIndex {
    /// Wrap entries without validation
    pub fn new(entries: Vec<DataIndexEntry>) -> Self {
        Self { entries }
    }

    /// Load and validate a CSV index file
    ///
    /// # Errors
    ///
    /// `PipelineError::IndexError` if the file cannot be read, a required
    /// column is missing, a row is malformed, or a row disagrees with
    /// `genres`.
    pub fn load(path: &Path, genres: &GenreMap) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            PipelineError::IndexError(format!("Failed to open {}: {}", path.display(), e))
        })?;
        let index = Self::from_reader(file, genres)?;
        log::info!(
            "Loaded data index {} with {} entries",
            path.display(),
            index.len()
        );
        Ok(index)
    }

    /// Parse and validate CSV from any reader
    pub fn from_reader<R: Read>(reader: R, genres: &GenreMap) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| PipelineError::IndexError(format!("Failed to read header: {}", e)))?
            .clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h.trim() == *column))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::IndexError(format!(
                "Index must contain columns {:?}, missing {:?}",
                REQUIRED_COLUMNS, missing
            )));
        }

        let mut entries = Vec::new();
        for (row, record) in csv_reader.deserialize::<DataIndexEntry>().enumerate() {
            let entry = record.map_err(|e| {
                PipelineError::IndexError(format!("Malformed row {}: {}", row + 1, e))
            })?;
            entries.push(entry);
        }

        let index = Self { entries };
        index.validate(genres)?;
        Ok(index)
    }

    /// Write the index as CSV
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)?;
        log::info!("Saved data index with {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Write CSV to any writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let index_error =
            |e: csv::Error| PipelineError::IndexError(format!("Failed to write index: {}", e));
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.entries.is_empty() {
            csv_writer.write_record(REQUIRED_COLUMNS).map_err(index_error)?;
        }
        for entry in &self.entries {
            csv_writer.serialize(entry).map_err(index_error)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    /// Check every row agrees with `genres`
    ///
    /// The label must resolve in the map and resolve to the row's index.
    pub fn validate(&self, genres: &GenreMap) -> Result<()> {
        for (row, entry) in self.entries.iter().enumerate() {
            match genres.resolve(&entry.genre_label) {
                Some(index) if index == entry.genre_index => {}
                Some(index) => {
                    return Err(PipelineError::IndexError(format!(
                        "Row {}: genre '{}' has index {} in genre map v{}, index file says {}",
                        row + 1,
                        entry.genre_label,
                        index,
                        genres.version,
                        entry.genre_index
                    )));
                }
                None => {
                    return Err(PipelineError::IndexError(format!(
                        "Row {}: genre '{}' is not in genre map v{}",
                        row + 1,
                        entry.genre_label,
                        genres.version
                    )));
                }
            }
        }
        Ok(())
    }

    /// Build an index from references, taking each genre from the parent
    /// directory of the key or path (`.../Rock/song_spectrogram.npy`)
    ///
    /// References that do not parse or whose directory is not a known genre
    /// are skipped with a warning.
    pub fn from_references<I, S>(references: I, genres: &GenreMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = Vec::new();
        for raw in references {
            let raw = raw.as_ref();
            let reference = match FeatureReference::parse(raw) {
                Ok(reference) => reference,
                Err(e) => {
                    log::warn!("Skipping {}: {}", raw, e);
                    continue;
                }
            };

            let path_like = reference.path_like().replace('\\', "/");
            let genre = path_like.rsplit('/').filter(|s| !s.is_empty()).nth(1);
            match genre.and_then(|g| genres.resolve(g)) {
                Some(index) => {
                    entries.push(DataIndexEntry::new(reference.to_string(), index, genres))
                }
                None => log::warn!("Skipping {}: no known genre directory", raw),
            }
        }
        Self { entries }
    }

    /// Rows in order
    pub fn entries(&self) -> &[DataIndexEntry] {
        &self.entries
    }

    /// Take the rows
    pub fn into_entries(self) -> Vec<DataIndexEntry> {
        self.entries
    }

    /// Append a row
    pub fn push(&mut self, entry: DataIndexEntry) {
        self.entries.push(entry);
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no rows
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Row count per class index
    pub fn class_distribution(&self) -> BTreeMap<usize, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.genre_index).or_insert(0) += 1;
        }
        counts
    }

    /// Balanced class weights `n / (k * count)` for each present class
    ///
    /// `n` is the row count and `k` the number of distinct classes present.
    pub fn class_weights(&self) -> BTreeMap<usize, f32> {
        let counts = self.class_distribution();
        let n = self.entries.len() as f32;
        let k = counts.len() as f32;
        counts
            .into_iter()
            .map(|(class, count)| (class, n / (k * count as f32)))
            .collect()
    }
}

impl FromIterator<DataIndexEntry> for DataIndex {
    fn from_iter<T: IntoIterator<Item = DataIndexEntry>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

//! Audio ingest: extract spectrograms and publish them to the store
//!
//! For each audio file the raw spectrogram is uploaded as
//! `{prefix}/{Genre}/{stem}_spectrogram.npy`. With augmentation on, a
//! time-shifted copy is extracted and uploaded next to it as
//! `{stem}_augmented_spectrogram.npy`. The returned index rows reference the
//! uploaded objects.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::cache::feature_cache::FeatureCache;
use crate::config::SpectrogramConfig;
use crate::dataset::genre_map::GenreMap;
use crate::dataset::index::{DataIndex, DataIndexEntry};
use crate::error::{PipelineError, Result};
use crate::features::augmentation::{time_shift, DEFAULT_SHIFT_MAX};
use crate::features::mel::extract_mel_spectrogram;
use crate::io::decoder::{decode_audio, is_audio_path};

/// Suffix of raw spectrogram objects
pub const SPECTROGRAM_SUFFIX: &str = "_spectrogram.npy";

/// Suffix of augmented spectrogram objects
pub const AUGMENTED_SUFFIX: &str = "_augmented_spectrogram.npy";

/// Extracts and uploads spectrograms for labelled audio
pub struct Ingestor {
    cache: FeatureCache,
    bucket: String,
    prefix: String,
    spectrogram: SpectrogramConfig,
    genres: GenreMap,
    augment: bool,
    rng: StdRng,
}

impl Ingestor {
    /// Create an ingestor uploading to `bucket` under `prefix`
    ///
    /// `seed` drives the augmentation shifts; `None` seeds from the OS.
    pub fn new(
        cache: FeatureCache,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        spectrogram: SpectrogramConfig,
        genres: GenreMap,
        seed: Option<u64>,
    ) -> Self {
        Self {
            cache,
            bucket: bucket.into(),
            prefix: prefix.into().trim_matches('/').to_string(),
            spectrogram,
            genres,
            augment: false,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            },
        }
    }

    /// Also publish a time-shifted copy of every file
    pub fn with_augmentation(mut self, augment: bool) -> Self {
        self.augment = augment;
        self
    }

    fn object_key(&self, genre: &str, stem: &str, suffix: &str) -> String {
        if self.prefix.is_empty() {
            format!("{}/{}{}", genre, stem, suffix)
        } else {
            format!("{}/{}/{}{}", self.prefix, genre, stem, suffix)
        }
    }

    /// Ingest one audio file labelled `genre_label`
    ///
    /// # Errors
    ///
    /// - `PipelineError::InvalidInput` if the label is not in the genre map
    ///   or the file has no usable name
    /// - decoding, extraction and upload errors as they occur
    pub fn ingest_file(&mut self, path: &Path, genre_label: &str) -> Result<Vec<DataIndexEntry>> {
        let genre_index = self.genres.resolve(genre_label).ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "Genre '{}' is not in genre map v{}",
                genre_label, self.genres.version
            ))
        })?;
        let genre = self.genres.label_or_unknown(genre_index).to_string();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("No file name in {}", path.display()))
            })?
            .to_string();

        let audio = decode_audio(path)?;
        let mut entries = Vec::with_capacity(2);

        let spectrogram =
            extract_mel_spectrogram(&audio.samples, audio.sample_rate, &self.spectrogram)?;
        let key = self.object_key(&genre, &stem, SPECTROGRAM_SUFFIX);
        let reference = self.cache.put(&self.bucket, &key, &spectrogram)?;
        entries.push(DataIndexEntry::new(reference.to_string(), genre_index, &self.genres));

        if self.augment {
            let shifted = time_shift(&audio.samples, DEFAULT_SHIFT_MAX, &mut self.rng);
            let augmented =
                extract_mel_spectrogram(&shifted, audio.sample_rate, &self.spectrogram)?;
            let key = self.object_key(&genre, &stem, AUGMENTED_SUFFIX);
            let reference = self.cache.put(&self.bucket, &key, &augmented)?;
            entries.push(DataIndexEntry::new(reference.to_string(), genre_index, &self.genres));
        }

        log::info!("Ingested {} as {} ({} objects)", path.display(), genre, entries.len());
        Ok(entries)
    }

    /// Ingest every audio file under `root/<Genre>/`
    ///
    /// Directories that are not genres in the map are ignored. Files that
    /// fail are logged and skipped. Files are visited in name order, and a
    /// file whose stem was already published from the same directory (e.g.
    /// `song.mp3` after `song.flac`) is skipped, since both map to one key.
    pub fn ingest_directory(&mut self, root: &Path) -> Result<DataIndex> {
        let mut genre_dirs: Vec<_> = fs::read_dir(root)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        genre_dirs.sort();

        let mut index = DataIndex::default();
        for dir in genre_dirs {
            let Some(label) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if self.genres.resolve(&label).is_none() {
                log::warn!("Ignoring {}: not a known genre", dir.display());
                continue;
            }

            let mut files: Vec<_> = fs::read_dir(&dir)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_audio_path(p))
                .collect();
            files.sort();

            let mut published: HashMap<String, PathBuf> = HashMap::new();
            for file in files {
                let stem = file.file_stem().and_then(|s| s.to_str()).map(str::to_string);
                if let Some(first) = stem.as_ref().and_then(|s| published.get(s)) {
                    log::warn!(
                        "Skipping {}: same stem as {}, both would upload to one key",
                        file.display(),
                        first.display()
                    );
                    continue;
                }

                match self.ingest_file(&file, &label) {
                    Ok(entries) => {
                        entries.into_iter().for_each(|e| index.push(e));
                        if let Some(stem) = stem {
                            published.insert(stem, file);
                        }
                    }
                    Err(e) => log::error!("Failed to ingest {}: {}", file.display(), e),
                }
            }
        }

        log::info!("Ingest finished: {} index entries", index.len());
        Ok(index)
    }
}

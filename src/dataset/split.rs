//! Stratified train/validation split

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::index::{DataIndex, DataIndexEntry};
use crate::error::{PipelineError, Result};

/// Default share of each class moved to the validation side
pub const DEFAULT_VALIDATION_FRACTION: f32 = 0.2;

/// Default split seed
pub const DEFAULT_SPLIT_SEED: u64 = 42;

/// Split `index` into `(train, validation)`, preserving class proportions
///
/// Each class is shuffled with a generator seeded from `seed` and
/// `round(count * validation_fraction)` of its rows go to validation,
/// clamped so a class with at least two rows lands on both sides. A class
/// with a single row stays in training. The same inputs always produce the
/// same split.
///
/// # Errors
///
/// `PipelineError::InvalidInput` if `validation_fraction` is not strictly
/// between 0 and 1.
pub fn stratified_split(
    index: &DataIndex,
    validation_fraction: f32,
    seed: u64,
) -> Result<(DataIndex, DataIndex)> {
    if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
        return Err(PipelineError::InvalidInput(format!(
            "Validation fraction must be in (0, 1), got {}",
            validation_fraction
        )));
    }

    let mut by_class: BTreeMap<usize, Vec<&DataIndexEntry>> = BTreeMap::new();
    for entry in index.entries() {
        by_class.entry(entry.genre_index).or_default().push(entry);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(index.len());
    let mut validation = Vec::new();

    for (class, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let count = rows.len();
        let n_val = if count < 2 {
            log::warn!("Class {} has a single entry, keeping it in training", class);
            0
        } else {
            ((count as f32 * validation_fraction).round() as usize).clamp(1, count - 1)
        };

        validation.extend(rows[..n_val].iter().map(|&e| e.clone()));
        train.extend(rows[n_val..].iter().map(|&e| e.clone()));
    }

    train.shuffle(&mut rng);
    validation.shuffle(&mut rng);

    log::info!(
        "Stratified split: {} training, {} validation entries",
        train.len(),
        validation.len()
    );
    Ok((DataIndex::new(train), DataIndex::new(validation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::genre_map::GenreMap;
    use std::collections::HashSet;

    fn index_with_counts(counts: &[(usize, usize)]) -> DataIndex {
        let genres = GenreMap::canonical();
        counts
            .iter()
            .flat_map(|&(class, n)| {
                let genres = genres.clone();
                (0..n).map(move |i| {
                    DataIndexEntry::new(format!("{}_{}.npy", class, i), class, &genres)
                })
            })
            .collect()
    }

    #[test]
    fn test_split_sizes_per_class() {
        let index = index_with_counts(&[(0, 50), (4, 10), (8, 3)]);
        let (train, val) = stratified_split(&index, 0.2, 42).unwrap();

        assert_eq!(train.len() + val.len(), index.len());
        let val_dist = val.class_distribution();
        assert_eq!(val_dist[&0], 10);
        assert_eq!(val_dist[&4], 2);
        assert_eq!(val_dist[&8], 1);
    }

    #[test]
    fn test_split_is_partition() {
        let index = index_with_counts(&[(1, 17), (2, 9)]);
        let (train, val) = stratified_split(&index, 0.2, 42).unwrap();

        let train_paths: HashSet<_> = train.entries().iter().map(|e| &e.file_path).collect();
        let val_paths: HashSet<_> = val.entries().iter().map(|e| &e.file_path).collect();
        assert!(train_paths.is_disjoint(&val_paths));
        assert_eq!(train_paths.len() + val_paths.len(), 26);
    }

    #[test]
    fn test_split_deterministic() {
        let index = index_with_counts(&[(0, 20), (5, 20)]);
        let a = stratified_split(&index, 0.2, 42).unwrap();
        let b = stratified_split(&index, 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_singleton_class_stays_in_training() {
        let index = index_with_counts(&[(3, 1), (6, 5)]);
        let (train, val) = stratified_split(&index, 0.2, 42).unwrap();
        assert_eq!(train.class_distribution()[&3], 1);
        assert!(!val.class_distribution().contains_key(&3));
    }

    #[test]
    fn test_invalid_fraction() {
        let index = index_with_counts(&[(0, 4)]);
        assert!(stratified_split(&index, 0.0, 42).is_err());
        assert!(stratified_split(&index, 1.0, 42).is_err());
    }
}

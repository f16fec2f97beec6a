//! Versioned genre label ↔ class index mapping
//!
//! One map is loaded once and threaded through index building, batch
//! generation and inference. The class index of a genre is its position in
//! [`GenreMap::genres`].

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Label reported for a class index outside the map
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Canonical v1 labels, in class-index order
pub const CANONICAL_GENRES: [&str; 10] = [
    "Classical",
    "Electronic",
    "Folk",
    "Hip_Hop",
    "Jazz",
    "Pop",
    "Reggae",
    "Rnb",
    "Rock",
    "Tollywood",
];

/// Ordered list of genre labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreMap {
    /// Map version, bumped whenever labels or their order change
    pub version: u32,
    /// Labels; the index of a label is its class index
    pub genres: Vec<String>,
}

impl Default for GenreMap {
    fn default() -> Self {
        Self::canonical()
    }
}

impl GenreMap {
    /// The canonical 10-genre map (version 1)
    pub fn canonical() -> Self {
        Self {
            version: 1,
            genres: CANONICAL_GENRES.iter().map(|g| g.to_string()).collect(),
        }
    }

    /// Build and validate a map
    ///
    /// # Errors
    ///
    /// `PipelineError::ConfigError` if `genres` is empty, contains a blank
    /// label, or contains duplicates (compared case-insensitively).
    pub fn new(version: u32, genres: Vec<String>) -> Result<Self> {
        let map = Self { version, genres };
        map.validate()?;
        Ok(map)
    }

    /// Load a JSON map (`{"version": 1, "genres": [...]}`)
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            PipelineError::ConfigError(format!(
                "Failed to read genre map {}: {}",
                path.display(),
                e
            ))
        })?;
        let map: GenreMap = serde_json::from_str(&source).map_err(|e| {
            PipelineError::ConfigError(format!("Invalid genre map {}: {}", path.display(), e))
        })?;
        map.validate()?;
        log::info!(
            "Loaded genre map v{} with {} genres from {}",
            map.version,
            map.len(),
            path.display()
        );
        Ok(map)
    }

    /// Write the map as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| {
                PipelineError::ConfigError(format!("Failed to serialize genre map: {}", e))
            })?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Check labels are non-empty and unique
    pub fn validate(&self) -> Result<()> {
        if self.genres.is_empty() {
            return Err(PipelineError::ConfigError(
                "Genre map must contain at least one genre".to_string(),
            ));
        }
        for (i, genre) in self.genres.iter().enumerate() {
            if genre.trim().is_empty() {
                return Err(PipelineError::ConfigError(format!(
                    "Genre map entry {} is blank",
                    i
                )));
            }
            if self.genres[..i].iter().any(|g| g.eq_ignore_ascii_case(genre)) {
                return Err(PipelineError::ConfigError(format!(
                    "Duplicate genre '{}' in genre map",
                    genre
                )));
            }
        }
        Ok(())
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.genres.len()
    }

    /// Whether the map has no genres
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
    }

    /// Class index for `label`, matched case-insensitively
    pub fn resolve(&self, label: &str) -> Option<usize> {
        let label = label.trim();
        self.genres.iter().position(|g| g.eq_ignore_ascii_case(label))
    }

    /// Canonical label for a class index
    pub fn label(&self, index: usize) -> Option<&str> {
        self.genres.get(index).map(String::as_str)
    }

    /// Canonical label for a class index, or [`UNKNOWN_GENRE`]
    pub fn label_or_unknown(&self, index: usize) -> &str {
        self.label(index).unwrap_or(UNKNOWN_GENRE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_canonical_order() {
        let map = GenreMap::canonical();
        assert_eq!(map.len(), 10);
        assert_eq!(map.resolve("Classical"), Some(0));
        assert_eq!(map.resolve("Hip_Hop"), Some(3));
        assert_eq!(map.resolve("Tollywood"), Some(9));
        assert_eq!(map.label(4), Some("Jazz"));
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let map = GenreMap::canonical();
        assert_eq!(map.resolve("rock"), Some(8));
        assert_eq!(map.resolve("RNB"), Some(7));
        assert_eq!(map.resolve(" pop "), Some(5));
        assert_eq!(map.resolve("Metal"), None);
    }

    #[test]
    fn test_unknown_label() {
        let map = GenreMap::canonical();
        assert_eq!(map.label_or_unknown(10), UNKNOWN_GENRE);
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(GenreMap::new(1, vec![]).is_err());
        assert!(GenreMap::new(1, vec!["Rock".into(), "rock".into()]).is_err());
        assert!(GenreMap::new(1, vec!["Rock".into(), " ".into()]).is_err());
        assert!(GenreMap::new(2, vec!["Rock".into(), "Jazz".into()]).is_ok());
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genres.json");
        let map = GenreMap::new(3, vec!["A".into(), "B".into()]).unwrap();
        map.save(&path).unwrap();
        assert_eq!(GenreMap::load(&path).unwrap(), map);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genres.json");
        std::fs::write(&path, r#"{"version": 1, "genres": ["Rock", "ROCK"]}"#).unwrap();
        assert!(matches!(GenreMap::load(&path), Err(PipelineError::ConfigError(_))));
    }
}

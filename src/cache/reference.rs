//! Feature references and cache file naming
//!
//! A reference is either a remote object `store://bucket/key` (`s3://` is
//! accepted as an alias) or a local filesystem path. Strings without `://`
//! are local paths.

use std::fmt;
use std::path::PathBuf;

use crate::error::{PipelineError, Result};

/// Canonical scheme for remote references
pub const STORE_SCHEME: &str = "store";

/// Alias schemes accepted for remote references
const ALIAS_SCHEMES: &[&str] = &["s3"];

/// Parsed feature reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeatureReference {
    /// Object in a remote store
    Remote {
        /// Bucket name
        bucket: String,
        /// Object key inside the bucket
        key: String,
    },
    /// File on the local filesystem (audio or `.npy`)
    Local(PathBuf),
}

impl FeatureReference {
    /// Parse a reference string
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ReferenceError` for an unknown scheme, an
    /// empty bucket or key, or an empty string.
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::ReferenceError(reference.to_string()));
        }

        let Some((scheme, rest)) = trimmed.split_once("://") else {
            return Ok(FeatureReference::Local(PathBuf::from(trimmed)));
        };

        let scheme = scheme.to_ascii_lowercase();
        if scheme != STORE_SCHEME && !ALIAS_SCHEMES.contains(&scheme.as_str()) {
            return Err(PipelineError::ReferenceError(reference.to_string()));
        }

        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.trim_matches('/').is_empty() => {
                Ok(FeatureReference::Remote {
                    bucket: bucket.to_string(),
                    key: key.trim_start_matches('/').to_string(),
                })
            }
            _ => Err(PipelineError::ReferenceError(reference.to_string())),
        }
    }

    /// Remote reference for `bucket` / `key`
    pub fn remote(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        FeatureReference::Remote {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether this points into a remote store
    pub fn is_remote(&self) -> bool {
        matches!(self, FeatureReference::Remote { .. })
    }

    /// Object key or local path as a string, used for genre inference
    pub fn path_like(&self) -> String {
        match self {
            FeatureReference::Remote { key, .. } => key.clone(),
            FeatureReference::Local(path) => path.to_string_lossy().into_owned(),
        }
    }

    /// File name for this reference inside the local cache directory
    ///
    /// Percent-escapes `%`, `/`, `\` and `:` in the canonical reference
    /// string, so distinct references never share a cache file.
    pub fn cache_file_name(&self) -> String {
        escape_component(&self.to_string())
    }
}

impl fmt::Display for FeatureReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureReference::Remote { bucket, key } => {
                write!(f, "{}://{}/{}", STORE_SCHEME, bucket, key)
            }
            FeatureReference::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl std::str::FromStr for FeatureReference {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn escape_component(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            '\\' => escaped.push_str("%5C"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote() {
        let r = FeatureReference::parse("store://aims3/Rock/a.npy").unwrap();
        assert_eq!(r, FeatureReference::remote("aims3", "Rock/a.npy"));
        assert!(r.is_remote());
        assert_eq!(r.to_string(), "store://aims3/Rock/a.npy");
    }

    #[test]
    fn test_parse_s3_alias_canonicalizes() {
        let r = FeatureReference::parse("s3://aims3/Spectrograms/Jazz/x.npy").unwrap();
        assert_eq!(r.to_string(), "store://aims3/Spectrograms/Jazz/x.npy");
    }

    #[test]
    fn test_parse_local() {
        let r = FeatureReference::parse("data/Rock/song.wav").unwrap();
        assert_eq!(r, FeatureReference::Local(PathBuf::from("data/Rock/song.wav")));
        assert!(!r.is_remote());
    }

    #[test]
    fn test_parse_errors() {
        let malformed = [
            "",
            "   ",
            "http://host/x",
            "store://",
            "store://bucket",
            "store://bucket/",
            "store:///key",
        ];
        for bad in malformed {
            assert!(
                matches!(FeatureReference::parse(bad), Err(PipelineError::ReferenceError(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_cache_names_are_distinct() {
        // These collide under a plain '/' -> '_' replacement
        let a = FeatureReference::remote("b", "Rock/a_b.npy");
        let b = FeatureReference::remote("b", "Rock_a/b.npy");
        assert_ne!(a.cache_file_name(), b.cache_file_name());

        let c = FeatureReference::remote("b", "x%2Fy.npy");
        let d = FeatureReference::remote("b", "x/y.npy");
        assert_ne!(c.cache_file_name(), d.cache_file_name());
    }

    #[test]
    fn test_cache_name_has_no_separators() {
        let r = FeatureReference::remote("aims3", "Spectrograms/Rock/song_spectrogram.npy");
        let name = r.cache_file_name();
        assert!(!name.contains('/') && !name.contains('\\') && !name.contains(':'));
        assert_eq!(
            name,
            "store%3A%2F%2Faims3%2FSpectrograms%2FRock%2Fsong_spectrogram.npy"
        );
    }
}

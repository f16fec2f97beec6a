//! Training data: genre map, data index, loading and batch generation

pub mod generator;
pub mod genre_map;
pub mod index;
pub mod ingest;
pub mod loader;
pub mod split;

pub use generator::{
    create_generators, Batch, BatchGenerator, BatchSource, GeneratorOptions, SkippedItem,
};
pub use genre_map::GenreMap;
pub use index::{DataIndex, DataIndexEntry};
pub use ingest::Ingestor;
pub use loader::{FeatureLoader, SpectrogramSource};
pub use split::stratified_split;

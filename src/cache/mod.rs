//! Feature references, object stores and the local spectrogram cache

pub mod codec;
pub mod feature_cache;
pub mod reference;
pub mod store;

pub use feature_cache::FeatureCache;
pub use reference::FeatureReference;
pub use store::{open_store, LocalObjectStore, MemoryObjectStore, ObjectStore};

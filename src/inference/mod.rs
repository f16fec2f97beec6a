//! Inference boundary: model handle, classifier, predictions and evaluation

pub mod evaluation;
pub mod model;
pub mod predictions;

pub use evaluation::{evaluate, ClassMetrics, EvaluationReport};
pub use model::{Classifier, GenreModel, ModelHandle};
pub use predictions::{top_predictions, GenrePrediction, TOP_K};

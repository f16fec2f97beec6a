//! Held-out evaluation: accuracy, confusion matrix and per-class scores

use ndarray::Array2;
use serde::Serialize;

use crate::dataset::generator::BatchSource;
use crate::dataset::genre_map::GenreMap;
use crate::error::{PipelineError, Result};
use crate::inference::model::{predict_checked, GenreModel};
use crate::inference::predictions::argmax;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    /// Correct predictions of this class / all predictions of this class
    pub precision: f64,
    /// Correct predictions of this class / all items of this class
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f1: f64,
    /// Number of items whose true class is this one
    pub support: usize,
}

/// Evaluation summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Fraction of items predicted correctly
    pub accuracy: f64,
    /// `confusion[true][predicted]` counts
    pub confusion: Vec<Vec<usize>>,
    /// Metrics per class index
    pub per_class: Vec<ClassMetrics>,
    /// Number of evaluated items
    pub total: usize,
}

impl EvaluationReport {
    /// Build a report from a `(true, predicted)` confusion matrix
    pub fn from_confusion(confusion: &Array2<usize>) -> Self {
        let classes = confusion.nrows();
        let total: usize = confusion.sum();
        let correct: usize = (0..classes).map(|c| confusion[[c, c]]).sum();

        let per_class = (0..classes)
            .map(|c| {
                let tp = confusion[[c, c]] as f64;
                let support: usize = confusion.row(c).sum();
                let predicted: usize = confusion.column(c).sum();
                let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
                let recall = if support > 0 { tp / support as f64 } else { 0.0 };
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
            confusion: confusion.outer_iter().map(|row| row.to_vec()).collect(),
            per_class,
            total,
        }
    }

    /// Plain-text table of per-class metrics
    pub fn format_table(&self, genres: &GenreMap) -> String {
        let mut out = format!(
            "{:>12} {:>9} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support"
        );
        for (class, m) in self.per_class.iter().enumerate() {
            out.push_str(&format!(
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                genres.label_or_unknown(class),
                m.precision,
                m.recall,
                m.f1,
                m.support
            ));
        }
        out.push_str(&format!(
            "\n{:>12} {:>29.4} {:>9}\n",
            "accuracy", self.accuracy, self.total
        ));
        out
    }
}

/// Evaluate `model` on every batch of `source`
///
/// # Errors
///
/// - `PipelineError::InvalidInput` if `num_classes` is zero
/// - `PipelineError::InferenceError` if the model output width is not
///   `num_classes`
/// - `PipelineError::InvalidInput` if the batch labels are not
///   `num_classes` wide
/// - any batch-level error from `source`, including `EmptyBatch`
pub fn evaluate(
    model: &dyn GenreModel,
    source: &dyn BatchSource,
    num_classes: usize,
) -> Result<EvaluationReport> {
    if num_classes == 0 {
        return Err(PipelineError::InvalidInput(
            "Number of classes must be > 0".to_string(),
        ));
    }

    let mut confusion = Array2::<usize>::zeros((num_classes, num_classes));
    let mut skipped = 0usize;

    for batch_index in 0..source.len() {
        let batch = source.get_batch(batch_index)?;
        skipped += batch.skipped.len();

        let scores = predict_checked(model, batch.inputs.view())?;
        if scores.ncols() != num_classes {
            return Err(PipelineError::InferenceError(format!(
                "Model returned {} classes, expected {}",
                scores.ncols(),
                num_classes
            )));
        }

        if batch.labels.ncols() != num_classes {
            return Err(PipelineError::InvalidInput(format!(
                "Batch {} has {} label classes, expected {}",
                batch_index,
                batch.labels.ncols(),
                num_classes
            )));
        }

        for (row, label) in scores.outer_iter().zip(batch.labels.outer_iter()) {
            let (Some(predicted), Some(actual)) = (argmax(row), argmax(label)) else {
                continue;
            };
            confusion[[actual, predicted]] += 1;
        }
    }

    if skipped > 0 {
        log::warn!("{} items could not be loaded and were not evaluated", skipped);
    }

    let report = EvaluationReport::from_confusion(&confusion);
    log::info!(
        "Evaluation: accuracy {:.4} over {} items",
        report.accuracy,
        report.total
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::generator::Batch;
    use ndarray::{array, Array4, ArrayView4, Axis};

    #[test]
    fn test_metrics_from_confusion() {
        // rows: true class, columns: predicted
        let confusion = array![[3usize, 1], [2, 4]];
        let report = EvaluationReport::from_confusion(&confusion);

        assert_eq!(report.total, 10);
        assert!((report.accuracy - 0.7).abs() < 1e-12);

        let c0 = report.per_class[0];
        assert!((c0.precision - 0.6).abs() < 1e-12);
        assert!((c0.recall - 0.75).abs() < 1e-12);
        assert!((c0.f1 - 2.0 * 0.6 * 0.75 / 1.35).abs() < 1e-12);
        assert_eq!(c0.support, 4);
        assert_eq!(report.per_class[1].support, 6);
    }

    #[test]
    fn test_absent_class_scores_zero() {
        let confusion = array![[2usize, 0], [0, 0]];
        let report = EvaluationReport::from_confusion(&confusion);
        assert_eq!(report.per_class[1].precision, 0.0);
        assert_eq!(report.per_class[1].f1, 0.0);
    }

    /// Two fixed batches; the model reads the class from the first pixel
    struct FixedBatches;

    impl BatchSource for FixedBatches {
        fn len(&self) -> usize {
            2
        }

        fn get_batch(&self, batch_index: usize) -> Result<Batch> {
            // first pixel encodes the predicted class, labels the true class
            let (predicted, actual): (Vec<usize>, Vec<usize>) = match batch_index {
                0 => (vec![0, 1, 2], vec![0, 1, 1]),
                _ => (vec![2], vec![2]),
            };
            let n = predicted.len();
            let mut inputs = Array4::<f32>::zeros((n, 2, 2, 1));
            let mut labels = Array2::<f32>::zeros((n, 3));
            for i in 0..n {
                inputs[[i, 0, 0, 0]] = predicted[i] as f32;
                labels[[i, actual[i]]] = 1.0;
            }
            Ok(Batch {
                inputs,
                labels,
                references: (0..n).map(|i| format!("item{}", i)).collect(),
                skipped: Vec::new(),
            })
        }

        fn on_epoch_end(&mut self) {}
    }

    struct PixelModel;

    impl GenreModel for PixelModel {
        fn predict(&self, inputs: ArrayView4<'_, f32>) -> Result<Array2<f32>> {
            let n = inputs.len_of(Axis(0));
            let mut out = Array2::<f32>::zeros((n, 3));
            for i in 0..n {
                out[[i, inputs[[i, 0, 0, 0]] as usize]] = 1.0;
            }
            Ok(out)
        }
    }

    #[test]
    fn test_evaluate_over_batches() {
        let report = evaluate(&PixelModel, &FixedBatches, 3).unwrap();
        assert_eq!(report.total, 4);
        assert!((report.accuracy - 0.75).abs() < 1e-12);
        assert_eq!(report.confusion[1][2], 1);
        assert_eq!(report.per_class[2].support, 1);

        let table = report.format_table(&GenreMap::canonical());
        assert!(table.contains("Electronic"));
        assert!(table.contains("accuracy"));
    }

    /// Labels twelve classes wide, as from a generator built for 12 classes
    struct WideLabels;

    impl BatchSource for WideLabels {
        fn len(&self) -> usize {
            1
        }

        fn get_batch(&self, _batch_index: usize) -> Result<Batch> {
            let mut labels = Array2::<f32>::zeros((1, 12));
            labels[[0, 11]] = 1.0;
            Ok(Batch {
                inputs: Array4::zeros((1, 2, 2, 1)),
                labels,
                references: vec!["item0".to_string()],
                skipped: Vec::new(),
            })
        }

        fn on_epoch_end(&mut self) {}
    }

    struct TenClassModel;

    impl GenreModel for TenClassModel {
        fn predict(&self, inputs: ArrayView4<'_, f32>) -> Result<Array2<f32>> {
            Ok(Array2::from_elem((inputs.len_of(Axis(0)), 10), 0.1))
        }
    }

    #[test]
    fn test_evaluate_label_width_mismatch() {
        assert!(matches!(
            evaluate(&TenClassModel, &WideLabels, 10),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_format_table_rows() {
        let report = EvaluationReport::from_confusion(&array![[1usize, 0], [0, 1]]);
        let table = report.format_table(&GenreMap::canonical());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("precision"));
        assert!(lines[1].trim_start().starts_with("Classical"));
        assert!(lines[2].trim_start().starts_with("Electronic"));
        assert!(lines[4].contains("1.0000"));
    }

    #[test]
    fn test_evaluate_wrong_width() {
        assert!(matches!(
            evaluate(&PixelModel, &FixedBatches, 4),
            Err(PipelineError::InferenceError(_))
        ));
        assert!(evaluate(&PixelModel, &FixedBatches, 0).is_err());
    }
}

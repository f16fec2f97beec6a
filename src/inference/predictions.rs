//! Turning class probabilities into ranked genre predictions

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::dataset::genre_map::GenreMap;
use crate::error::{PipelineError, Result};

/// Number of predictions reported per item
pub const TOP_K: usize = 3;

/// One ranked genre
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenrePrediction {
    /// Genre label, or `"Unknown"` for an index outside the genre map
    pub name: String,
    /// Probability as a percentage, rounded to 2 decimal places
    pub confidence: f64,
}

/// Round a probability to a percentage with 2 decimals
fn to_percentage(probability: f32) -> f64 {
    (probability as f64 * 100.0 * 100.0).round() / 100.0
}

/// Index of the largest value; ties go to the lower index
pub fn argmax(values: ArrayView1<'_, f32>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// The `k` most probable classes, highest first
///
/// # Errors
///
/// `PipelineError::InferenceError` if `probabilities` is empty or contains
/// non-finite values.
pub fn top_predictions(
    probabilities: ArrayView1<'_, f32>,
    genres: &GenreMap,
    k: usize,
) -> Result<Vec<GenrePrediction>> {
    if probabilities.is_empty() {
        return Err(PipelineError::InferenceError(
            "Model returned no class scores".to_string(),
        ));
    }
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(PipelineError::InferenceError(
            "Model returned non-finite class scores".to_string(),
        ));
    }

    let mut ranked: Vec<(usize, f32)> = probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    Ok(ranked
        .into_iter()
        .take(k)
        .map(|(index, probability)| GenrePrediction {
            name: genres.label_or_unknown(index).to_string(),
            confidence: to_percentage(probability),
        })
        .collect())
}

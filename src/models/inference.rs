//! Inference engine: margin evaluation and probability calibration.

use crate::error::{PipelineError, Result};
use crate::models::ensemble::TreeEnsemble;
use crate::types::assessment::ScoreResult;
use std::sync::Arc;
use tracing::debug;

/// Clamp bound keeping direct probability outputs away from 0 and 1,
/// where the log-odds diverge.
const PROBABILITY_EPS: f64 = 1e-9;

/// Output convention of the loaded scorer, resolved once at load time.
///
/// Scoring a raw margin as if it were a probability (or calibrating an
/// already-calibrated output a second time) produces quietly wrong
/// predictions, so the convention is carried as an explicit tag and each
/// arm is its own code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTransform {
    /// The ensemble emits a raw margin; calibrate with the logistic
    /// function.
    Margin,
    /// The ensemble emits a calibrated probability directly.
    Probability,
}

/// Logistic calibration of a raw margin.
pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Inverse of `sigmoid`. The caller keeps `probability` strictly inside
/// (0, 1).
pub(crate) fn logit(probability: f64) -> f64 {
    (probability / (1.0 - probability)).ln()
}

/// Scores encoded feature vectors with the loaded ensemble.
///
/// Shared immutably across workers after startup; scoring is pure and
/// deterministic.
#[derive(Debug)]
pub struct InferenceEngine {
    ensemble: Arc<TreeEnsemble>,
    output: OutputTransform,
}

impl InferenceEngine {
    pub fn new(ensemble: Arc<TreeEnsemble>, output: OutputTransform) -> Self {
        Self { ensemble, output }
    }

    /// Input width the loaded model expects.
    pub fn expected_width(&self) -> usize {
        self.ensemble.num_features()
    }

    pub fn output_transform(&self) -> OutputTransform {
        self.output
    }

    /// Score one encoded vector.
    pub fn score(&self, vector: &[f64]) -> Result<ScoreResult> {
        if vector.len() != self.ensemble.num_features() {
            return Err(PipelineError::Scoring {
                expected: self.ensemble.num_features(),
                actual: vector.len(),
            });
        }

        let raw = self.ensemble.margin(vector);
        let (probability, raw_margin) = match self.output {
            OutputTransform::Margin => (sigmoid(raw), raw),
            OutputTransform::Probability => {
                let probability = raw.clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
                (probability, logit(probability))
            }
        };
        let predicted_label = usize::from(probability > 0.5);

        debug!(
            probability = probability,
            raw_margin = raw_margin,
            predicted_label = predicted_label,
            "Vector scored"
        );

        Ok(ScoreResult {
            probability,
            predicted_label,
            raw_margin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ensemble::Tree;

    /// Single split on feature 0 at 1.0: left leaf `low`, right leaf `high`.
    fn stump(low: f64, high: f64) -> Tree {
        Tree {
            left_children: vec![1, -1, -1],
            right_children: vec![2, -1, -1],
            split_indices: vec![0, 0, 0],
            split_conditions: vec![1.0, low, high],
            default_left: vec![1, 0, 0],
            sum_hessian: vec![100.0, 50.0, 50.0],
            node_values: Vec::new(),
        }
    }

    fn margin_engine(low: f64, high: f64) -> InferenceEngine {
        let ensemble = TreeEnsemble::new(vec![stump(low, high)], 2, 0.0).unwrap();
        InferenceEngine::new(Arc::new(ensemble), OutputTransform::Margin)
    }

    #[test]
    fn test_margin_convention_applies_sigmoid() {
        let engine = margin_engine(-1.1, 2.0);

        let low = engine.score(&[0.0, 0.0]).unwrap();
        assert_eq!(low.raw_margin, -1.1);
        assert!((low.probability - 1.0 / (1.0 + 1.1f64.exp())).abs() < 1e-12);
        assert_eq!(low.predicted_label, 0);

        let high = engine.score(&[2.0, 0.0]).unwrap();
        assert_eq!(high.raw_margin, 2.0);
        assert!((high.probability - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
        assert_eq!(high.predicted_label, 1);
    }

    #[test]
    fn test_probability_convention_passes_through() {
        // A regression ensemble whose leaves already hold probabilities
        // must not be calibrated a second time.
        let ensemble = TreeEnsemble::new(vec![stump(0.2, 0.9)], 2, 0.0).unwrap();
        let engine = InferenceEngine::new(Arc::new(ensemble), OutputTransform::Probability);

        let low = engine.score(&[0.0, 0.0]).unwrap();
        assert_eq!(low.probability, 0.2);
        assert!((low.raw_margin - (0.2f64 / 0.8).ln()).abs() < 1e-12);
        assert_eq!(low.predicted_label, 0);

        let high = engine.score(&[2.0, 0.0]).unwrap();
        assert_eq!(high.probability, 0.9);
        assert_eq!(high.predicted_label, 1);
    }

    #[test]
    fn test_probability_convention_clamps_out_of_range_output() {
        let ensemble = TreeEnsemble::new(vec![stump(-0.1, 1.2)], 2, 0.0).unwrap();
        let engine = InferenceEngine::new(Arc::new(ensemble), OutputTransform::Probability);

        let low = engine.score(&[0.0, 0.0]).unwrap();
        assert!(low.probability > 0.0 && low.probability < 1.0);

        let high = engine.score(&[2.0, 0.0]).unwrap();
        assert!(high.probability > 0.0 && high.probability < 1.0);
        assert_eq!(high.predicted_label, 1);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let engine = margin_engine(-1.0, 1.0);
        let err = engine.score(&[1.0, 2.0, 3.0]).unwrap_err();
        match err {
            PipelineError::Scoring { expected, actual } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_margin_is_not_frail() {
        // probability 0.5 exactly does not cross the label threshold
        let engine = margin_engine(0.0, 0.0);
        let result = engine.score(&[0.0, 0.0]).unwrap();
        assert_eq!(result.probability, 0.5);
        assert_eq!(result.predicted_label, 0);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let engine = margin_engine(-1.1, 2.0);
        let vector = [0.5, 3.0];
        let first = engine.score(&vector).unwrap();
        for _ in 0..100 {
            let next = engine.score(&vector).unwrap();
            assert_eq!(next.probability, first.probability);
            assert_eq!(next.predicted_label, first.predicted_label);
            assert_eq!(next.raw_margin, first.raw_margin);
        }
    }
}

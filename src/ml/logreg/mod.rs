//! Multinomial logistic regression classifier.

use serde::{Deserialize, Serialize};

use crate::ml::softmax;
use crate::ml::{Classifier, Prediction};

mod train;
pub use train::{TrainOptions, train_logreg};

/// Softmax regression over scaled feature vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRegModel {
    pub feature_len: usize,
    pub classes: Vec<String>,
    /// Row-major `[class][feature]` weights.
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
    /// Epochs completed before convergence or the epoch limit.
    #[serde(default)]
    pub epochs_run: usize,
}

impl LogRegModel {
    /// Validate the model dimensions.
    pub fn validate(&self) -> Result<(), String> {
        let classes = self.classes.len();
        if classes < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.weights.len() != classes * self.feature_len {
            return Err("weights length mismatch".to_string());
        }
        if self.bias.len() != classes {
            return Err("bias length mismatch".to_string());
        }
        if self.weights.iter().chain(&self.bias).any(|v| !v.is_finite()) {
            return Err("non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Raw class scores before softmax.
    pub fn logits(&self, features: &[f64]) -> Vec<f64> {
        (0..self.classes.len())
            .map(|c| {
                let base = c * self.feature_len;
                let row = &self.weights[base..base + self.feature_len];
                let sum: f64 = row.iter().zip(features).map(|(w, x)| w * x).sum();
                sum + self.bias[c]
            })
            .collect()
    }

    /// Compute class probabilities for a single feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        if features.len() != self.feature_len {
            return Vec::new();
        }
        softmax(&self.logits(features))
    }
}

impl Classifier for LogRegModel {
    fn predict(&self, features: &[f64]) -> Prediction {
        Prediction::from_probabilities(&self.classes, self.predict_proba(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_model() -> LogRegModel {
        LogRegModel {
            feature_len: 3,
            classes: vec!["a".into(), "b".into()],
            weights: vec![0.0; 6],
            bias: vec![0.0, 0.0],
            epochs_run: 0,
        }
    }

    #[test]
    fn zero_model_is_uniform() {
        let model = zero_model();
        model.validate().unwrap();
        let out = model.predict_proba(&[1.0, 2.0, 3.0]);
        let sum: f64 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert!((out[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        let mut model = zero_model();
        model.bias.pop();
        assert!(model.validate().is_err());
        let mut model = zero_model();
        model.weights[0] = f64::NAN;
        assert!(model.validate().is_err());
    }
}

use serde::{Deserialize, Serialize};

use crate::ml::{Classifier, Prediction, softmax};

/// Single-node decision tree used as a weak learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    /// Feature index used for the split.
    pub feature_index: usize,
    /// Threshold in (scaled) feature units.
    pub threshold: f64,
    /// Prediction for `feature <= threshold`.
    pub left_value: f64,
    /// Prediction for `feature > threshold`.
    pub right_value: f64,
}

impl Stump {
    /// Predict the stump value for a feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        let value = features.get(self.feature_index).copied().unwrap_or(0.0);
        if value <= self.threshold {
            self.left_value
        } else {
            self.right_value
        }
    }
}

/// Gradient-boosted decision stump model for multi-class classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GbdtStumpModel {
    /// Number of values per feature vector.
    pub feature_len: usize,
    /// Ordered list of class labels.
    pub classes: Vec<String>,
    /// Learning rate applied to each stump prediction.
    pub learning_rate: f64,
    /// Initial raw logits before boosting rounds.
    pub init_raw: Vec<f64>,
    /// Shape: `[n_rounds][n_classes]`.
    pub stumps: Vec<Vec<Stump>>,
}

impl GbdtStumpModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.init_raw.len() != self.classes.len() {
            return Err("init_raw length must match classes length".to_string());
        }
        for (round_idx, round) in self.stumps.iter().enumerate() {
            if round.len() != self.classes.len() {
                return Err(format!(
                    "Round {round_idx} has {} stumps but expected {}",
                    round.len(),
                    self.classes.len()
                ));
            }
            if let Some(stump) = round.iter().find(|s| s.feature_index >= self.feature_len) {
                return Err(format!(
                    "Round {round_idx} splits on feature {} of {}",
                    stump.feature_index, self.feature_len
                ));
            }
        }
        Ok(())
    }

    /// Predict raw logits for a feature vector.
    pub fn predict_raw(&self, features: &[f64]) -> Vec<f64> {
        let mut raw = self.init_raw.clone();
        for round in &self.stumps {
            for (class_idx, stump) in round.iter().enumerate() {
                raw[class_idx] += self.learning_rate * stump.predict(features);
            }
        }
        raw
    }

    /// Predict class probabilities for a feature vector.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        softmax(&self.predict_raw(features))
    }
}

impl Classifier for GbdtStumpModel {
    fn predict(&self, features: &[f64]) -> Prediction {
        Prediction::from_probabilities(&self.classes, self.predict_proba(features))
    }
}

//! Classifiers, training dispatch and evaluation metrics.
//!
//! Every model answers the same question through [`Classifier::predict`]; the
//! serialisable [`TrainedModel`] enum wraps whichever model was trained.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod forest;
pub mod gbdt_stump;
pub mod logreg;
pub mod metrics;
mod train;

pub use train::{TrainingOptions, train};

use forest::ForestModel;
use gbdt_stump::GbdtStumpModel;
use logreg::LogRegModel;

/// The single capability shared by all trained models.
pub trait Classifier {
    /// Predict from an already-transformed feature vector.
    fn predict(&self, features: &[f64]) -> Prediction;
}

/// Predicted label with its probability and the full class distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_index: usize,
    pub label: String,
    pub probability: f64,
    /// `(label, probability)` in class order.
    pub probabilities: Vec<(String, f64)>,
}

impl Prediction {
    /// Pick the most probable class; ties go to the earliest class.
    pub fn from_probabilities(classes: &[String], probabilities: Vec<f64>) -> Self {
        let class_index = argmax(&probabilities);
        Self {
            class_index,
            label: classes.get(class_index).cloned().unwrap_or_default(),
            probability: probabilities.get(class_index).copied().unwrap_or(0.0),
            probabilities: classes.iter().cloned().zip(probabilities).collect(),
        }
    }
}

/// Numerically stable softmax; uniform when the logits overflow.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / logits.len() as f64; logits.len()];
    }
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties resolve to the lowest index.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (idx, &value)| {
            if value > best.1 { (idx, value) } else { best }
        })
        .0
}

/// Which algorithm to train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    #[default]
    LogisticRegression,
    RandomForest,
    GradientBoostedStumps,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [
        ModelKind::LogisticRegression,
        ModelKind::RandomForest,
        ModelKind::GradientBoostedStumps,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoostedStumps => "gradient_boosted_stumps",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "logistic_regression" | "logreg" => Ok(ModelKind::LogisticRegression),
            "random_forest" | "forest" => Ok(ModelKind::RandomForest),
            "gradient_boosted_stumps" | "gbdt_stump" | "gbdt" => {
                Ok(ModelKind::GradientBoostedStumps)
            }
            other => Err(format!(
                "unknown model '{other}' (expected logistic_regression, random_forest or gradient_boosted_stumps)"
            )),
        }
    }
}

/// Any trained model, tagged by kind when serialised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainedModel {
    LogisticRegression(LogRegModel),
    RandomForest(ForestModel),
    GradientBoostedStumps(GbdtStumpModel),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::GradientBoostedStumps(_) => ModelKind::GradientBoostedStumps,
        }
    }

    pub fn classes(&self) -> &[String] {
        match self {
            TrainedModel::LogisticRegression(model) => &model.classes,
            TrainedModel::RandomForest(model) => &model.classes,
            TrainedModel::GradientBoostedStumps(model) => &model.classes,
        }
    }

    pub fn feature_len(&self) -> usize {
        match self {
            TrainedModel::LogisticRegression(model) => model.feature_len,
            TrainedModel::RandomForest(model) => model.feature_len,
            TrainedModel::GradientBoostedStumps(model) => model.feature_len,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            TrainedModel::LogisticRegression(model) => model.validate(),
            TrainedModel::RandomForest(model) => model.validate(),
            TrainedModel::GradientBoostedStumps(model) => model.validate(),
        }
    }
}

impl Classifier for TrainedModel {
    fn predict(&self, features: &[f64]) -> Prediction {
        match self {
            TrainedModel::LogisticRegression(model) => model.predict(features),
            TrainedModel::RandomForest(model) => model.predict(features),
            TrainedModel::GradientBoostedStumps(model) => model.predict(features),
        }
    }
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use super::LogRegModel;
use crate::Error;
use crate::ml::softmax;
use crate::preprocess::TrainSet;

/// Training options for the logistic regression model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
    pub batch_size: usize,
    /// Stop once an epoch lowers the mean loss by less than this.
    pub tolerance: f64,
    pub seed: u64,
    pub balance_classes: bool,
    /// Fail when `epochs` runs out before the loss settles.
    pub require_convergence: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 1000,
            learning_rate: 0.1,
            l2: 1e-4,
            batch_size: 32,
            tolerance: 1e-4,
            seed: 42,
            balance_classes: false,
            require_convergence: true,
        }
    }
}

/// Fit a softmax regression with mini-batch gradient descent.
pub fn train_logreg(set: TrainSet<'_>, options: &TrainOptions) -> Result<LogRegModel, Error> {
    let x = &set.rows.x;
    let y = &set.rows.y;
    if x.is_empty() || x.len() != y.len() {
        return Err(Error::TrainingFailure(
            "Empty or mismatched training set".to_string(),
        ));
    }
    let classes = set.classes.len();
    if classes < 2 {
        return Err(Error::TrainingFailure("Need at least 2 classes".to_string()));
    }
    let dim = set.rows.feature_len();
    if x.iter().any(|row| row.len() != dim) {
        return Err(Error::TrainingFailure(
            "Inconsistent feature row length".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut weights = vec![0.0f64; classes * dim];
    let mut bias = vec![0.0f64; classes];
    for w in &mut weights {
        *w = (rng.random::<f64>() - 0.5) * 0.01;
    }

    let mut indices: Vec<usize> = (0..x.len()).collect();
    let batch_size = options.batch_size.max(1);
    let lr = options.learning_rate;
    let l2 = options.l2.max(0.0);
    let class_weights = class_weights(y, classes, options.balance_classes);

    let mut previous_loss = f64::INFINITY;
    let mut epochs_run = 0usize;
    let mut converged = false;
    for epoch in 0..options.epochs {
        indices.shuffle(&mut rng);
        for chunk in indices.chunks(batch_size) {
            let mut grad_w = vec![0.0f64; weights.len()];
            let mut grad_b = vec![0.0f64; bias.len()];
            let mut batch_weight = 0.0f64;
            for &idx in chunk {
                let row = &x[idx];
                let label = y[idx];
                if label >= classes {
                    continue;
                }
                let weight = class_weights[label];
                if weight == 0.0 {
                    continue;
                }
                let probs = softmax(&logits(&weights, &bias, row, dim));
                for c in 0..classes {
                    let diff = probs[c] - if c == label { 1.0 } else { 0.0 };
                    let base = c * dim;
                    for (i, &value) in row.iter().enumerate() {
                        grad_w[base + i] += diff * value * weight;
                    }
                    grad_b[c] += diff * weight;
                }
                batch_weight += weight;
            }
            if batch_weight == 0.0 {
                continue;
            }
            let inv = 1.0 / batch_weight;
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= lr * (g * inv + l2 * *w);
            }
            for (b, g) in bias.iter_mut().zip(&grad_b) {
                *b -= lr * g * inv;
            }
        }
        epochs_run = epoch + 1;

        let loss = mean_loss(&weights, &bias, x, y, dim, &class_weights);
        if !loss.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(Error::TrainingFailure(format!(
                "logistic regression diverged at epoch {epochs_run} (learning rate {lr})"
            )));
        }
        if previous_loss - loss < options.tolerance {
            tracing::debug!("Converged after {epochs_run} epochs (loss {loss:.6})");
            converged = true;
            break;
        }
        previous_loss = loss;
    }

    if !converged {
        let message = format!(
            "logistic regression did not converge within {} epochs (tolerance {})",
            options.epochs, options.tolerance
        );
        if options.require_convergence {
            return Err(Error::TrainingFailure(message));
        }
        tracing::warn!("{message}");
    }

    let model = LogRegModel {
        feature_len: dim,
        classes: set.classes.to_vec(),
        weights,
        bias,
        epochs_run,
    };
    model.validate().map_err(Error::TrainingFailure)?;
    Ok(model)
}

fn logits(weights: &[f64], bias: &[f64], row: &[f64], dim: usize) -> Vec<f64> {
    bias.iter()
        .enumerate()
        .map(|(c, b)| {
            let base = c * dim;
            b + weights[base..base + dim]
                .iter()
                .zip(row)
                .map(|(w, v)| w * v)
                .sum::<f64>()
        })
        .collect()
}

fn mean_loss(
    weights: &[f64],
    bias: &[f64],
    x: &[Vec<f64>],
    y: &[usize],
    dim: usize,
    class_weights: &[f64],
) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for (row, &label) in x.iter().zip(y) {
        let weight = class_weights.get(label).copied().unwrap_or(0.0);
        if weight == 0.0 {
            continue;
        }
        let probs = softmax(&logits(weights, bias, row, dim));
        total -= weight * probs[label].max(1e-12).ln();
        weight_sum += weight;
    }
    if weight_sum == 0.0 {
        0.0
    } else {
        total / weight_sum
    }
}

fn class_weights(y: &[usize], classes: usize, balance: bool) -> Vec<f64> {
    if !balance {
        return vec![1.0; classes];
    }
    let mut counts = vec![0f64; classes];
    for &label in y {
        if label < classes {
            counts[label] += 1.0;
        }
    }
    let total: f64 = counts.iter().sum();
    counts
        .into_iter()
        .map(|count| {
            if count == 0.0 {
                0.0
            } else {
                total / (classes as f64 * count)
            }
        })
        .collect()
}

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::{DecisionTree, ForestModel, Node};
use crate::Error;
use crate::preprocess::TrainSet;

/// Hyperparameters for the random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    pub trees: usize,
    pub max_depth: usize,
    /// Nodes with fewer rows become leaves.
    pub min_samples_split: usize,
    /// Candidate features per split; `None` uses `ceil(sqrt(d))`.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            trees: 50,
            max_depth: 8,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Fit bootstrap-sampled CART trees.
pub fn train_forest(set: TrainSet<'_>, options: &TrainOptions) -> Result<ForestModel, Error> {
    let x = &set.rows.x;
    let y = &set.rows.y;
    let n_classes = set.classes.len();
    if n_classes < 2 {
        return Err(Error::TrainingFailure("Need at least 2 classes".to_string()));
    }
    if x.is_empty() || x.len() != y.len() {
        return Err(Error::TrainingFailure(
            "Empty or mismatched training set".to_string(),
        ));
    }
    let d = set.rows.feature_len();
    if d == 0 {
        return Err(Error::TrainingFailure("No feature columns".to_string()));
    }
    let max_features = options
        .max_features
        .unwrap_or_else(|| (d as f64).sqrt().ceil() as usize)
        .clamp(1, d);

    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.trees.max(1));
    for _ in 0..options.trees.max(1) {
        let bootstrap: Vec<usize> = (0..x.len()).map(|_| rng.random_range(0..x.len())).collect();
        let mut builder = TreeBuilder {
            x,
            y,
            n_classes,
            feature_len: d,
            max_features,
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split.max(2),
            rng: StdRng::seed_from_u64(rng.random()),
            nodes: Vec::new(),
        };
        builder.build(bootstrap, 0);
        trees.push(DecisionTree {
            nodes: builder.nodes,
        });
    }

    let model = ForestModel {
        feature_len: d,
        classes: set.classes.to_vec(),
        trees,
    };
    model.validate().map_err(Error::TrainingFailure)?;
    tracing::debug!(
        "Trained {} trees (max depth reached {})",
        model.trees.len(),
        model.trees.iter().map(DecisionTree::depth).max().unwrap_or(0)
    );
    Ok(model)
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    feature_len: usize,
    max_features: usize,
    max_depth: usize,
    min_samples_split: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl TreeBuilder<'_> {
    /// Append the subtree for `rows` and return its root index.
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let counts = self.class_counts(&rows);
        self.nodes.push(Node::Leaf {
            distribution: distribution(&counts, rows.len()),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= self.max_depth || rows.len() < self.min_samples_split {
            return idx;
        }
        let Some(best) = self.best_split(&rows) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&row| self.x[row][best.feature] <= best.threshold);
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, rows: &[usize]) -> Option<Candidate> {
        let features =
            rand::seq::index::sample(&mut self.rng, self.feature_len, self.max_features);
        let mut best: Option<Candidate> = None;
        for feature in features.iter() {
            if let Some(candidate) = self.best_split_for_feature(rows, feature)
                && best
                    .as_ref()
                    .is_none_or(|current| candidate.impurity < current.impurity)
            {
                best = Some(candidate);
            }
        }
        best
    }

    fn best_split_for_feature(&self, rows: &[usize], feature: usize) -> Option<Candidate> {
        let mut sorted: Vec<(f64, usize)> = rows
            .iter()
            .map(|&row| (self.x[row][feature], self.y[row]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = sorted.len();
        let mut right = vec![0usize; self.n_classes];
        for &(_, label) in &sorted {
            right[label] += 1;
        }
        let mut left = vec![0usize; self.n_classes];
        let mut best: Option<Candidate> = None;
        for i in 0..total - 1 {
            let (value, label) = sorted[i];
            left[label] += 1;
            right[label] -= 1;
            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            let n_right = total - n_left;
            let impurity = (n_left as f64 * gini(&left, n_left)
                + n_right as f64 * gini(&right, n_right))
                / total as f64;
            if best.as_ref().is_none_or(|current| impurity < current.impurity) {
                best = Some(Candidate {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    impurity,
                });
            }
        }
        best
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &row in rows {
            counts[self.y[row]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| (c as f64 / total).powi(2))
        .sum::<f64>()
}

fn distribution(counts: &[usize], total: usize) -> Vec<f64> {
    let total = total.max(1) as f64;
    counts.iter().map(|&c| c as f64 / total).collect()
}

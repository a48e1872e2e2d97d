//! Random forest of CART trees with Gini splits.

use serde::{Deserialize, Serialize};

use crate::ml::{Classifier, Prediction};

mod train;
pub use train::{TrainOptions, train_forest};

/// A node in an arena-allocated decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    /// Go left when `features[feature] <= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class distribution of the training rows that reached the leaf.
    Leaf { distribution: Vec<f64> },
}

/// Decision tree stored as a node arena; the root is node 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Leaf distribution for a feature vector.
    pub fn distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
                Node::Leaf { distribution } => return distribution,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                Node::Leaf { .. } => 0,
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Children must point forward in the arena, which also rules out cycles.
    fn validate(&self, n_classes: usize, feature_len: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= feature_len {
                        return Err(format!("node {idx} splits on unknown feature {feature}"));
                    }
                    let in_range = |child: usize| child > idx && child < self.nodes.len();
                    if !in_range(*left) || !in_range(*right) {
                        return Err(format!("node {idx} has invalid children"));
                    }
                }
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        return Err(format!("leaf {idx} has wrong distribution length"));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Bagged ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_len: usize,
    pub classes: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.len() < 2 {
            return Err("Model must contain at least 2 classes".to_string());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.classes.len(), self.feature_len)
                .map_err(|err| format!("tree {idx}: {err}"))?;
        }
        Ok(())
    }

    /// Mean of the leaf distributions reached in every tree.
    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let mut sum = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.distribution(features)) {
                *acc += p;
            }
        }
        let count = self.trees.len().max(1) as f64;
        sum.iter_mut().for_each(|v| *v /= count);
        sum
    }
}

impl Classifier for ForestModel {
    fn predict(&self, features: &[f64]) -> Prediction {
        Prediction::from_probabilities(&self.classes, self.predict_proba(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump_tree(threshold: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                Node::Split {
                    feature: 0,
                    threshold,
                    left: 1,
                    right: 2,
                },
                Node::Leaf {
                    distribution: vec![1.0, 0.0],
                },
                Node::Leaf {
                    distribution: vec![0.0, 1.0],
                },
            ],
        }
    }

    #[test]
    fn averages_tree_distributions() {
        let forest = ForestModel {
            feature_len: 1,
            classes: vec!["a".into(), "b".into()],
            trees: vec![stump_tree(0.0), stump_tree(1.0)],
        };
        forest.validate().unwrap();
        assert_eq!(forest.predict_proba(&[0.5]), vec![0.5, 0.5]);
        assert_eq!(forest.predict(&[2.0]).label, "b");
        assert_eq!(forest.trees[0].depth(), 1);
    }

    #[test]
    fn validate_rejects_backward_children() {
        let mut tree = stump_tree(0.0);
        tree.nodes[0] = Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 2,
        };
        let forest = ForestModel {
            feature_len: 1,
            classes: vec!["a".into(), "b".into()],
            trees: vec![tree],
        };
        assert!(forest.validate().is_err());
    }
}

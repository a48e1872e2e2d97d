//! Deterministic gradient-boosted decision-stump classifier.
//!
//! A lightweight baseline without external ML dependencies:
//! - Multi-class classification via softmax boosting.
//! - Histogram split search over binned features.
//! - Reproducible JSON export through the model artifact.

mod model;
mod train;

pub use model::{GbdtStumpModel, Stump};
pub use train::{TrainOptions, train_gbdt_stump};

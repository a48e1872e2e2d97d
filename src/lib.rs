//! Library exports for the web process, the developer binaries, tests and benches.
/// Application data directory resolution.
pub mod app_dirs;
/// TOML settings.
pub mod config;
/// CSV loading into tables and labeled datasets.
pub mod dataset;
mod error;
/// Tracing setup.
pub mod logging;
/// Classifiers, training and evaluation.
pub mod ml;
/// Cleaning, scaling and train/test partitioning.
pub mod preprocess;
/// Descriptive statistics.
pub mod stats;
/// Model artifact persistence.
pub mod store;
/// Synthetic demo data.
pub mod synthetic;
/// Single-page web application.
pub mod web;
/// End-to-end training runs.
pub mod workflow;

pub use error::{Error, ModelUnavailableReason};

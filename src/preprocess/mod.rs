//! Cleaning, partitioning and scaling of a loaded [`Dataset`].

mod impute;
mod pipeline;
mod scale;
mod split;

use std::collections::BTreeSet;

pub use impute::{MissingPolicy, fill_values};
pub use pipeline::FeaturePipeline;
pub use scale::{Scaler, Scaling};
pub use split::{Split, split_indices, stratified_split, test_size};

use crate::Error;
use crate::dataset::Dataset;

/// Options for [`prepare`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOptions {
    pub missing: MissingPolicy,
    pub scaling: Scaling,
    /// Share of cleaned rows held out for evaluation.
    pub test_fraction: f64,
    /// `None` seeds the split from the OS.
    pub seed: Option<u64>,
    pub stratify: bool,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::default(),
            scaling: Scaling::default(),
            test_fraction: 0.2,
            seed: Some(42),
            stratify: false,
        }
    }
}

/// Complete, scaled feature rows with class indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledRows {
    pub x: Vec<Vec<f64>>,
    /// Index into the class list of the owning [`Prepared`].
    pub y: Vec<usize>,
}

impl LabeledRows {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn feature_len(&self) -> usize {
        self.x.first().map_or(0, Vec::len)
    }
}

/// Training rows together with the class names their indices refer to.
#[derive(Debug, Clone, Copy)]
pub struct TrainSet<'a> {
    pub classes: &'a [String],
    pub rows: &'a LabeledRows,
}

/// Output of [`prepare`]: the fitted pipeline and both partitions.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub pipeline: FeaturePipeline,
    /// Sorted distinct labels of the cleaned rows.
    pub classes: Vec<String>,
    pub train: LabeledRows,
    pub test: LabeledRows,
    /// Partition indices into the cleaned rows.
    pub split: Split,
    pub cleaned_rows: usize,
    pub dropped_rows: usize,
}

impl Prepared {
    pub fn train_set(&self) -> TrainSet<'_> {
        TrainSet {
            classes: &self.classes,
            rows: &self.train,
        }
    }
}

/// Clean the dataset, split it and fit the feature pipeline.
pub fn prepare(dataset: &Dataset, options: &PreprocessOptions) -> Result<Prepared, Error> {
    let width = dataset.feature_names.len();
    let mut kept: Vec<(&[Option<f64>], &str)> = Vec::with_capacity(dataset.len());
    let mut missing_label = 0usize;
    let mut missing_feature = 0usize;
    for (features, label) in dataset.features.iter().zip(&dataset.labels) {
        let Some(label) = label else {
            missing_label += 1;
            continue;
        };
        if features.len() != width {
            return Err(Error::SchemaMismatch(format!(
                "row has {} features, expected {width}",
                features.len()
            )));
        }
        if options.missing == MissingPolicy::DropRows && features.iter().any(Option::is_none) {
            missing_feature += 1;
            continue;
        }
        kept.push((features.as_slice(), label.as_str()));
    }
    let dropped_rows = missing_label + missing_feature;
    if dropped_rows > 0 {
        tracing::info!(
            "Dropped {dropped_rows} rows ({missing_label} missing label, {missing_feature} missing features)"
        );
    }
    if kept.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "{} usable rows after cleaning; at least 2 are required",
            kept.len()
        )));
    }

    let classes: Vec<String> = kept
        .iter()
        .map(|(_, label)| label.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let labels: Vec<usize> = kept
        .iter()
        .map(|(_, label)| classes.binary_search_by(|c| c.as_str().cmp(label)).unwrap_or(0))
        .collect();

    let raw_rows: Vec<&[Option<f64>]> = kept.iter().map(|(features, _)| *features).collect();
    let fills = fill_values(&raw_rows, width, options.missing);
    let filled: Vec<Vec<f64>> = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(col, value)| {
                    value.unwrap_or_else(|| fills.as_ref().map_or(0.0, |fills| fills[col]))
                })
                .collect()
        })
        .collect();

    let split = if options.stratify {
        stratified_split(&labels, options.test_fraction, options.seed)
    } else {
        split_indices(kept.len(), options.test_fraction, options.seed)
    };

    let train_rows: Vec<Vec<f64>> = split.train.iter().map(|&idx| filled[idx].clone()).collect();
    let scaler = Scaler::fit(&train_rows, width, options.scaling);
    let partition = |indices: &[usize]| LabeledRows {
        x: indices
            .iter()
            .map(|&idx| {
                let mut row = filled[idx].clone();
                scaler.transform_in_place(&mut row);
                row
            })
            .collect(),
        y: indices.iter().map(|&idx| labels[idx]).collect(),
    };
    let train = partition(&split.train);
    let test = partition(&split.test);

    tracing::info!(
        "Prepared {} rows: {} train / {} test, {} classes",
        kept.len(),
        train.len(),
        test.len(),
        classes.len()
    );
    Ok(Prepared {
        pipeline: FeaturePipeline {
            feature_names: dataset.feature_names.clone(),
            missing: options.missing,
            fill_values: fills,
            scaler,
        },
        classes,
        train,
        test,
        split,
        cleaned_rows: kept.len(),
        dropped_rows,
    })
}

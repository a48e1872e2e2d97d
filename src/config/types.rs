use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults::{
    clamp_sample_rows, clamp_test_fraction, default_dataset_path, default_decimal,
    default_delimiter, default_host, default_label_column, default_max_sample_rows,
    default_max_upload_bytes, default_model_path, default_na_values, default_port,
    default_preview_rows, default_seed, default_test_fraction,
};
use crate::dataset::{CsvOptions, DatasetSchema};
use crate::ml::metrics::Averaging;
use crate::ml::{ModelKind, TrainingOptions, forest, gbdt_stump, logreg};
use crate::preprocess::{MissingPolicy, PreprocessOptions, Scaling};

/// Top-level settings stored in `config.toml`.
///
/// Sections: `dataset`, `preprocess`, `training`, `model`, `server`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub dataset: DatasetSettings,
    #[serde(default)]
    pub preprocess: PreprocessSettings,
    #[serde(default)]
    pub training: TrainingSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

/// Where the training CSV lives and how to read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSettings {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Explicit feature columns; empty means every numeric non-label column.
    #[serde(default)]
    pub feature_columns: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_decimal")]
    pub decimal: char,
    #[serde(default = "default_na_values")]
    pub na_values: Vec<String>,
}

/// Cleaning, scaling and partitioning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSettings {
    #[serde(default)]
    pub missing: MissingPolicy,
    #[serde(default)]
    pub scaling: Scaling,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    /// Seed for the split and for model fitting; `None` draws from the OS.
    #[serde(default = "default_seed")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub stratify: bool,
}

/// Model selection and per-model hyperparameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default)]
    pub model: ModelKind,
    #[serde(default)]
    pub averaging: Averaging,
    #[serde(default)]
    pub logistic_regression: logreg::TrainOptions,
    #[serde(default)]
    pub random_forest: forest::TrainOptions,
    #[serde(default)]
    pub boosted_stumps: gbdt_stump::TrainOptions,
}

/// Location of the persisted model artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_model_path")]
    pub path: PathBuf,
}

/// Web process settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Uploaded CSVs are randomly sampled down to at most this many rows.
    #[serde(default = "default_max_sample_rows")]
    pub max_sample_rows: usize,
    #[serde(default = "default_preview_rows")]
    pub preview_rows: usize,
}

impl Settings {
    /// Clamp out-of-range values to something usable.
    pub fn normalized(mut self) -> Self {
        self.dataset = self.dataset.normalized();
        self.preprocess.test_fraction = clamp_test_fraction(self.preprocess.test_fraction);
        self.server.max_sample_rows = clamp_sample_rows(self.server.max_sample_rows);
        self
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.dataset.delimiter as u8,
            decimal_comma: self.dataset.decimal == ',',
            na_values: self.dataset.na_values.clone(),
        }
    }

    pub fn dataset_schema(&self) -> DatasetSchema {
        DatasetSchema {
            label_column: self.dataset.label_column.clone(),
            feature_columns: self.dataset.feature_columns.clone(),
        }
    }

    pub fn preprocess_options(&self) -> PreprocessOptions {
        PreprocessOptions {
            missing: self.preprocess.missing,
            scaling: self.preprocess.scaling,
            test_fraction: self.preprocess.test_fraction,
            seed: self.preprocess.seed,
            stratify: self.preprocess.stratify,
        }
    }

    /// Hyperparameters with the preprocessing seed propagated to every model.
    pub fn training_options(&self) -> TrainingOptions {
        let mut options = TrainingOptions {
            logistic_regression: self.training.logistic_regression.clone(),
            random_forest: self.training.random_forest.clone(),
            boosted_stumps: self.training.boosted_stumps.clone(),
        };
        if let Some(seed) = self.preprocess.seed {
            options.logistic_regression.seed = seed;
            options.random_forest.seed = seed;
        }
        options
    }

    /// `host:port` the web process binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatasetSettings {
    fn normalized(mut self) -> Self {
        if !matches!(self.delimiter, ',' | ';' | '\t') {
            self.delimiter = default_delimiter();
        }
        if !matches!(self.decimal, '.' | ',') {
            self.decimal = default_decimal();
        }
        if self.decimal == ',' && self.delimiter == ',' {
            self.delimiter = ';';
        }
        self
    }
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            label_column: default_label_column(),
            feature_columns: Vec::new(),
            delimiter: default_delimiter(),
            decimal: default_decimal(),
            na_values: default_na_values(),
        }
    }
}

impl Default for PreprocessSettings {
    fn default() -> Self {
        Self {
            missing: MissingPolicy::default(),
            scaling: Scaling::default(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            stratify: false,
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            path: default_model_path(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            max_sample_rows: default_max_sample_rows(),
            preview_rows: default_preview_rows(),
        }
    }
}

//! Error taxonomy shared by the training workflow and the web application.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by the load → preprocess → train → evaluate → persist flow.
///
/// None of these are retried; they surface to whichever process invoked the
/// operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The dataset source is missing or could not be read.
    #[error("Dataset unavailable at {source_name}: {source}")]
    DataUnavailable {
        /// File path or upload name that failed.
        source_name: String,
        /// Underlying CSV/IO error.
        source: csv::Error,
    },
    /// Required columns are absent or have the wrong shape/type.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
    /// Too few rows remain to form the requested partitions.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    /// Fitting failed or the labels are degenerate.
    #[error("Training failed: {0}")]
    TrainingFailure(String),
    /// The persisted model could not be produced or read back.
    #[error("Model unavailable at {path}: {reason}")]
    ModelUnavailable {
        /// Artifact path.
        path: PathBuf,
        /// Why the artifact could not be used.
        reason: ModelUnavailableReason,
    },
}

/// Detail attached to [`Error::ModelUnavailable`].
#[derive(Debug, Error)]
pub enum ModelUnavailableReason {
    /// The file does not exist or cannot be opened.
    #[error("cannot read artifact: {0}")]
    Io(#[from] std::io::Error),
    /// Header, checksum or payload failed to parse.
    #[error("corrupt artifact: {0}")]
    Corrupt(String),
    /// Written by a different format or crate version.
    #[error("incompatible artifact: {0}")]
    Incompatible(String),
    /// Serialization failed while saving.
    #[error("cannot encode artifact: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Short identifier of the taxonomy condition, used in logs and the web UI.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DataUnavailable { .. } => "DataUnavailable",
            Error::SchemaMismatch(_) => "SchemaMismatch",
            Error::InsufficientData(_) => "InsufficientData",
            Error::TrainingFailure(_) => "TrainingFailure",
            Error::ModelUnavailable { .. } => "ModelUnavailable",
        }
    }

    pub(crate) fn model_unavailable(
        path: impl Into<PathBuf>,
        reason: impl Into<ModelUnavailableReason>,
    ) -> Self {
        Error::ModelUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_match_taxonomy() {
        let err = Error::TrainingFailure("single class".into());
        assert_eq!(err.kind(), "TrainingFailure");
        let err = Error::model_unavailable(
            "missing.json",
            ModelUnavailableReason::Corrupt("bad header".into()),
        );
        assert_eq!(err.kind(), "ModelUnavailable");
        assert!(err.to_string().contains("missing.json"));
    }
}

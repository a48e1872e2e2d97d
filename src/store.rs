//! Persisted model artifact: fitted pipeline plus trained model.
//!
//! File layout: one JSON header line followed by the JSON payload.
//!
//! ```text
//! {"format":"tabpredict-model","format_version":1,"crate_version":"0.1.0","checksum":"<blake3 hex>"}
//! { ...payload... }
//! ```
//!
//! Saving writes a temporary file next to the target and renames it over the
//! old artifact, so readers never observe a half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::Error;
use crate::error::ModelUnavailableReason;
use crate::ml::{Classifier, ModelKind, Prediction, TrainedModel};
use crate::preprocess::FeaturePipeline;

/// Identifier written in every artifact header.
pub const ARTIFACT_FORMAT: &str = "tabpredict-model";
/// Bumped whenever the payload layout changes incompatibly.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything needed to turn a raw feature vector into a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_id: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    pub label_column: String,
    pub pipeline: FeaturePipeline,
    pub model: TrainedModel,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactHeader {
    format: String,
    format_version: u32,
    crate_version: String,
    checksum: String,
}

impl ModelArtifact {
    /// Wrap a freshly trained model with a new id and timestamp.
    pub fn new(label_column: &str, pipeline: FeaturePipeline, model: TrainedModel) -> Self {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        Self {
            model_id: uuid::Uuid::new_v4().to_string(),
            created_at,
            label_column: label_column.to_string(),
            pipeline,
            model,
        }
    }

    pub fn kind(&self) -> ModelKind {
        self.model.kind()
    }

    pub fn classes(&self) -> &[String] {
        self.model.classes()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.pipeline.feature_names
    }

    /// Transform a raw request vector and predict.
    pub fn predict(&self, raw: &[Option<f64>]) -> Result<Prediction, Error> {
        let features = self.pipeline.transform(raw)?;
        Ok(self.model.predict(&features))
    }

    fn validate(&self) -> Result<(), String> {
        self.pipeline.validate()?;
        self.model.validate()?;
        if self.model.feature_len() != self.pipeline.feature_len() {
            return Err(format!(
                "model expects {} features but the pipeline produces {}",
                self.model.feature_len(),
                self.pipeline.feature_len()
            ));
        }
        Ok(())
    }
}

/// Write `artifact` to `path`, replacing any existing file.
pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<(), Error> {
    let fail = |reason: ModelUnavailableReason| Error::model_unavailable(path, reason);
    let payload = serde_json::to_vec_pretty(artifact).map_err(|err| fail(err.into()))?;
    let header = ArtifactHeader {
        format: ARTIFACT_FORMAT.to_string(),
        format_version: ARTIFACT_FORMAT_VERSION,
        crate_version: CRATE_VERSION.to_string(),
        checksum: blake3::hash(&payload).to_hex().to_string(),
    };
    let mut bytes = serde_json::to_vec(&header).map_err(|err| fail(err.into()))?;
    bytes.push(b'\n');
    bytes.extend_from_slice(&payload);

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(|err| fail(err.into()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|err| fail(err.into()))?;
    tmp.write_all(&bytes).map_err(|err| fail(err.into()))?;
    tmp.as_file().sync_all().map_err(|err| fail(err.into()))?;
    tmp.persist(path).map_err(|err| fail(err.error.into()))?;
    tracing::info!(
        "Saved {} model {} to {}",
        artifact.kind(),
        artifact.model_id,
        path.display()
    );
    Ok(())
}

/// Read and verify an artifact written by [`save`].
pub fn load(path: &Path) -> Result<ModelArtifact, Error> {
    let bytes = std::fs::read(path).map_err(|err| Error::model_unavailable(path, err))?;
    let artifact = decode(&bytes).map_err(|reason| Error::model_unavailable(path, reason))?;
    tracing::info!(
        "Loaded {} model {} from {}",
        artifact.kind(),
        artifact.model_id,
        path.display()
    );
    Ok(artifact)
}

fn decode(bytes: &[u8]) -> Result<ModelArtifact, ModelUnavailableReason> {
    use ModelUnavailableReason::{Corrupt, Incompatible};

    let split = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| Corrupt("missing header line".to_string()))?;
    let (header, payload) = (&bytes[..split], &bytes[split + 1..]);
    let header: ArtifactHeader = serde_json::from_slice(header)
        .map_err(|err| Corrupt(format!("unreadable header: {err}")))?;
    if header.format != ARTIFACT_FORMAT {
        return Err(Incompatible(format!("unknown format '{}'", header.format)));
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(Incompatible(format!(
            "format version {} (expected {ARTIFACT_FORMAT_VERSION})",
            header.format_version
        )));
    }
    check_crate_version(&header.crate_version)?;

    let checksum = blake3::hash(payload).to_hex();
    if checksum.as_str() != header.checksum {
        return Err(Corrupt("checksum mismatch".to_string()));
    }
    let artifact: ModelArtifact = serde_json::from_slice(payload)
        .map_err(|err| Corrupt(format!("unreadable payload: {err}")))?;
    artifact.validate().map_err(Corrupt)?;
    Ok(artifact)
}

/// Same major version, and same minor while the major is 0.
fn check_crate_version(written: &str) -> Result<(), ModelUnavailableReason> {
    let written = semver::Version::parse(written).map_err(|err| {
        ModelUnavailableReason::Corrupt(format!("bad crate version '{written}': {err}"))
    })?;
    let current = semver::Version::parse(CRATE_VERSION).map_err(|err| {
        ModelUnavailableReason::Corrupt(format!("bad running version: {err}"))
    })?;
    let compatible = written.major == current.major
        && (current.major != 0 || written.minor == current.minor);
    if compatible {
        Ok(())
    } else {
        Err(ModelUnavailableReason::Incompatible(format!(
            "written by version {written}, running {current}"
        )))
    }
}

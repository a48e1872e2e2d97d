//! End-to-end training run: load, prepare, train, evaluate, persist.

use std::path::PathBuf;

use crate::Error;
use crate::config::Settings;
use crate::dataset::{Dataset, load_dataset};
use crate::ml::metrics::{Averaging, ConfusionMatrix, EvaluationReport, report_from_confusion};
use crate::ml::{self, ModelKind};
use crate::preprocess::{self, Prepared};
use crate::store::{self, ModelArtifact};

/// Summary of one completed training run.
#[derive(Debug, Clone)]
pub struct TrainingRun {
    pub artifact: ModelArtifact,
    pub report: EvaluationReport,
    pub loaded_rows: usize,
    pub cleaned_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub model_path: PathBuf,
}

/// Train a model on an already-loaded dataset without touching the filesystem.
pub fn fit(
    dataset: &Dataset,
    settings: &Settings,
) -> Result<(ModelArtifact, EvaluationReport, Prepared), Error> {
    let prepared = preprocess::prepare(dataset, &settings.preprocess_options())?;
    let model = ml::train(
        settings.training.model,
        prepared.train_set(),
        &settings.training_options(),
    )?;
    let report = ml::metrics::evaluate(
        &model,
        &prepared.classes,
        &prepared.test,
        settings.training.averaging,
    )?;
    let artifact = ModelArtifact::new(
        &dataset.label_column,
        prepared.pipeline.clone(),
        model,
    );
    Ok((artifact, report, prepared))
}

/// Run the whole pipeline described by `settings` and save the artifact.
pub fn run_training(settings: &Settings) -> Result<TrainingRun, Error> {
    let dataset = load_dataset(
        &settings.dataset.path,
        &settings.dataset_schema(),
        &settings.csv_options(),
    )?;
    let (artifact, report, prepared) = fit(&dataset, settings)?;
    log_report(settings.training.model, &report);
    store::save(&artifact, &settings.model.path)?;
    Ok(TrainingRun {
        artifact,
        report,
        loaded_rows: dataset.len(),
        cleaned_rows: prepared.cleaned_rows,
        train_rows: prepared.train.len(),
        test_rows: prepared.test.len(),
        model_path: settings.model.path.clone(),
    })
}

/// Score a persisted artifact on every labeled row of `dataset`.
///
/// Rows with a missing label, a label unknown to the model, or values the
/// pipeline rejects are skipped; the count of skipped rows is returned.
pub fn evaluate_artifact(
    artifact: &ModelArtifact,
    dataset: &Dataset,
    averaging: Averaging,
) -> Result<(EvaluationReport, usize), Error> {
    let order = feature_order(artifact, dataset)?;
    let classes = artifact.classes();
    let mut confusion = ConfusionMatrix::new(classes.len());
    let mut skipped = 0usize;
    for (row, label) in dataset.features.iter().zip(&dataset.labels) {
        let Some(truth) = label
            .as_ref()
            .and_then(|label| classes.iter().position(|c| c == label))
        else {
            skipped += 1;
            continue;
        };
        let raw: Vec<Option<f64>> = order.iter().map(|&idx| row[idx]).collect();
        match artifact.predict(&raw) {
            Ok(prediction) => confusion.add(truth, prediction.class_index),
            Err(_) => skipped += 1,
        }
    }
    if confusion.total() == 0 {
        return Err(Error::InsufficientData(format!(
            "no scorable rows ({skipped} skipped)"
        )));
    }
    Ok((report_from_confusion(classes, confusion, averaging), skipped))
}

/// Position of each model feature inside the dataset's feature columns.
pub fn feature_order(artifact: &ModelArtifact, dataset: &Dataset) -> Result<Vec<usize>, Error> {
    artifact
        .feature_names()
        .iter()
        .map(|name| {
            dataset
                .feature_names
                .iter()
                .position(|candidate| candidate == name)
                .ok_or_else(|| {
                    Error::SchemaMismatch(format!("dataset lacks model feature '{name}'"))
                })
        })
        .collect()
}

fn log_report(kind: ModelKind, report: &EvaluationReport) {
    tracing::info!(
        "{kind}: accuracy {:.4}, {} precision {:.4}, recall {:.4}, f1 {:.4} ({} / {} correct)",
        report.accuracy,
        report.averaging,
        report.precision,
        report.recall,
        report.f1,
        report.correct,
        report.total
    );
}

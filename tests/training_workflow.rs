mod support;

use std::collections::BTreeSet;

use support::fixtures::{self, FEATURES, LABEL};
use tabpredict::Error;
use tabpredict::config::Settings;
use tabpredict::dataset::{CsvOptions, DatasetSchema, load_dataset};
use tabpredict::ml::{Classifier, ModelKind};
use tabpredict::preprocess::{MissingPolicy, prepare};
use tabpredict::{store, workflow};
use tempfile::tempdir;

fn schema() -> DatasetSchema {
    DatasetSchema {
        label_column: LABEL.to_string(),
        feature_columns: Vec::new(),
    }
}

#[test]
fn loader_counts_every_data_line() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(73));
    let dataset = load_dataset(&path, &schema(), &CsvOptions::default()).unwrap();
    assert_eq!(dataset.len(), 73);
    assert_eq!(dataset.feature_names, FEATURES);
}

#[test]
fn missing_dataset_is_data_unavailable() {
    let dir = tempdir().unwrap();
    let err = load_dataset(&dir.path().join("absent.csv"), &schema(), &CsvOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::DataUnavailable { .. }));
}

#[test]
fn fixed_seed_gives_identical_partitions_and_models() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(80));
    let dataset = load_dataset(&path, &schema(), &CsvOptions::default()).unwrap();
    let settings = fixtures::settings_for(dir.path(), path);

    let (first, first_report, first_prepared) = workflow::fit(&dataset, &settings).unwrap();
    let (second, second_report, second_prepared) = workflow::fit(&dataset, &settings).unwrap();
    assert_eq!(first_prepared.split, second_prepared.split);
    assert_eq!(first.model, second.model);
    assert_eq!(first_report, second_report);
}

#[test]
fn partitions_are_disjoint_and_cover_cleaned_rows() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(60));
    let dataset = load_dataset(&path, &schema(), &CsvOptions::default()).unwrap();
    for missing in [MissingPolicy::DropRows, MissingPolicy::ImputeMedian] {
        let mut settings = Settings::default();
        settings.preprocess.missing = missing;
        let prepared = prepare(&dataset, &settings.preprocess_options()).unwrap();
        let train: BTreeSet<_> = prepared.split.train.iter().copied().collect();
        let test: BTreeSet<_> = prepared.split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), prepared.cleaned_rows);
        assert_eq!(prepared.cleaned_rows + prepared.dropped_rows, dataset.len());
        if missing == MissingPolicy::DropRows {
            assert!(prepared.dropped_rows > 0);
        }
    }
}

#[test]
fn reported_accuracy_matches_recomputation() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(90));
    let dataset = load_dataset(&path, &schema(), &CsvOptions::default()).unwrap();
    for kind in ModelKind::ALL {
        let mut settings = fixtures::settings_for(dir.path(), path.clone());
        settings.training.model = kind;
        let (artifact, report, prepared) = workflow::fit(&dataset, &settings).unwrap();
        let correct = prepared
            .test
            .x
            .iter()
            .zip(&prepared.test.y)
            .filter(|(x, y)| artifact.model.predict(x).class_index == **y)
            .count();
        assert_eq!(report.total as usize, prepared.test.len());
        assert_eq!(report.accuracy, correct as f64 / prepared.test.len() as f64);
        assert!(report.accuracy > 0.9, "{kind}: {}", report.accuracy);
    }
}

#[test]
fn saved_model_predicts_identically_after_load() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(60));
    let dataset = load_dataset(&path, &schema(), &CsvOptions::default()).unwrap();
    for kind in ModelKind::ALL {
        let mut settings = fixtures::settings_for(dir.path(), path.clone());
        settings.training.model = kind;
        let (artifact, _, _) = workflow::fit(&dataset, &settings).unwrap();
        let model_path = dir.path().join(format!("{kind}.json"));
        store::save(&artifact, &model_path).unwrap();
        let loaded = store::load(&model_path).unwrap();
        assert_eq!(loaded, artifact);
        for raw in [
            vec![Some(22.0), Some(6.0)],
            vec![Some(71.5), Some(26.0)],
            vec![None, Some(15.0)],
        ] {
            assert_eq!(loaded.predict(&raw).unwrap(), artifact.predict(&raw).unwrap());
        }
    }
}

#[test]
fn run_training_writes_a_loadable_artifact() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(50));
    let settings = fixtures::settings_for(dir.path(), path);
    let run = workflow::run_training(&settings).unwrap();
    assert_eq!(run.loaded_rows, 50);
    assert_eq!(run.train_rows + run.test_rows, run.cleaned_rows);
    let loaded = store::load(&run.model_path).unwrap();
    assert_eq!(loaded.model_id, run.artifact.model_id);
    assert_eq!(loaded.classes(), ["suplente", "titular"]);
}

#[test]
fn single_class_dataset_fails_training() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "one.csv", &fixtures::single_class_csv(30));
    let settings = fixtures::settings_for(dir.path(), path);
    for kind in ModelKind::ALL {
        let mut settings = settings.clone();
        settings.training.model = kind;
        let err = workflow::run_training(&settings).unwrap_err();
        assert!(matches!(err, Error::TrainingFailure(_)), "{kind}: {err}");
    }
    assert!(!settings.model.path.exists());
}

#[test]
fn missing_or_corrupt_artifact_is_model_unavailable() {
    let dir = tempdir().unwrap();
    let err = store::load(&dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable { .. }));

    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(40));
    let settings = fixtures::settings_for(dir.path(), path);
    let run = workflow::run_training(&settings).unwrap();
    let mut bytes = std::fs::read(&run.model_path).unwrap();
    let last = bytes.len() - 3;
    bytes[last] = if bytes[last] == b'1' { b'2' } else { b'1' };
    std::fs::write(&run.model_path, bytes).unwrap();
    let err = store::load(&run.model_path).unwrap_err();
    assert!(matches!(err, Error::ModelUnavailable { .. }), "{err}");
}

#[test]
fn evaluate_artifact_scores_a_fresh_csv() {
    let dir = tempdir().unwrap();
    let path = fixtures::write_csv(dir.path(), "players.csv", &fixtures::players_csv(60));
    let settings = fixtures::settings_for(dir.path(), path);
    let run = workflow::run_training(&settings).unwrap();

    let holdout = fixtures::write_csv(dir.path(), "holdout.csv", &fixtures::players_csv(20));
    let schema = DatasetSchema {
        label_column: LABEL.to_string(),
        feature_columns: run.artifact.feature_names().to_vec(),
    };
    let dataset = load_dataset(&holdout, &schema, &CsvOptions::default()).unwrap();
    let (report, skipped) =
        workflow::evaluate_artifact(&run.artifact, &dataset, settings.training.averaging).unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(report.total, 20);
}

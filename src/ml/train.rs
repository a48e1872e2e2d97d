use std::collections::BTreeSet;

use super::{ModelKind, TrainedModel, forest, gbdt_stump, logreg};
use crate::Error;
use crate::preprocess::TrainSet;

/// Hyperparameters for every supported model; only the selected one is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingOptions {
    pub logistic_regression: logreg::TrainOptions,
    pub random_forest: forest::TrainOptions,
    pub boosted_stumps: gbdt_stump::TrainOptions,
}

/// Fit the model selected by `kind` on the training partition.
pub fn train(
    kind: ModelKind,
    set: TrainSet<'_>,
    options: &TrainingOptions,
) -> Result<TrainedModel, Error> {
    let present: BTreeSet<usize> = set.rows.y.iter().copied().collect();
    if present.len() < 2 {
        let label = present
            .first()
            .and_then(|&idx| set.classes.get(idx))
            .map(String::as_str)
            .unwrap_or("<none>");
        return Err(Error::TrainingFailure(format!(
            "training rows contain {} distinct label(s) (only '{label}'); at least 2 are required",
            present.len()
        )));
    }
    if set.rows.x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::TrainingFailure(
            "training features contain non-finite values".to_string(),
        ));
    }

    tracing::info!(
        "Training {kind} on {} rows x {} features, {} classes",
        set.rows.len(),
        set.rows.feature_len(),
        set.classes.len()
    );
    let model = match kind {
        ModelKind::LogisticRegression => {
            TrainedModel::LogisticRegression(logreg::train_logreg(set, &options.logistic_regression)?)
        }
        ModelKind::RandomForest => {
            TrainedModel::RandomForest(forest::train_forest(set, &options.random_forest)?)
        }
        ModelKind::GradientBoostedStumps => TrainedModel::GradientBoostedStumps(
            gbdt_stump::train_gbdt_stump(set, &options.boosted_stumps)?,
        ),
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Classifier;
    use crate::preprocess::LabeledRows;

    fn rows() -> LabeledRows {
        let mut rows = LabeledRows::default();
        for i in 0..30 {
            let v = i as f64 / 10.0;
            rows.x.push(vec![v]);
            rows.y.push(usize::from(v >= 1.5));
        }
        rows
    }

    #[test]
    fn every_kind_trains_and_predicts() {
        let classes = vec!["low".to_string(), "high".to_string()];
        let rows = rows();
        let set = TrainSet {
            classes: &classes,
            rows: &rows,
        };
        for kind in ModelKind::ALL {
            let model = train(kind, set, &TrainingOptions::default()).unwrap();
            assert_eq!(model.kind(), kind);
            assert_eq!(model.feature_len(), 1);
            assert_eq!(model.predict(&[0.1]).label, "low", "{kind}");
            assert_eq!(model.predict(&[2.9]).label, "high", "{kind}");
        }
    }

    #[test]
    fn single_label_is_training_failure() {
        let classes = vec!["a".to_string(), "b".to_string()];
        let rows = LabeledRows {
            x: vec![vec![1.0], vec![2.0]],
            y: vec![0, 0],
        };
        let set = TrainSet {
            classes: &classes,
            rows: &rows,
        };
        let err = train(ModelKind::RandomForest, set, &TrainingOptions::default()).unwrap_err();
        assert!(matches!(err, Error::TrainingFailure(msg) if msg.contains("'a'")));
    }
}

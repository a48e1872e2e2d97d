//! Evaluation metrics for classification models.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Classifier;
use crate::Error;
use crate::preprocess::LabeledRows;

/// Confusion matrix for a `K`-class classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfusionMatrix {
    /// Number of classes.
    pub n_classes: usize,
    /// Row-major `KxK` counts (`truth * K + predicted`).
    pub counts: Vec<u32>,
}

impl ConfusionMatrix {
    /// Create an empty `KxK` confusion matrix.
    pub fn new(n_classes: usize) -> Self {
        Self {
            n_classes,
            counts: vec![0; n_classes * n_classes],
        }
    }

    pub fn add(&mut self, truth: usize, predicted: usize) {
        if truth >= self.n_classes || predicted >= self.n_classes {
            return;
        }
        let idx = truth * self.n_classes + predicted;
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: usize, predicted: usize) -> u32 {
        self.counts[truth * self.n_classes + predicted]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&v| v as u64).sum()
    }

    pub fn correct(&self) -> u64 {
        (0..self.n_classes).map(|k| self.get(k, k) as u64).sum()
    }
}

/// Precision/recall statistics for a single class.
#[derive(Debug, Clone, PartialEq)]
pub struct PerClassStats {
    /// `TP / (TP + FP)`, 0 when the class was never predicted.
    pub precision: f64,
    /// `TP / (TP + FN)`, 0 when the class never occurs.
    pub recall: f64,
    pub f1: f64,
    /// Total number of true examples for the class.
    pub support: u32,
    /// Number of rows predicted as the class.
    pub predicted: u32,
}

/// How per-class metrics are combined into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Averaging {
    /// Unweighted mean over classes.
    #[default]
    Macro,
    /// Mean weighted by class support.
    Weighted,
}

impl Averaging {
    pub fn as_str(self) -> &'static str {
        match self {
            Averaging::Macro => "macro",
            Averaging::Weighted => "weighted",
        }
    }
}

impl fmt::Display for Averaging {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Averaging {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "macro" => Ok(Averaging::Macro),
            "weighted" => Ok(Averaging::Weighted),
            other => Err(format!("unknown averaging '{other}' (expected macro or weighted)")),
        }
    }
}

/// Metrics for one evaluation run; never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Policy used for `precision`, `recall` and `f1`.
    pub averaging: Averaging,
    pub total: u64,
    pub correct: u64,
    pub classes: Vec<String>,
    pub per_class: Vec<PerClassStats>,
    pub confusion: ConfusionMatrix,
}

impl EvaluationReport {
    /// Metric name to value.
    pub fn metrics(&self) -> BTreeMap<String, f64> {
        let avg = self.averaging.as_str();
        BTreeMap::from([
            ("accuracy".to_string(), self.accuracy),
            (format!("precision_{avg}"), self.precision),
            (format!("recall_{avg}"), self.recall),
            (format!("f1_{avg}"), self.f1),
        ])
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "accuracy: {:.4} ({} / {})",
            self.accuracy, self.correct, self.total
        )?;
        writeln!(
            f,
            "{} precision={:.4}  recall={:.4}  f1={:.4}",
            self.averaging, self.precision, self.recall, self.f1
        )?;
        for (idx, stats) in self.per_class.iter().enumerate() {
            let name = self.classes.get(idx).map(String::as_str).unwrap_or("?");
            writeln!(
                f,
                "class {:>2} {:<16}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
                idx, name, stats.precision, stats.recall, stats.f1, stats.support
            )?;
        }
        writeln!(f, "confusion matrix (rows=true, cols=pred):")?;
        for truth in 0..self.confusion.n_classes {
            let mut row = String::new();
            for pred in 0..self.confusion.n_classes {
                row.push_str(&format!("{:6}", self.confusion.get(truth, pred)));
            }
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

/// Compute per-class precision and recall from a confusion matrix.
pub fn precision_recall_by_class(cm: &ConfusionMatrix) -> Vec<PerClassStats> {
    let k = cm.n_classes;
    let mut stats = Vec::with_capacity(k);
    for class_idx in 0..k {
        let tp = cm.get(class_idx, class_idx) as f64;
        let mut fp = 0f64;
        let mut fn_ = 0f64;
        let mut support = 0u32;
        let mut predicted = 0u32;
        for j in 0..k {
            let v = cm.get(class_idx, j);
            support = support.saturating_add(v);
            if j != class_idx {
                fn_ += v as f64;
            }
        }
        for i in 0..k {
            let v = cm.get(i, class_idx);
            predicted = predicted.saturating_add(v);
            if i != class_idx {
                fp += v as f64;
            }
        }
        let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
        let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };
        stats.push(PerClassStats {
            precision,
            recall,
            f1,
            support,
            predicted,
        });
    }
    stats
}

/// Compute overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        0.0
    } else {
        cm.correct() as f64 / total as f64
    }
}

/// Combine per-class stats into `(precision, recall, f1)`.
///
/// Macro averaging covers classes that occur in the truth or in the
/// predictions; classes absent from both are skipped.
pub fn average(stats: &[PerClassStats], averaging: Averaging) -> (f64, f64, f64) {
    let weights: Vec<f64> = stats
        .iter()
        .map(|s| match averaging {
            Averaging::Macro => {
                if s.support > 0 || s.predicted > 0 {
                    1.0
                } else {
                    0.0
                }
            }
            Averaging::Weighted => s.support as f64,
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if total == 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let mean = |field: fn(&PerClassStats) -> f64| {
        stats.iter().zip(&weights).map(|(s, w)| field(s) * w).sum::<f64>() / total
    };
    (mean(|s| s.precision), mean(|s| s.recall), mean(|s| s.f1))
}

/// Score `model` on labeled rows whose class indices refer to `classes`.
pub fn evaluate(
    model: &dyn Classifier,
    classes: &[String],
    rows: &LabeledRows,
    averaging: Averaging,
) -> Result<EvaluationReport, Error> {
    if rows.is_empty() {
        return Err(Error::InsufficientData(
            "evaluation partition is empty".to_string(),
        ));
    }
    let mut cm = ConfusionMatrix::new(classes.len());
    for (features, &truth) in rows.x.iter().zip(&rows.y) {
        let predicted = model.predict(features).class_index;
        cm.add(truth, predicted);
    }
    Ok(report_from_confusion(classes, cm, averaging))
}

/// Build a report from an already-filled confusion matrix.
pub fn report_from_confusion(
    classes: &[String],
    confusion: ConfusionMatrix,
    averaging: Averaging,
) -> EvaluationReport {
    let per_class = precision_recall_by_class(&confusion);
    let (precision, recall, f1) = average(&per_class, averaging);
    EvaluationReport {
        accuracy: accuracy(&confusion),
        precision,
        recall,
        f1,
        averaging,
        total: confusion.total(),
        correct: confusion.correct(),
        classes: classes.to_vec(),
        per_class,
        confusion,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Prediction;

    struct Threshold;

    impl Classifier for Threshold {
        fn predict(&self, features: &[f64]) -> Prediction {
            let classes = ["neg".to_string(), "pos".to_string()];
            let p = if features[0] > 0.0 { 1.0 } else { 0.0 };
            Prediction::from_probabilities(&classes, vec![1.0 - p, p])
        }
    }

    fn cm_from(pairs: &[(usize, usize)], k: usize) -> ConfusionMatrix {
        let mut cm = ConfusionMatrix::new(k);
        for &(t, p) in pairs {
            cm.add(t, p);
        }
        cm
    }

    #[test]
    fn accuracy_and_per_class_stats() {
        let cm = cm_from(&[(0, 0), (0, 0), (0, 1), (1, 1)], 2);
        assert_eq!(accuracy(&cm), 0.75);
        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats[0].precision, 1.0);
        assert!((stats[0].recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats[1].precision, 0.5);
        assert_eq!(stats[1].support, 1);
    }

    #[test]
    fn macro_and_weighted_differ_on_imbalance() {
        let cm = cm_from(&[(0, 0), (0, 0), (0, 1), (1, 1)], 2);
        let stats = precision_recall_by_class(&cm);
        let (p_macro, r_macro, _) = average(&stats, Averaging::Macro);
        let (p_weighted, r_weighted, _) = average(&stats, Averaging::Weighted);
        assert!((p_macro - 0.75).abs() < 1e-12);
        assert!((r_macro - (2.0 / 3.0 + 1.0) / 2.0).abs() < 1e-12);
        assert!((p_weighted - (3.0 * 1.0 + 0.5) / 4.0).abs() < 1e-12);
        assert!((r_weighted - 0.75).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_scores_zero_precision() {
        let cm = cm_from(&[(0, 0), (1, 0)], 2);
        let stats = precision_recall_by_class(&cm);
        assert_eq!(stats[1].precision, 0.0);
        assert_eq!(stats[1].recall, 0.0);
        assert_eq!(stats[1].f1, 0.0);
    }

    #[test]
    fn evaluate_records_policy_and_counts() {
        let rows = LabeledRows {
            x: vec![vec![-1.0], vec![1.0], vec![2.0], vec![-3.0]],
            y: vec![0, 1, 0, 0],
        };
        let classes = vec!["neg".to_string(), "pos".to_string()];
        let report = evaluate(&Threshold, &classes, &rows, Averaging::Weighted).unwrap();
        assert_eq!(report.averaging, Averaging::Weighted);
        assert_eq!((report.correct, report.total), (3, 4));
        assert_eq!(report.metrics()["accuracy"], 0.75);
        assert!(report.metrics().contains_key("f1_weighted"));
    }

    #[test]
    fn empty_partition_is_insufficient_data() {
        let classes = vec!["neg".to_string(), "pos".to_string()];
        let err = evaluate(&Threshold, &classes, &LabeledRows::default(), Averaging::Macro)
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientData(_)));
    }
}

use serde::{Deserialize, Serialize};

use super::model::{GbdtStumpModel, Stump};
use crate::Error;
use crate::ml::softmax;
use crate::preprocess::TrainSet;

/// Training hyperparameters for stump boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainOptions {
    /// Number of boosting rounds.
    pub rounds: usize,
    /// Learning rate applied per round.
    pub learning_rate: f64,
    /// Number of bins used for split search.
    pub bins: usize,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            rounds: 100,
            learning_rate: 0.1,
            bins: 32,
        }
    }
}

/// Train a multi-class stump-GBDT model using softmax gradient boosting.
pub fn train_gbdt_stump(
    set: TrainSet<'_>,
    options: &TrainOptions,
) -> Result<GbdtStumpModel, Error> {
    let x = &set.rows.x;
    let y = &set.rows.y;
    let n_classes = set.classes.len();
    if n_classes < 2 {
        return Err(Error::TrainingFailure("Need at least 2 classes".to_string()));
    }
    if !(options.learning_rate.is_finite() && options.learning_rate > 0.0) {
        return Err(Error::TrainingFailure(format!(
            "learning_rate must be > 0, got {}",
            options.learning_rate
        )));
    }

    let n = x.len();
    let d = set.rows.feature_len();
    let binning = Binning::fit(x, d, options.bins);
    let binned: Vec<Vec<u8>> = x.iter().map(|row| binning.bin_row(row)).collect();

    let priors = class_priors(y, n_classes);
    let init_raw: Vec<f64> = priors.iter().map(|&p| p.max(1e-6).ln()).collect();
    let mut raw = vec![init_raw.clone(); n];

    let mut rounds_out: Vec<Vec<Stump>> = Vec::with_capacity(options.rounds);
    for round in 0..options.rounds {
        let probs: Vec<Vec<f64>> = raw.iter().map(|r| softmax(r)).collect();
        let residuals = compute_residuals(y, &probs, n_classes);

        let stumps_for_round: Vec<Stump> = residuals
            .iter()
            .map(|class_residuals| fit_stump(&binning, &binned, x, class_residuals))
            .collect();
        for (row, raw_row) in x.iter().zip(raw.iter_mut()) {
            for (class_idx, stump) in stumps_for_round.iter().enumerate() {
                raw_row[class_idx] += options.learning_rate * stump.predict(row);
            }
        }
        if raw.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::TrainingFailure(format!(
                "boosting diverged at round {round}"
            )));
        }
        rounds_out.push(stumps_for_round);
    }

    let model = GbdtStumpModel {
        feature_len: d,
        classes: set.classes.to_vec(),
        learning_rate: options.learning_rate,
        init_raw,
        stumps: rounds_out,
    };
    model.validate().map_err(Error::TrainingFailure)?;
    Ok(model)
}

fn class_priors(y: &[usize], n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &label in y {
        if label < n_classes {
            counts[label] += 1;
        }
    }
    let total = y.len().max(1) as f64;
    counts.into_iter().map(|c| c as f64 / total).collect()
}

fn compute_residuals(y: &[usize], probs: &[Vec<f64>], n_classes: usize) -> Vec<Vec<f64>> {
    let n = y.len();
    let mut residuals = vec![vec![0.0f64; n]; n_classes];
    for (i, (&yi, p)) in y.iter().zip(probs).enumerate() {
        for (k, class_residuals) in residuals.iter_mut().enumerate() {
            let target = if yi == k { 1.0 } else { 0.0 };
            class_residuals[i] = target - p[k];
        }
    }
    residuals
}

/// Equal-width bins per feature over the training range.
struct Binning {
    mins: Vec<f64>,
    widths: Vec<f64>,
    bins: usize,
}

impl Binning {
    fn fit(x: &[Vec<f64>], feature_len: usize, bins: usize) -> Self {
        let mut mins = vec![f64::INFINITY; feature_len];
        let mut maxs = vec![f64::NEG_INFINITY; feature_len];
        for row in x {
            for (j, &v) in row.iter().take(feature_len).enumerate() {
                if v.is_finite() {
                    mins[j] = mins[j].min(v);
                    maxs[j] = maxs[j].max(v);
                }
            }
        }
        let mut widths = Vec::with_capacity(feature_len);
        for (min, max) in mins.iter_mut().zip(maxs) {
            if !min.is_finite() || !max.is_finite() {
                *min = 0.0;
                widths.push(1.0);
            } else if max > *min {
                widths.push(max - *min);
            } else {
                widths.push(1.0);
            }
        }
        Self {
            mins,
            widths,
            bins: bins.clamp(2, 256),
        }
    }

    fn bin_row(&self, row: &[f64]) -> Vec<u8> {
        let top = (self.bins - 1) as f64;
        self.mins
            .iter()
            .zip(&self.widths)
            .enumerate()
            .map(|(j, (&min, &width))| {
                let v = row.get(j).copied().unwrap_or(0.0);
                (((v - min) / width).clamp(0.0, 1.0) * top).round() as u8
            })
            .collect()
    }

    /// Raw-value threshold halfway between the centres of `split_bin` and the next bin.
    fn threshold(&self, feature: usize, split_bin: usize) -> f64 {
        let t = (split_bin as f64 + 0.5) / (self.bins - 1) as f64;
        self.mins[feature] + t * self.widths[feature]
    }
}

/// Stump on the feature and bin boundary that best reduce squared error.
fn fit_stump(binning: &Binning, binned: &[Vec<u8>], x: &[Vec<f64>], residuals: &[f64]) -> Stump {
    let best = (0..binning.mins.len())
        .filter_map(|feature| {
            best_split(binned, residuals, feature, binning.bins).map(|(gain, bin)| (gain, feature, bin))
        })
        .fold(None::<(f64, usize, usize)>, |best, candidate| match best {
            Some(current) if current.0 >= candidate.0 => Some(current),
            _ => Some(candidate),
        });
    let Some((_, feature_index, split_bin)) = best else {
        let mean = residuals.iter().sum::<f64>() / residuals.len().max(1) as f64;
        return Stump {
            feature_index: 0,
            threshold: 0.0,
            left_value: mean,
            right_value: mean,
        };
    };
    let threshold = binning.threshold(feature_index, split_bin);

    let (mut left, mut right) = ((0.0f64, 0u32), (0.0f64, 0u32));
    for (row, &r) in x.iter().zip(residuals) {
        let side = if row.get(feature_index).copied().unwrap_or(0.0) <= threshold {
            &mut left
        } else {
            &mut right
        };
        side.0 += r;
        side.1 += 1;
    }
    let mean = |(sum, count): (f64, u32)| if count == 0 { 0.0 } else { sum / count as f64 };
    Stump {
        feature_index,
        threshold,
        left_value: mean(left),
        right_value: mean(right),
    }
}

/// Best `(gain, split_bin)` for one feature, `None` when every row shares a bin.
///
/// Minimising the summed squared error of both sides is the same as
/// maximising `sum_l^2 / n_l + sum_r^2 / n_r`.
fn best_split(
    binned: &[Vec<u8>],
    residuals: &[f64],
    feature: usize,
    bins: usize,
) -> Option<(f64, usize)> {
    let mut counts = vec![0u32; bins];
    let mut sums = vec![0f64; bins];
    for (row, &r) in binned.iter().zip(residuals) {
        let b = usize::from(row.get(feature).copied().unwrap_or(0));
        counts[b] += 1;
        sums[b] += r;
    }
    let total_count: u32 = counts.iter().sum();
    let total_sum: f64 = sums.iter().sum();

    let mut best: Option<(f64, usize)> = None;
    let (mut left_count, mut left_sum) = (0u32, 0f64);
    for split_bin in 0..bins - 1 {
        left_count += counts[split_bin];
        left_sum += sums[split_bin];
        let right_count = total_count - left_count;
        if left_count == 0 || right_count == 0 {
            continue;
        }
        let right_sum = total_sum - left_sum;
        let gain = left_sum * left_sum / left_count as f64 + right_sum * right_sum / right_count as f64;
        if best.is_none_or(|(current, _)| gain > current) {
            best = Some((gain, split_bin));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Classifier;
    use crate::preprocess::LabeledRows;

    fn two_blobs() -> (Vec<String>, LabeledRows) {
        let mut rows = LabeledRows::default();
        for i in 0..20 {
            let offset = i as f64 * 0.05;
            rows.x.push(vec![-1.0 - offset, 0.3]);
            rows.y.push(0);
            rows.x.push(vec![1.0 + offset, 0.3]);
            rows.y.push(1);
        }
        (vec!["low".into(), "high".into()], rows)
    }

    #[test]
    fn separates_two_blobs() {
        let (classes, rows) = two_blobs();
        let set = TrainSet {
            classes: &classes,
            rows: &rows,
        };
        let options = TrainOptions {
            rounds: 20,
            ..TrainOptions::default()
        };
        let model = train_gbdt_stump(set, &options).unwrap();
        assert_eq!(model.stumps.len(), 20);
        assert_eq!(model.predict(&[-1.5, 0.3]).label, "low");
        assert_eq!(model.predict(&[1.5, 0.3]).label, "high");
    }

    #[test]
    fn threshold_sits_between_bins() {
        let binning = Binning::fit(&[vec![0.0], vec![1.0]], 1, 3);
        assert!((binning.threshold(0, 0) - 0.25).abs() < 1e-12);
        assert_eq!(binning.bin_row(&[0.6]), vec![1]);
        assert_eq!(binning.bin_row(&[7.0]), vec![2]);
    }

    #[test]
    fn constant_features_give_an_inert_stump() {
        let binning = Binning::fit(&[vec![2.0], vec![2.0]], 1, 8);
        let binned: Vec<Vec<u8>> = [[2.0], [2.0]].iter().map(|r| binning.bin_row(r)).collect();
        let stump = fit_stump(&binning, &binned, &[vec![2.0], vec![2.0]], &[0.5, -0.1]);
        assert_eq!(stump.left_value, stump.right_value);
        assert!((stump.left_value - 0.2).abs() < 1e-12);
    }

    #[test]
    fn rejects_single_class() {
        let classes = vec!["only".to_string()];
        let rows = LabeledRows {
            x: vec![vec![1.0]],
            y: vec![0],
        };
        let err = train_gbdt_stump(
            TrainSet {
                classes: &classes,
                rows: &rows,
            },
            &TrainOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TrainingFailure(_)));
    }
}

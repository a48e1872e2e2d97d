use serde::{Deserialize, Serialize};

/// Feature scaling applied after imputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaling {
    /// Z-score with population standard deviation.
    #[default]
    Standard,
    /// Rescale to `[0, 1]` using the training range.
    MinMax,
    None,
}

/// Scaler fitted on the training partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scaler {
    Identity,
    Standard { means: Vec<f64>, stds: Vec<f64> },
    MinMax { mins: Vec<f64>, ranges: Vec<f64> },
}

impl Scaler {
    /// Fit column statistics; constant columns keep a divisor of 1.
    pub fn fit(rows: &[Vec<f64>], width: usize, scaling: Scaling) -> Self {
        if rows.is_empty() {
            return Scaler::Identity;
        }
        match scaling {
            Scaling::None => Scaler::Identity,
            Scaling::Standard => {
                let n = rows.len() as f64;
                let means: Vec<f64> = (0..width)
                    .map(|col| rows.iter().map(|row| row[col]).sum::<f64>() / n)
                    .collect();
                let stds = (0..width)
                    .map(|col| {
                        let var = rows
                            .iter()
                            .map(|row| (row[col] - means[col]).powi(2))
                            .sum::<f64>()
                            / n;
                        nonzero(var.sqrt())
                    })
                    .collect();
                Scaler::Standard { means, stds }
            }
            Scaling::MinMax => {
                let mut mins = vec![f64::INFINITY; width];
                let mut maxs = vec![f64::NEG_INFINITY; width];
                for row in rows {
                    for (col, &value) in row.iter().enumerate().take(width) {
                        mins[col] = mins[col].min(value);
                        maxs[col] = maxs[col].max(value);
                    }
                }
                let ranges = mins
                    .iter()
                    .zip(&maxs)
                    .map(|(min, max)| nonzero(max - min))
                    .collect();
                Scaler::MinMax { mins, ranges }
            }
        }
    }

    pub fn transform_in_place(&self, row: &mut [f64]) {
        match self {
            Scaler::Identity => {}
            Scaler::Standard { means, stds } => {
                for ((value, mean), std) in row.iter_mut().zip(means).zip(stds) {
                    *value = (*value - mean) / std;
                }
            }
            Scaler::MinMax { mins, ranges } => {
                for ((value, min), range) in row.iter_mut().zip(mins).zip(ranges) {
                    *value = (*value - min) / range;
                }
            }
        }
    }

    pub(crate) fn width(&self) -> Option<usize> {
        match self {
            Scaler::Identity => None,
            Scaler::Standard { means, stds } => (means.len() == stds.len()).then_some(means.len()),
            Scaler::MinMax { mins, ranges } => (mins.len() == ranges.len()).then_some(mins.len()),
        }
    }
}

fn nonzero(value: f64) -> f64 {
    if value.is_finite() && value > f64::EPSILON {
        value
    } else {
        1.0
    }
}

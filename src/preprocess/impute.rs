use serde::{Deserialize, Serialize};

/// How missing feature values are handled before training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Remove rows with any missing feature; prediction requires every value.
    DropRows,
    /// Fill with the column mean.
    #[default]
    ImputeMean,
    /// Fill with the column median.
    ImputeMedian,
}

impl MissingPolicy {
    pub fn imputes(self) -> bool {
        !matches!(self, MissingPolicy::DropRows)
    }
}

/// Per-column fill values computed over `rows`; `None` under [`MissingPolicy::DropRows`].
///
/// A column with no present values falls back to `0.0`.
pub fn fill_values(rows: &[&[Option<f64>]], width: usize, policy: MissingPolicy) -> Option<Vec<f64>> {
    let statistic: fn(&mut [f64]) -> f64 = match policy {
        MissingPolicy::DropRows => return None,
        MissingPolicy::ImputeMean => mean,
        MissingPolicy::ImputeMedian => median,
    };
    let fills = (0..width)
        .map(|col| {
            let mut present: Vec<f64> = rows.iter().filter_map(|row| row[col]).collect();
            if present.is_empty() {
                tracing::warn!("Feature column {col} has no values; filling with 0");
                0.0
            } else {
                statistic(&mut present)
            }
        })
        .collect();
    Some(fills)
}

fn mean(values: &mut [f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
